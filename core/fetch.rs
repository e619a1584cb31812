use crate::error::{AppError, Result};
use log;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use url::Url;

const DEFAULT_HOST: &str = "https://github.com";
const FALLBACK_NAME: &str = "repository";

/// A repository reference as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoRef {
    Remote { url: String, name: String },
    Local { path: PathBuf, name: String },
}

impl RepoRef {
    /// Accepts `owner/repo` (GitHub), clone URLs, scp-style `git@host:owner/repo.git`,
    /// and existing local directories.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput(
                "Repository reference is empty".to_string(),
            ));
        }

        let expanded = PathBuf::from(shellexpand::tilde(trimmed).as_ref());
        if expanded.is_dir() {
            let path = expanded.canonicalize()?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| FALLBACK_NAME.to_string());
            log::debug!("Using local directory {} as repository", path.display());
            return Ok(RepoRef::Local { path, name });
        }

        if trimmed.contains("://") {
            let parsed = Url::parse(trimmed)?;
            match parsed.scheme() {
                "http" | "https" | "git" | "ssh" | "file" => {}
                other => {
                    return Err(AppError::InvalidInput(format!(
                        "Unsupported URL scheme '{}' in '{}'",
                        other, trimmed
                    )));
                }
            }
            let name = parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(repo_name_from_segment)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("No repository name in URL '{}'", trimmed))
                })?;
            return Ok(RepoRef::Remote {
                url: trimmed.to_string(),
                name,
            });
        }

        if let Some((user_host, path)) = trimmed.split_once(':') {
            if user_host.contains('@') && !path.is_empty() {
                let name = path
                    .rsplit('/')
                    .find(|s| !s.is_empty())
                    .map(repo_name_from_segment)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        AppError::InvalidInput(format!("No repository name in '{}'", trimmed))
                    })?;
                return Ok(RepoRef::Remote {
                    url: trimmed.to_string(),
                    name,
                });
            }
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() == 2 && segments.iter().all(|s| is_shorthand_segment(s)) {
            let name = repo_name_from_segment(segments[1]);
            if !name.is_empty() {
                return Ok(RepoRef::Remote {
                    url: format!("{}/{}/{}.git", DEFAULT_HOST, segments[0], name),
                    name,
                });
            }
        }

        Err(AppError::InvalidInput(format!(
            "'{}' is not a repository URL, owner/repo shorthand, or existing directory",
            trimmed
        )))
    }

    pub fn name(&self) -> &str {
        match self {
            RepoRef::Remote { name, .. } | RepoRef::Local { name, .. } => name,
        }
    }
}

fn repo_name_from_segment(segment: &str) -> String {
    segment.trim_end_matches(".git").to_string()
}

fn is_shorthand_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// A materialized tree. Cloned trees live in a temporary directory that is
/// removed when this value is dropped.
#[derive(Debug)]
pub struct FetchedRepo {
    name: String,
    root: PathBuf,
    _temp_dir: Option<TempDir>,
}

impl FetchedRepo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_temporary(&self) -> bool {
        self._temp_dir.is_some()
    }
}

/// Shallow-clones remote references with the `git` command line client.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git_binary: PathBuf,
    branch: Option<String>,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            branch: None,
        }
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<PathBuf>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn fetch(&self, repo: &RepoRef) -> Result<FetchedRepo> {
        match repo {
            RepoRef::Local { path, name } => {
                if self.branch.is_some() {
                    log::warn!("--branch is ignored for local directory {}", path.display());
                }
                Ok(FetchedRepo {
                    name: name.clone(),
                    root: path.clone(),
                    _temp_dir: None,
                })
            }
            RepoRef::Remote { url, name } => self.clone_remote(url, name),
        }
    }

    fn clone_remote(&self, url: &str, name: &str) -> Result<FetchedRepo> {
        let temp_dir = tempfile::Builder::new()
            .prefix("repocat-")
            .tempdir()
            .map_err(|e| AppError::Fetch(format!("Cannot create temporary directory: {}", e)))?;
        let clone_path = temp_dir.path().join(name);

        let mut command = Command::new(&self.git_binary);
        command
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--quiet");
        if let Some(branch) = &self.branch {
            command.arg("--branch").arg(branch);
        }
        command
            .arg(url)
            .arg(&clone_path)
            .env("GIT_TERMINAL_PROMPT", "0");

        log::info!("Cloning {} into {}", url, clone_path.display());
        let output = command.output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::Fetch(format!(
                    "git executable '{}' not found; install git to fetch remote repositories",
                    self.git_binary.display()
                ))
            } else {
                AppError::Fetch(format!("Failed to launch git: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Fetch(format!(
                "git clone of '{}' failed ({}): {}",
                url,
                output.status,
                stderr.trim()
            )));
        }

        if !has_checked_out_files(&clone_path)? {
            return Err(AppError::Fetch(format!("Repository '{}' is empty", url)));
        }

        log::debug!("Clone of {} complete", url);
        Ok(FetchedRepo {
            name: name.to_string(),
            root: clone_path,
            _temp_dir: Some(temp_dir),
        })
    }
}

fn has_checked_out_files(clone_path: &Path) -> Result<bool> {
    let entries = fs::read_dir(clone_path)
        .map_err(|e| AppError::Fetch(format!("Cannot inspect cloned tree: {}", e)))?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name() != ".git"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_expands_to_github() {
        let repo = RepoRef::parse("rust-lang/rustlings").unwrap();
        assert_eq!(
            repo,
            RepoRef::Remote {
                url: "https://github.com/rust-lang/rustlings.git".to_string(),
                name: "rustlings".to_string(),
            }
        );
    }

    #[test]
    fn urls_keep_their_form_and_yield_a_name() {
        let repo = RepoRef::parse("https://gitlab.com/group/sub/project.git").unwrap();
        assert_eq!(repo.name(), "project");

        let repo = RepoRef::parse("https://github.com/owner/tool/").unwrap();
        assert_eq!(repo.name(), "tool");
        assert!(matches!(repo, RepoRef::Remote { ref url, .. } if url == "https://github.com/owner/tool/"));
    }

    #[test]
    fn scp_style_reference() {
        let repo = RepoRef::parse("git@github.com:owner/thing.git").unwrap();
        assert_eq!(repo.name(), "thing");
    }

    #[test]
    fn malformed_references_are_invalid_input() {
        for input in ["", "   ", "just-a-word", "a/b/c", "ftp://host/repo", "https://github.com/"] {
            assert!(
                matches!(RepoRef::parse(input), Err(AppError::InvalidInput(_))),
                "expected InvalidInput for {:?}",
                input
            );
        }
    }

    #[test]
    fn local_directory_is_used_in_place() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = RepoRef::parse(dir.path().to_str().unwrap()).unwrap();
        assert!(matches!(repo, RepoRef::Local { .. }));

        let fetched = GitFetcher::new().fetch(&repo).unwrap();
        assert!(!fetched.is_temporary());
        assert_eq!(fetched.root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_git_binary_is_a_fetch_error() {
        let repo = RepoRef::parse("owner/repo").unwrap();
        let err = GitFetcher::new()
            .with_git_binary("/nonexistent/bin/git-for-repocat")
            .fetch(&repo)
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[test]
    fn empty_clone_detection() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(!has_checked_out_files(dir.path()).unwrap());
        fs::write(dir.path().join("README.md"), "hi").unwrap();
        assert!(has_checked_out_files(dir.path()).unwrap());
    }
}
