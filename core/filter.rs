use crate::error::{AppError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log;
use std::path::{Component, Path};

/// Always-active exclusions: version-control metadata and the dependency cache.
pub const BUILTIN_IGNORES: [&str; 4] = [
    "**/.git",
    "**/.git/**",
    "**/node_modules",
    "**/node_modules/**",
];

const SUBTREE_SUFFIX: &str = "/**";

/// Decides whether a path relative to the repository root is excluded.
#[derive(Debug, Clone)]
pub struct PathFilter {
    set: GlobSet,
    // Directory prefixes of `<prefix>/**` patterns; a match prunes the whole subtree.
    subtrees: GlobSet,
    pattern_count: usize,
}

impl PathFilter {
    pub fn new(ignore_patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut subtree_builder = GlobSetBuilder::new();
        let mut pattern_count = 0;
        for pattern in BUILTIN_IGNORES {
            builder.add(compile_glob(pattern)?);
            add_subtree_prefix(&mut subtree_builder, pattern)?;
        }
        for pattern_str in ignore_patterns {
            let mut processed_pattern = pattern_str.trim().to_string();
            if processed_pattern.is_empty() {
                log::trace!("Skipping empty ignore pattern");
                continue;
            }
            if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
                processed_pattern.push_str("**");
            }
            log::trace!(
                "Adding ignore pattern: {} (processed as {})",
                pattern_str,
                processed_pattern
            );
            builder.add(compile_glob(&processed_pattern).map_err(|e| {
                log::error!("Invalid glob pattern \"{}\": {}", pattern_str, e);
                e
            })?);
            add_subtree_prefix(&mut subtree_builder, &processed_pattern)?;
            pattern_count += 1;
        }
        Ok(Self {
            set: build_set(builder)?,
            subtrees: build_set(subtree_builder)?,
            pattern_count,
        })
    }

    /// Number of user patterns, not counting the built-ins.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// A directory is ignored when it matches directly or when a pattern
    /// covers everything beneath it (`build/**`). Ignored directories are pruned.
    pub fn is_ignored(&self, relative_path: &Path, is_dir: bool) -> bool {
        let normalized = slash_path(relative_path);
        if normalized.is_empty() {
            return false;
        }
        if self.set.is_match(normalized.as_str()) {
            log::trace!("Path ignored: {}", normalized);
            return true;
        }
        if is_dir && self.subtrees.is_match(normalized.as_str()) {
            log::trace!("Directory ignored with its subtree: {}", normalized);
            return true;
        }
        false
    }
}

fn add_subtree_prefix(builder: &mut GlobSetBuilder, pattern: &str) -> Result<()> {
    if let Some(prefix) = pattern.strip_suffix(SUBTREE_SUFFIX).filter(|p| !p.is_empty()) {
        builder.add(compile_glob(prefix)?);
    }
    Ok(())
}

fn build_set(builder: GlobSetBuilder) -> Result<GlobSet> {
    builder.build().map_err(|e| {
        log::error!("Error building glob set: {}", e);
        AppError::Glob(e.to_string())
    })
}

fn compile_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|e| AppError::Glob(format!("Invalid glob pattern \"{}\": {}", pattern, e)))
}

/// Joins normal components with `/` so matching is identical on every platform.
pub(crate) fn slash_path(relative_path: &Path) -> String {
    relative_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
