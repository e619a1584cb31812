use std::fs;
use std::path::Path;

use repocat_core::{
    AppError, ProcessingOptions, RunResult, TreeWalker, WalkState, parse_aggregate,
};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// `{a.txt: "hello", b.bin: non-text, sub/c.txt: "world"}`
fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"hello");
    write(dir.path(), "b.bin", &[0x00, 0x9f, 0x92, 0x96, 0xff, 0x00]);
    write(dir.path(), "sub/c.txt", b"world");
    dir
}

fn options() -> ProcessingOptions {
    ProcessingOptions {
        size_threshold_bytes: 1_000_000,
        ..ProcessingOptions::default()
    }
}

fn run(root: &Path, options: ProcessingOptions) -> RunResult {
    TreeWalker::new(options).unwrap().walk(root).unwrap()
}

fn fragment_paths(result: &RunResult) -> Vec<String> {
    parse_aggregate(&result.aggregated_text)
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect()
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_text_files_included_binary_skipped() {
        let dir = sample_tree();
        let result = run(dir.path(), options());

        assert_eq!(fragment_paths(&result), vec!["a.txt", "sub/c.txt"]);
        assert_eq!(result.processed_count, 2);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.skipped.binary, 1);
        assert_eq!(result.omitted_count, 0);
        assert!(result.aggregated_text.starts_with(
            "**** File: a.txt | Size: 5 B (5 bytes) | Content: 5 bytes ****\n\nhello\n"
        ));
        assert!(!result.aggregated_text.contains("Omitted:"));
    }

    #[test]
    fn test_max_files_emits_cutoff_marker() {
        let dir = sample_tree();
        let result = run(
            dir.path(),
            ProcessingOptions {
                max_files: 1,
                ..options()
            },
        );

        assert_eq!(fragment_paths(&result), vec!["a.txt"]);
        assert_eq!(result.processed_count, 1);
        assert_eq!(result.omitted_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(
            result
                .aggregated_text
                .matches("**** Omitted: 1 more file(s) beyond the max-files limit of 1 ****")
                .count(),
            1
        );
        assert!(
            result
                .aggregated_text
                .ends_with("**** Summary: 1 processed, 1 skipped, 1 omitted ****\n")
        );
    }

    #[test]
    fn test_ignored_directory_is_pruned() {
        let dir = sample_tree();
        let result = run(
            dir.path(),
            ProcessingOptions {
                ignore_patterns: vec!["sub/**".to_string()],
                ..options()
            },
        );

        assert_eq!(fragment_paths(&result), vec!["a.txt"]);
        assert_eq!(result.processed_count, 1);
        // only b.bin; sub/c.txt is never visited
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.skipped.ignored, 0);
        assert_eq!(result.visited_count(), 2);
    }
}

mod policy_tests {
    use super::*;

    #[test]
    fn test_include_all_counts_only_ignored_as_skipped() {
        let dir = sample_tree();
        write(dir.path(), "huge.txt", &vec![b'x'; 64]);
        let result = run(
            dir.path(),
            ProcessingOptions {
                size_threshold_bytes: 8,
                include_all: true,
                ignore_patterns: vec!["*.txt".to_string()],
                ..ProcessingOptions::default()
            },
        );

        // a.txt and huge.txt ignored; b.bin and sub/c.txt included
        assert_eq!(fragment_paths(&result), vec!["b.bin", "sub/c.txt"]);
        assert_eq!(result.processed_count, 2);
        assert_eq!(result.skipped_count, 2);
        assert_eq!(result.skipped.ignored, 2);
    }

    #[test]
    fn test_oversized_file_skipped_without_truncation() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big.txt", &vec![b'y'; 100]);
        write(dir.path(), "small.txt", b"ok");
        let result = run(
            dir.path(),
            ProcessingOptions {
                size_threshold_bytes: 10,
                ..ProcessingOptions::default()
            },
        );

        assert_eq!(fragment_paths(&result), vec!["small.txt"]);
        assert_eq!(result.skipped.large, 1);
    }

    #[test]
    fn test_oversized_file_truncated_to_threshold() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big.txt", &vec![b'y'; 100]);
        let result = run(
            dir.path(),
            ProcessingOptions {
                size_threshold_bytes: 10,
                truncate_oversized: true,
                ..ProcessingOptions::default()
            },
        );

        let fragments = parse_aggregate(&result.aggregated_text).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content.len(), 10);
        assert_eq!(fragments[0].size_bytes, 100);
        assert!(fragments[0].truncated);
        assert!(
            result
                .aggregated_text
                .contains("**** Truncated: showing 10 of 100 bytes ****\n")
        );
        assert_eq!(result.truncated_count, 1);
        assert_eq!(result.bytes_emitted, 10);
    }

    #[test]
    fn test_truncation_keeps_whole_characters() {
        let dir = TempDir::new().unwrap();
        // five two-byte characters; a 5 byte cut lands inside the third
        write(dir.path(), "accents.txt", "ééééé".as_bytes());
        let result = run(
            dir.path(),
            ProcessingOptions {
                size_threshold_bytes: 5,
                truncate_oversized: true,
                ..ProcessingOptions::default()
            },
        );

        let fragments = parse_aggregate(&result.aggregated_text).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, "éé");
        assert_eq!(fragments[0].size_bytes, 10);
        assert!(fragments[0].truncated);
        assert!(
            result
                .aggregated_text
                .contains("**** Truncated: showing 4 of 10 bytes ****\n")
        );
        assert_eq!(result.bytes_emitted, 4);
    }

    #[test]
    fn test_binary_skip_wins_over_truncation() {
        let dir = TempDir::new().unwrap();
        let mut blob = vec![b'z'; 50];
        blob[3] = 0;
        write(dir.path(), "blob.dat", &blob);
        let result = run(
            dir.path(),
            ProcessingOptions {
                size_threshold_bytes: 10,
                truncate_oversized: true,
                ..ProcessingOptions::default()
            },
        );

        assert_eq!(result.processed_count, 0);
        assert_eq!(result.skipped.binary, 1);
    }

    #[test]
    fn test_invalid_utf8_past_probe_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let mut content = vec![b'a'; 9000];
        content.push(0xff);
        write(dir.path(), "late.txt", &content);
        let result = run(dir.path(), options());

        assert_eq!(result.processed_count, 0);
        assert_eq!(result.skipped.unreadable, 1);
    }

    #[test]
    fn test_omitted_count_is_eligible_minus_limit() {
        let dir = TempDir::new().unwrap();
        for name in ["1.txt", "2.txt", "3.txt", "4.txt", "5.txt"] {
            write(dir.path(), name, name.as_bytes());
        }
        write(dir.path(), "skip.bin", &[0, 0, 0]);
        let result = run(
            dir.path(),
            ProcessingOptions {
                max_files: 2,
                ..options()
            },
        );

        assert_eq!(fragment_paths(&result), vec!["1.txt", "2.txt"]);
        assert_eq!(result.omitted_count, 3);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.visited_count(), 6);
    }

    #[test]
    fn test_max_files_zero_is_unlimited() {
        let dir = sample_tree();
        let result = run(
            dir.path(),
            ProcessingOptions {
                max_files: 0,
                ..options()
            },
        );
        assert_eq!(result.processed_count, 2);
        assert_eq!(result.omitted_count, 0);
    }
}

mod traversal_tests {
    use super::*;

    #[test]
    fn test_files_before_subdirectories_depth_first() {
        let dir = TempDir::new().unwrap();
        for path in [
            "z.txt",
            "b.txt",
            "a/x.txt",
            "a/inner.txt",
            "a/deeper/d.txt",
            "c/e.txt",
        ] {
            write(dir.path(), path, b"text");
        }
        let result = run(dir.path(), options());

        assert_eq!(
            fragment_paths(&result),
            vec![
                "b.txt",
                "z.txt",
                "a/inner.txt",
                "a/x.txt",
                "a/deeper/d.txt",
                "c/e.txt"
            ]
        );
    }

    #[test]
    fn test_underscore_pattern_keeps_unmatched_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.rs", b"fn main() {}\n");
        write(dir.path(), "src/_private.rs", b"mod hidden;\n");
        write(dir.path(), "_site/index.html", b"<html></html>\n");
        let result = run(
            dir.path(),
            ProcessingOptions {
                ignore_patterns: vec!["**/_*".to_string()],
                ..options()
            },
        );

        assert_eq!(fragment_paths(&result), vec!["src/main.rs"]);
        assert_eq!(result.processed_count, 1);
        // _site is pruned, src/_private.rs is visited and ignored
        assert_eq!(result.skipped.ignored, 1);
        assert_eq!(result.visited_count(), 2);
    }

    #[test]
    fn test_builtin_directories_are_pruned() {
        let dir = sample_tree();
        write(dir.path(), ".git/config", b"[core]");
        write(dir.path(), "web/node_modules/pkg/index.js", b"module.exports = 1;");
        write(dir.path(), ".gitignore", b"target/");
        let result = run(dir.path(), options());

        assert_eq!(fragment_paths(&result), vec![".gitignore", "a.txt", "sub/c.txt"]);
        assert_eq!(result.visited_count(), 4);
    }

    #[test]
    fn test_round_trip_recovers_paths_and_sizes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", b"# title\n\n**** File: fake ****\n");
        write(dir.path(), "src/lib.rs", b"pub fn f() {}\n");
        write(dir.path(), "src/empty.rs", b"");
        let result = run(dir.path(), options());

        let pairs: Vec<(String, u64)> = parse_aggregate(&result.aggregated_text)
            .unwrap()
            .into_iter()
            .map(|f| (f.path, f.size_bytes))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("README.md".to_string(), 30),
                ("src/empty.rs".to_string(), 0),
                ("src/lib.rs".to_string(), 14),
            ]
        );
    }

    #[test]
    fn test_walker_state_transitions() {
        let dir = sample_tree();
        let mut walker = TreeWalker::new(options()).unwrap();
        assert_eq!(walker.state(), WalkState::Idle);
        walker.walk(dir.path()).unwrap();
        assert_eq!(walker.state(), WalkState::Succeeded);
    }

    #[test]
    fn test_observer_sees_every_visited_file() {
        let dir = sample_tree();
        let mut seen = Vec::new();
        let result = TreeWalker::new(options())
            .unwrap()
            .walk_with(dir.path(), |entry| seen.push(entry.relative_path.clone()))
            .unwrap();
        assert_eq!(seen, vec!["a.txt", "b.bin", "sub/c.txt"]);
        assert_eq!(seen.len(), result.visited_count());
    }

    #[test]
    fn test_missing_root_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let mut walker = TreeWalker::new(options()).unwrap();
        let err = walker.walk(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, AppError::Processing(_)));
        assert_eq!(walker.state(), WalkState::Failed);
    }

    #[test]
    fn test_file_root_fails_the_run() {
        let dir = sample_tree();
        let err = TreeWalker::new(options())
            .unwrap()
            .walk(&dir.path().join("a.txt"))
            .unwrap_err();
        assert!(matches!(err, AppError::Processing(_)));
    }

    #[test]
    fn test_invalid_pattern_rejected_before_walk() {
        let err = TreeWalker::new(ProcessingOptions {
            ignore_patterns: vec!["[unclosed".to_string()],
            ..options()
        })
        .err()
        .unwrap();
        assert!(matches!(err, AppError::Glob(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_subdirectory_is_recorded_and_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", b"hello");
        write(dir.path(), "locked/secret.txt", b"hidden");
        write(dir.path(), "z/b.txt", b"after");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let outcome = TreeWalker::new(options()).unwrap().walk(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let result = outcome.unwrap();
        assert_eq!(fragment_paths(&result), vec!["a.txt", "z/b.txt"]);
        assert_eq!(result.failed_directories, vec!["locked"]);
        assert_eq!(result.skipped_count, 0);
        assert_eq!(result.visited_count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_unreadable_and_dir_symlink_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = sample_tree();
        symlink(dir.path().join("missing"), dir.path().join("dangling")).unwrap();
        symlink(dir.path().join("sub"), dir.path().join("sub-link")).unwrap();
        symlink(dir.path().join("a.txt"), dir.path().join("a-link.txt")).unwrap();
        let result = run(dir.path(), options());

        assert_eq!(
            fragment_paths(&result),
            vec!["a-link.txt", "a.txt", "sub/c.txt"]
        );
        assert_eq!(result.skipped.unreadable, 1);
        assert_eq!(result.skipped.binary, 1);
        assert_eq!(result.visited_count(), 5);
    }
}
