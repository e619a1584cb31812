pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod render;
pub mod walker;

pub use classify::{Classification, Probe, classify, probe_bytes};
pub use config::{Config, OutputConfig, ProcessingConfig, ProcessingOptions, parse_size};
pub use error::{AppError, Result};
pub use fetch::{FetchedRepo, GitFetcher, RepoRef};
pub use filter::{BUILTIN_IGNORES, PathFilter};
pub use render::{ParsedFragment, human_size, parse_aggregate, render_fragment};
pub use walker::{EntryStatus, FileEntry, RunResult, SkipBreakdown, TreeWalker, WalkState};
