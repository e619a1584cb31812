use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOpts {
    #[arg(
        long,
        help = "Path of the TOML config file (default: <config dir>/repocat/config.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Configuration"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Configuration"
    )]
    pub no_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionOpts {
    #[arg(
        short = 't',
        long,
        value_name = "SIZE",
        help = "Maximum file size before a file is skipped or truncated (e.g. '500KB', '1MiB') [default: 1MiB].",
        help_heading = "File Selection"
    )]
    pub threshold: Option<String>,

    #[arg(
        short = 'a',
        long,
        help = "Include every non-ignored file, regardless of size or binary content.",
        help_heading = "File Selection"
    )]
    pub include_all: bool,

    #[arg(
        long,
        help = "Emit the first SIZE bytes of oversized files instead of skipping them.",
        help_heading = "File Selection"
    )]
    pub truncate: bool,

    #[arg(
        short = 'm',
        long,
        value_name = "N",
        help = "Stop emitting content after N files (0 = unlimited).",
        help_heading = "File Selection"
    )]
    pub max_files: Option<usize>,

    #[arg(
        short = 'i',
        long = "ignore",
        value_name = "GLOB",
        value_delimiter = ',',
        help = "Ignore paths matching GLOB (repeatable, comma-separated). Added to config patterns.",
        help_heading = "File Selection"
    )]
    pub ignore: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputOpts {
    #[arg(
        short = 'o',
        long,
        value_name = "PATH",
        help = "Write the aggregate to PATH (default: <repository>.txt).",
        conflicts_with = "stdout",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Write the aggregate to standard output instead of a file.",
        conflicts_with = "output",
        help_heading = "Output Control"
    )]
    pub stdout: bool,

    #[arg(
        long,
        help = "Print the run summary as JSON (on standard error when combined with --stdout).",
        help_heading = "Output Control"
    )]
    pub json_summary: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "repocat",
    author,
    version,
    about = "Concatenate a repository's files into one annotated text file.",
    long_about = "repocat clones a public repository (or reads a local directory), walks its files, \nand writes the selected file contents into a single text artifact with one \ndelimited fragment per file.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  repocat rust-lang/rustlings\n  repocat https://github.com/owner/repo.git -i 'docs/**' -m 200\n  repocat . --truncate -t 64KiB --stdout",
    arg_required_else_help = true
)]
pub struct Cli {
    #[arg(
        value_name = "REPOSITORY",
        help = "owner/repo shorthand, clone URL, or local directory."
    )]
    pub repository: String,

    #[arg(
        short = 'b',
        long,
        value_name = "BRANCH",
        help = "Branch or tag to clone."
    )]
    pub branch: Option<String>,

    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub output: OutputOpts,
    #[clap(flatten)]
    pub config: ConfigOpts,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}
