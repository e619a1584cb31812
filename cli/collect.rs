use crate::cli_args::{Cli, ConfigOpts, SelectionOpts};
use crate::output::{self, RunSummary};
use crate::progress::Spinner;
use anyhow::{Context, Result};
use log;
use repocat_core::{Config, GitFetcher, ProcessingOptions, RepoRef, TreeWalker, parse_size};
use std::path::{Path, PathBuf};

pub fn handle_collect_command(cli: &Cli) -> Result<()> {
    let config = load_config(&cli.config).context("Failed to load configuration")?;
    let options = merge_options(&config, &cli.selection)?;
    log::debug!("Effective processing options: {:?}", options);

    let repo = RepoRef::parse(&cli.repository)?;
    // Built before fetching so a bad ignore pattern fails without a clone.
    let mut walker = TreeWalker::new(options)?;

    let mut spinner = Spinner::new(!cli.quiet && !cli.output.stdout);
    spinner.set_message(format!("Fetching {}...", repo.name()));
    let fetched = GitFetcher::new()
        .with_branch(cli.branch.clone())
        .fetch(&repo)
        .inspect_err(|_| spinner.finish())?;
    log::info!(
        "Repository '{}' materialized at {}",
        fetched.name(),
        fetched.root().display()
    );

    spinner.set_message("Collecting files...");
    let result = walker
        .walk_with(fetched.root(), |entry| spinner.file_visited(entry))
        .inspect_err(|_| spinner.finish())?;
    spinner.finish();

    let output_path = if cli.output.stdout {
        output::write_to_stdout(&result.aggregated_text)?;
        None
    } else {
        let path = resolve_output_path(
            cli.output.output.as_deref(),
            config.output.directory.as_deref(),
            fetched.name(),
        );
        output::write_artifact(&path, &result.aggregated_text)?;
        Some(path)
    };

    let summary = RunSummary {
        repository: fetched.name(),
        output: output_path.map(|p| p.display().to_string()),
        result: &result,
    };
    let report = if cli.output.json_summary {
        Some(output::summary_json(&summary)? + "\n")
    } else if !cli.quiet {
        Some(output::summary_text(&summary, cli.verbose > 0))
    } else {
        None
    };
    if let Some(report) = report {
        // stdout belongs to the aggregate in --stdout mode
        if cli.output.stdout {
            eprint!("{}", report);
        } else {
            print!("{}", report);
        }
    }
    Ok(())
}

fn load_config(opts: &ConfigOpts) -> Result<Config> {
    let config_path = Config::resolve_config_path(opts.config.as_deref(), opts.no_config)?;
    match &config_path {
        Some(path) => Ok(Config::load_from_path(path)?),
        None => Ok(Config::default()),
    }
}

/// CLI flags win over the config file; ignore patterns from both are kept.
fn merge_options(config: &Config, selection: &SelectionOpts) -> Result<ProcessingOptions> {
    let mut options = config.processing_options()?;
    log::trace!("Applying CLI overrides to processing options...");

    if let Some(threshold) = &selection.threshold {
        options.size_threshold_bytes = parse_size(threshold)?;
    }
    if selection.include_all {
        options.include_all = true;
    }
    if selection.truncate {
        options.truncate_oversized = true;
    }
    if let Some(max_files) = selection.max_files {
        options.max_files = max_files;
    }
    options
        .ignore_patterns
        .extend(selection.ignore.iter().cloned());
    Ok(options)
}

fn resolve_output_path(
    cli_output: Option<&Path>,
    config_directory: Option<&Path>,
    repo_name: &str,
) -> PathBuf {
    if let Some(path) = cli_output {
        return PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    }
    let file_name = format!("{}.txt", repo_name);
    match config_directory {
        Some(dir) => PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref()).join(file_name),
        None => PathBuf::from(file_name),
    }
}
