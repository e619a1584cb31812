use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use repocat_core::{AppError, RunResult, human_size};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub repository: &'a str,
    pub output: Option<String>,
    #[serde(flatten)]
    pub result: &'a RunResult,
}

/// Persists the aggregate verbatim.
pub fn write_artifact(path: &Path, content: &str) -> repocat_core::Result<()> {
    let to_write_error = |source: io::Error| AppError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_write_error)?;
    }
    let mut file = File::create(path).map_err(to_write_error)?;
    file.write_all(content.as_bytes()).map_err(to_write_error)?;
    file.flush().map_err(to_write_error)?;
    log::info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn summary_json(summary: &RunSummary<'_>) -> Result<String> {
    serde_json::to_string_pretty(summary).context("Failed to serialize run summary")
}

pub fn summary_text(summary: &RunSummary<'_>, detailed: bool) -> String {
    let result = summary.result;
    let mut text = String::new();

    match &summary.output {
        Some(path) => text.push_str(&format!(
            "{} Aggregate for {} saved to: {}\n",
            "✅".green(),
            summary.repository.bold(),
            path.blue()
        )),
        None => text.push_str(&format!(
            "{} Aggregate for {} written to stdout\n",
            "✅".green(),
            summary.repository.bold()
        )),
    }
    text.push_str(&format!(
        "{:<12} {} ({} emitted)\n",
        "Processed:".green(),
        result.processed_count.to_string().cyan(),
        human_size(result.bytes_emitted)
    ));
    text.push_str(&format!(
        "{:<12} {}\n",
        "Skipped:".green(),
        result.skipped_count.to_string().cyan()
    ));
    if result.omitted_count > 0 {
        text.push_str(&format!(
            "{:<12} {} (beyond max-files)\n",
            "Omitted:".yellow(),
            result.omitted_count.to_string().cyan()
        ));
    }
    if result.truncated_count > 0 {
        text.push_str(&format!(
            "{:<12} {}\n",
            "Truncated:".yellow(),
            result.truncated_count.to_string().cyan()
        ));
    }
    if !result.failed_directories.is_empty() {
        text.push_str(&format!(
            "{} {} directories could not be listed: {}\n",
            "⚠️".yellow(),
            result.failed_directories.len(),
            result.failed_directories.join(", ")
        ));
    }

    if detailed && result.skipped_count > 0 {
        text.push_str(&skip_table(result).to_string());
        text.push('\n');
    }
    text
}

fn skip_table(result: &RunResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Skipped because").fg(Color::Green),
        Cell::new("Files").fg(Color::Green),
    ]);
    let rows = [
        ("ignore pattern", result.skipped.ignored),
        ("over size threshold", result.skipped.large),
        ("binary content", result.skipped.binary),
        ("unreadable", result.skipped.unreadable),
    ];
    for (reason, count) in rows {
        table.add_row(vec![
            Cell::new(reason).fg(Color::Cyan),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
