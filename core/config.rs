use crate::error::{AppError, Result};
use byte_unit::Byte;
use log;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_DIR: &str = "repocat";
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";
pub const DEFAULT_SIZE_THRESHOLD: &str = "1MiB";
pub const DEFAULT_SIZE_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// Per-run knobs for the aggregation pipeline.
///
/// Built once by the caller and handed to [`crate::TreeWalker::new`] by value;
/// nothing inside the pipeline reads options from anywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOptions {
    pub size_threshold_bytes: u64,
    pub include_all: bool,
    pub truncate_oversized: bool,
    /// 0 means unlimited.
    pub max_files: usize,
    pub ignore_patterns: Vec<String>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD_BYTES,
            include_all: false,
            truncate_oversized: false,
            max_files: 0,
            ignore_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProcessingConfig {
    #[serde(default = "default_size_threshold")]
    pub size_threshold: String,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default)]
    pub truncate_oversized: bool,
    #[serde(default)]
    pub max_files: usize,
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_size_threshold() -> String {
    DEFAULT_SIZE_THRESHOLD.to_string()
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            size_threshold: default_size_threshold(),
            include_all: false,
            truncate_oversized: false,
            max_files: 0,
            ignore: Vec::new(),
        }
    }
}

/// Parses a human size such as `500KB`, `1MiB` or a bare byte count.
pub fn parse_size(size_str: &str) -> Result<u64> {
    let byte_value = Byte::from_str(size_str.trim()).map_err(|e| {
        AppError::InvalidInput(format!(
            "Invalid size '{}': {}. Use a byte count or units like KB, MiB.",
            size_str, e
        ))
    })?;
    Ok(byte_value.as_u64())
}

impl Config {
    /// Picks the config file to load, if any.
    ///
    /// An explicit path must exist. Without one the per-user file under the
    /// platform config directory is used when present.
    pub fn resolve_config_path(
        cli_config_file: Option<&str>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let Some(config_dir) = dirs::config_dir() else {
                    log::debug!("No platform config directory; using defaults.");
                    return Ok(None);
                };
                let default_path = config_dir
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.is_file() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        toml::from_str::<Config>(toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "{}. Check TOML syntax and structure.",
                e.to_string().trim_end()
            ))
        })
    }

    pub fn processing_options(&self) -> Result<ProcessingOptions> {
        Ok(ProcessingOptions {
            size_threshold_bytes: parse_size(&self.processing.size_threshold)?,
            include_all: self.processing.include_all,
            truncate_oversized: self.processing.truncate_oversized,
            max_files: self.processing.max_files,
            ignore_patterns: self.processing.ignore.clone(),
        })
    }
}
