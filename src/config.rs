//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.hdspin-eval.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".hdspin-eval.toml";

/// Largest number of digits written after the decimal point.
pub const MAX_PRECISION: usize = 30;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Trial group layout.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Cache root holding one directory per parameter configuration.
    #[serde(default = "default_cache")]
    pub cache: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache: default_cache(),
            verbose: false,
        }
    }
}

fn default_cache() -> String {
    "cache".to_string()
}

/// Layout of a trial group directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Subdirectory with raw per-trial files.
    #[serde(default = "default_results_dir")]
    pub results_dir: String,

    /// Subdirectory receiving aggregated outputs.
    #[serde(default = "default_final_dir")]
    pub final_dir: String,

    /// Substring identifying categorical-count files.
    #[serde(default = "default_psi_config_marker")]
    pub psi_config_marker: String,

    /// Substring identifying energy-trajectory files.
    #[serde(default = "default_energy_marker")]
    pub energy_marker: String,

    /// Largest category index accepted in a categorical-count file.
    #[serde(default = "default_max_category_index")]
    pub max_category_index: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            final_dir: default_final_dir(),
            psi_config_marker: default_psi_config_marker(),
            energy_marker: default_energy_marker(),
            max_category_index: default_max_category_index(),
        }
    }
}

fn default_results_dir() -> String {
    "results".to_string()
}

fn default_final_dir() -> String {
    "final".to_string()
}

fn default_psi_config_marker() -> String {
    "psi_config".to_string()
}

fn default_energy_marker() -> String {
    "energy".to_string()
}

fn default_max_category_index() -> usize {
    1 << 24
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Categorical table file name inside `final/`.
    #[serde(default = "default_psi_config_file")]
    pub psi_config_file: String,

    /// Energy summary file name inside `final/`.
    #[serde(default = "default_energy_file")]
    pub energy_file: String,

    /// Digits after the decimal point.
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Create `final/` when it does not exist yet.
    #[serde(default = "default_true")]
    pub create_final: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            psi_config_file: default_psi_config_file(),
            energy_file: default_energy_file(),
            precision: default_precision(),
            create_final: true,
        }
    }
}

fn default_psi_config_file() -> String {
    "psi_config.txt".to_string()
}

fn default_energy_file() -> String {
    "energy.txt".to_string()
}

fn default_precision() -> usize {
    18
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref cache) = args.cache {
            self.general.cache = cache.display().to_string();
        }

        if let Some(precision) = args.precision {
            self.output.precision = precision;
        }

        if args.no_create_final {
            self.output.create_final = false;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that come from either the file or the flags.
    pub fn validate(&self) -> Result<()> {
        if self.output.precision > MAX_PRECISION {
            bail!(
                "output.precision is {}, must be at most {}",
                self.output.precision,
                MAX_PRECISION
            );
        }
        Ok(())
    }

    /// Resolve the cache root that holds the trial groups.
    pub fn cache_root(&self) -> PathBuf {
        PathBuf::from(&self.general.cache)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
