//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Pipeline;
use clap::Parser;
use std::path::PathBuf;

/// hdspin-eval - aggregate hdspin trial results
///
/// Walks every parameter-configuration directory under the cache root and
/// reduces its per-trial results into `final/psi_config.txt` and
/// `final/energy.txt`.
///
/// Examples:
///   hdspin-eval --cache ./cache
///   hdspin-eval --cache ./cache --pipeline energy
///   hdspin-eval --cache ./cache --report eval_report.md --fail-on-error
///   hdspin-eval --cache ./cache --dry-run
///   hdspin-eval --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Cache root containing one directory per parameter configuration
    ///
    /// Falls back to `general.cache` from the config file, then `./cache`.
    #[arg(long, value_name = "DIR", env = "HDSPIN_CACHE")]
    pub cache: Option<PathBuf>,

    /// Which reduction to run
    #[arg(long, default_value = "all", value_name = "PIPELINE")]
    pub pipeline: PipelineSelection,

    /// Path to configuration file
    ///
    /// If not specified, looks for .hdspin-eval.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the batch report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Batch report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Digits after the decimal point in written tables
    #[arg(long, value_name = "DIGITS")]
    pub precision: Option<usize>,

    /// Do not create missing `final/` directories
    #[arg(long)]
    pub no_create_final: bool,

    /// Dry run: list groups and matched trial files without aggregating
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 if any group failed
    #[arg(long)]
    pub fail_on_error: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .hdspin-eval.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Pipelines selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PipelineSelection {
    /// Categorical counts, then energies
    #[default]
    All,
    /// Categorical counts only
    PsiConfig,
    /// Energies only
    Energy,
}

impl PipelineSelection {
    pub fn pipelines(self) -> Vec<Pipeline> {
        match self {
            PipelineSelection::All => vec![Pipeline::PsiConfig, Pipeline::Energy],
            PipelineSelection::PsiConfig => vec![Pipeline::PsiConfig],
            PipelineSelection::Energy => vec![Pipeline::Energy],
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref cache) = self.cache {
            if cache.exists() && !cache.is_dir() {
                return Err(format!("Cache path is not a directory: {}", cache.display()));
            }
        }

        if let Some(precision) = self.precision {
            if precision > crate::config::MAX_PRECISION {
                return Err(format!(
                    "Precision must be at most {} digits",
                    crate::config::MAX_PRECISION
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}
