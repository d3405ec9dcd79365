//! hdspin-eval - aggregation of hdspin simulation trials
//!
//! Reduces the per-trial result files of every parameter configuration in a
//! cache directory into per-configuration summary tables.
//!
//! Exit codes:
//!   0 - Success (or failures without --fail-on-error)
//!   1 - Fatal error (cache root not found, bad config, ...)
//!   2 - At least one group failed and --fail-on-error was set

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;
mod table;

use analysis::{run_batch, BatchOptions};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::OutputOptions;
use scanner::{FsLister, ScanConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);
    if let Err(e) = config.validate() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    init_logging(&args, &config);

    info!("hdspin-eval v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_eval(&args, &config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Evaluation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default config file.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging; `RUST_LOG` overrides the flag-derived level.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

/// Run the batch and report. Returns exit code (0 or 2).
fn run_eval(args: &Args, config: &Config) -> Result<i32> {
    let cache_root = config.cache_root();
    info!("Cache root: {}", cache_root.display());

    let options = BatchOptions {
        scan: ScanConfig::from(&config.scanner),
        output: OutputOptions::from(&config.output),
        pipelines: args.pipeline.pipelines(),
        create_final: config.output.create_final,
        dry_run: args.dry_run,
        show_progress: args.show_progress(),
    };

    if args.dry_run {
        println!("🔍 Dry run: counting trial files (nothing is written)...\n");
    }

    let report = run_batch(&cache_root, &FsLister, &options)
        .with_context(|| format!("Failed to evaluate {}", cache_root.display()))?;

    if let Some(ref path) = args.report {
        let content = match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report),
        };
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report saved to {}", path.display());
    }

    if !args.quiet {
        println!("\n{}", report::console_summary(&report));
    }

    if report.has_failures() {
        warn!(
            "{} stage(s) failed across {} group(s)",
            report.metadata.stages_failed, report.metadata.groups_total
        );
        if args.fail_on_error {
            eprintln!("\n⛔ Some groups failed. Failing (exit code 2).");
            return Ok(2);
        }
    }

    Ok(0)
}
