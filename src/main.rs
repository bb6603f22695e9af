//! DeFi Sentinel entrypoint: `build` turns ingested NDJSON events into
//! feature and anomaly outputs, `validate` checks event files against the
//! canonical schema without touching any output.

use clap::{Args, Parser, Subcommand};
use defi_sentinel::{
    config::{PathsConfig, SentinelConfig},
    ingest,
    logging::StructuredLogger,
    normalize::{Normalizer, SCHEMA_V0_1},
    pipeline::{build_features, BuildSummary, RunStatus},
    validate::{validate_files, ValidationReport},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_OK: u8 = 0;
const EXIT_FATAL: u8 = 1;
const EXIT_REJECTED: u8 = 2;
const EXIT_NO_DATA: u8 = 3;

#[derive(Parser)]
#[command(name = "defi-sentinel", version, about)]
struct Cli {
    /// JSON config file; missing means defaults
    #[arg(long, env = "SENTINEL_CONFIG_PATH", default_value = "sentinel.json", global = true)]
    config: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize, aggregate and write feature/anomaly outputs
    Build(BuildArgs),
    /// Validate event files against the canonical schema
    Validate(ValidateArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Root for the default ingest/fixtures/features layout
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    ingest_dir: Option<PathBuf>,
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    /// Output directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    /// Files or directories; defaults to the fixtures directory
    paths: Vec<PathBuf>,
}

fn resolve_paths(config: &SentinelConfig, args: &BuildArgs) -> PathsConfig {
    let mut paths = match &args.data_dir {
        Some(dir) => PathsConfig::under(dir),
        None => config.paths.clone(),
    };
    if let Some(dir) = &args.ingest_dir {
        paths.ingest_dir = dir.clone();
    }
    if let Some(dir) = &args.fixtures_dir {
        paths.fixtures_dir = dir.clone();
    }
    if let Some(dir) = &args.out_dir {
        paths.features_dir = dir.clone();
    }
    paths
}

fn run_build(config: &SentinelConfig, args: &BuildArgs) -> defi_sentinel::Result<ExitCode> {
    let paths = resolve_paths(config, args);
    info!(
        data_dir = %paths.data_dir.display(),
        features_dir = %paths.features_dir.display(),
        "resolved paths"
    );
    let inputs = ingest::gather_inputs(&[paths.ingest_dir.as_path(), paths.fixtures_dir.as_path()])?;
    if inputs.is_empty() {
        println!(
            "No input events found in {} or {}.",
            paths.ingest_dir.display(),
            paths.fixtures_dir.display()
        );
        return Ok(ExitCode::from(EXIT_NO_DATA));
    }

    let normalizer = Normalizer::new(&SCHEMA_V0_1);
    let summary = build_features(&normalizer, &inputs, &paths.features_dir)?;
    print_build(&summary, &paths);

    Ok(ExitCode::from(build_exit_code(summary.status)))
}

fn build_exit_code(status: RunStatus) -> u8 {
    match status {
        RunStatus::Clean => EXIT_OK,
        RunStatus::Rejected => EXIT_REJECTED,
        RunStatus::NoData => EXIT_NO_DATA,
    }
}

fn validate_exit_code(report: &ValidationReport) -> u8 {
    if report.passed() {
        EXIT_OK
    } else {
        EXIT_REJECTED
    }
}

fn print_build(summary: &BuildSummary, paths: &PathsConfig) {
    println!(
        "processed {} records from {} files: {} malformed, {} rejected, {} events",
        summary.records + summary.malformed,
        summary.files,
        summary.malformed,
        summary.rejected,
        summary.events
    );
    match summary.status {
        RunStatus::NoData => println!("No events to compute features."),
        RunStatus::Clean | RunStatus::Rejected => println!(
            "wrote {} feature rows and {} anomalies to {}",
            summary.feature_rows,
            summary.anomalies,
            paths.features_dir.display()
        ),
    }
}

fn run_validate(config: &SentinelConfig, args: &ValidateArgs) -> defi_sentinel::Result<ExitCode> {
    let paths = if args.paths.is_empty() {
        ingest::jsonl_files_in(&config.paths.fixtures_dir)?
    } else {
        ingest::expand_paths(&args.paths)?
    };
    if paths.is_empty() {
        println!("No fixture files found.");
        return Ok(ExitCode::from(EXIT_NO_DATA));
    }

    let normalizer = Normalizer::new(&SCHEMA_V0_1);
    let report = validate_files(&normalizer, &paths)?;
    print_validation(&report);

    Ok(ExitCode::from(validate_exit_code(&report)))
}

fn print_validation(report: &ValidationReport) {
    for file in &report.files {
        for failure in &file.failures {
            println!("{}:{} {}", file.name(), failure.line, failure.reason);
        }
        let status = if file.is_ok() { "ok" } else { "fail" };
        println!("{}: {} ({} records)", file.name(), status, file.records);
    }
    if report.passed() {
        println!("validation passed: {} records", report.total_records());
    } else {
        println!(
            "validation failed: {} errors across {} records",
            report.total_failures(),
            report.total_records()
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match SentinelConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    StructuredLogger::init(cli.log_json || config.log.json, level);

    let result = match &cli.command {
        Command::Build(args) => run_build(&config, args),
        Command::Validate(args) => run_validate(&config, args),
    };
    match result {
        Ok(code) => {
            info!("defi-sentinel finished");
            code
        }
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
