//! Raster time-series archiver.
//!
//! Walks a directory of per-timestep GeoTIFFs in sorted order and assembles
//! them into one Zarr V3 archive with lon/lat/time coordinates.

mod config_loader;
mod sources;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use grid_archive::{filesystem_store, ArchiveSummary, GeoTiffReader};

use config_loader::load_archive_config;
use sources::enumerate_inputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "raster-archiver")]
#[command(about = "Assemble per-timestep rasters into a chunked Zarr time-series archive")]
struct Args {
    /// Directory containing the input rasters (searched recursively)
    #[arg(short, long, env = "ARCHIVE_INPUT")]
    input: PathBuf,

    /// Path of the Zarr store to create
    #[arg(short, long, env = "ARCHIVE_OUTPUT")]
    output: PathBuf,

    /// Archive configuration file (YAML)
    #[arg(short, long, env = "ARCHIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Replace an existing store at the output path
    #[arg(long)]
    overwrite: bool,

    /// File extension of the input rasters
    #[arg(long, default_value = "tif")]
    extension: String,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        "Starting raster archiver"
    );

    match run(&args) {
        Ok(summary) => {
            info!(
                variable = %summary.variable,
                slices = summary.slices,
                shape = %summary.shape,
                first_day_offset = ?summary.first_day_offset,
                last_day_offset = ?summary.last_day_offset,
                "Archive complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Archive run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    match args.log_format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .json()
            .init(),
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init(),
    }
}

fn run(args: &Args) -> Result<ArchiveSummary> {
    let config = load_archive_config(args.config.as_deref())?;
    info!(
        variable = %config.variable.name,
        compression = %config.compression,
        date_pattern = %config.date_pattern,
        "Loaded configuration"
    );

    let inputs = enumerate_inputs(&args.input, &args.extension)?;
    info!(count = inputs.len(), extension = %args.extension, "Found input files");

    prepare_output(&args.output, args.overwrite)?;
    let store = filesystem_store(&args.output)
        .with_context(|| format!("Failed to open output store {:?}", args.output))?;

    let identifiers = inputs.iter().map(|p| p.to_string_lossy().into_owned());
    let summary = grid_archive::run(identifiers, &GeoTiffReader::new(), store, &config)
        .with_context(|| format!("Failed to build archive {:?}", args.output))?;

    Ok(summary)
}

/// Make sure nothing stale sits at the output path.
fn prepare_output(output: &Path, overwrite: bool) -> Result<()> {
    if !output.exists() {
        return Ok(());
    }

    anyhow::ensure!(
        overwrite,
        "Output {:?} already exists (use --overwrite to replace it)",
        output
    );

    if output.is_dir() {
        std::fs::remove_dir_all(output)
    } else {
        std::fs::remove_file(output)
    }
    .with_context(|| format!("Failed to remove existing output {:?}", output))?;

    info!(output = %output.display(), "Removed existing output");
    Ok(())
}
