//! The `xzarrguard` command line interface.
//!
//! ```text
//! xzarrguard check <STORE_PATH> [--json] [--timing] [--strict-stale]
//! xzarrguard create <SOURCE> <TARGET> [--no-data FILE] [--overwrite] [--strategy manifest|empty_chunks] [--consolidated]
//! ```
//!
//! Exit codes:
//!  - `0`: the store passed its check, or was created,
//!  - `1`: the store failed its check,
//!  - `2`: an operational error, such as an unreadable store or an invalid no-data document.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use xzarrguard::dataset::{DatasetReader, ZarrV3Reader};
use xzarrguard::{
    check_store_opt, create_store, load_no_data_chunks, CheckOptions, CreateOptions,
    NoDataStrategy,
};

type Result<T> = std::result::Result<T, anyhow::Error>;

/// Exit code of a passing check or a successful create.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code of a failing check.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code of an operational error.
pub const EXIT_ERROR: u8 = 2;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "xzarrguard", version)]
#[command(about = "Check and create integrity-aware Zarr V3 stores")]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// `xzarrguard` subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check store completeness
    Check(CheckArgs),
    /// Create an integrity-aware store
    Create(CreateArgs),
}

/// Arguments of `xzarrguard check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the Zarr store
    #[arg(value_name = "STORE_PATH")]
    pub store_path: PathBuf,

    /// Print a JSON report
    #[arg(long)]
    pub json: bool,

    /// Print coarse timing details
    #[arg(long)]
    pub timing: bool,

    /// Fail when a manifest lists chunks that exist
    #[arg(long)]
    pub strict_stale: bool,
}

/// Arguments of `xzarrguard create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Source Zarr V3 store with uncompressed arrays
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target store path
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// JSON mapping of variable to no-data chunk coordinates
    #[arg(long, value_name = "FILE")]
    pub no_data: Option<PathBuf>,

    /// Overwrite the target if it exists
    #[arg(long)]
    pub overwrite: bool,

    /// How no-data chunks are stored
    #[arg(long, value_name = "STRATEGY", default_value_t = NoDataStrategy::Manifest)]
    pub strategy: NoDataStrategy,

    /// Embed consolidated metadata in the root group of the target
    #[arg(long)]
    pub consolidated: bool,
}

/// Run a parsed command, writing results to `out` and errors to `err`.
///
/// Returns the process exit code.
pub fn run(cli: Cli, out: &mut impl Write, err: &mut impl Write) -> u8 {
    let result = match cli.command {
        Command::Check(args) => run_check(&args, out),
        Command::Create(args) => run_create(&args, out),
    };
    result.unwrap_or_else(|error| {
        // Nothing else to report to if stderr is gone
        let _ = writeln!(err, "error: {error}");
        EXIT_ERROR
    })
}

fn run_check(args: &CheckArgs, out: &mut impl Write) -> Result<u8> {
    let options = CheckOptions::default()
        .with_strict_stale_manifest(args.strict_stale)
        .with_timing(args.timing);
    let report = check_store_opt(&args.store_path, &options)?;

    if args.json {
        writeln!(out, "{}", report.to_json_pretty()?)?;
    } else {
        write!(out, "{report}")?;
    }

    Ok(if report.is_ok() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

fn run_create(args: &CreateArgs, out: &mut impl Write) -> Result<u8> {
    let no_data_chunks = args
        .no_data
        .as_deref()
        .map(load_no_data_chunks)
        .transpose()?;
    let dataset = ZarrV3Reader::new().read(&args.source)?;

    let options = CreateOptions::default()
        .with_overwrite(args.overwrite)
        .with_no_data_strategy(args.strategy)
        .with_consolidated_metadata(args.consolidated);
    let report = create_store(&dataset, &args.target, no_data_chunks.as_ref(), &options)?;

    writeln!(out, "created: {}", report.store_path())?;
    if !report.manifests_written().is_empty() {
        writeln!(out, "manifests: {}", report.manifests_written().len())?;
    }
    Ok(EXIT_SUCCESS)
}
