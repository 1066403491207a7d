//! Rebuild an MBP-10 CSV file from an MBO CSV file.
//!
//! # Usage
//!
//! ```bash
//! mbo_to_mbp data/ARL_2025-07-17.mbo.csv -o output_mbp.csv
//!
//! # Match trade cancels on the resting side, keep a leading clear
//! mbo_to_mbp mbo.csv --cancel-match resting-side --keep-initial-clear
//!
//! # Export diagnostics, log only high-severity ones, print the final book
//! mbo_to_mbp mbo.csv --warnings-json warnings.json --min-warning-severity 3 --print-book
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use mbo_mbp_reconstructor::{
    CancelMatchPolicy, CsvSink, CsvSource, MbpReconstructor, ReconstructorConfig, Result,
    RunSummary, WarningTrackerConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CancelMatchArg {
    /// Cancel side equals the trade's (aggressor) side
    SameSide,
    /// Cancel side equals the resting side
    RestingSide,
}

impl From<CancelMatchArg> for CancelMatchPolicy {
    fn from(arg: CancelMatchArg) -> Self {
        match arg {
            CancelMatchArg::SameSide => CancelMatchPolicy::SameSide,
            CancelMatchArg::RestingSide => CancelMatchPolicy::RestingSide,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mbo_to_mbp")]
#[command(about = "Rebuild MBP-10 snapshots from an MBO event file")]
struct Cli {
    /// MBO input file (CSV with header)
    input: PathBuf,

    /// MBP-10 output file
    #[arg(short, long, default_value = "output_mbp.csv")]
    output: PathBuf,

    /// Emit a snapshot for a clear that is the first record
    #[arg(long)]
    keep_initial_clear: bool,

    /// How a cancel is matched against pending trades
    #[arg(long, value_enum, default_value_t = CancelMatchArg::SameSide)]
    cancel_match: CancelMatchArg,

    /// Write recorded diagnostics to this JSON file
    #[arg(long)]
    warnings_json: Option<PathBuf>,

    /// Print the final book
    #[arg(long)]
    print_book: bool,

    /// Lowest diagnostic severity forwarded to the log (1-3)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    min_warning_severity: u8,

    /// Log progress every N records (0 disables)
    #[arg(long, default_value_t = 10_000)]
    progress_interval: u64,
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let config = ReconstructorConfig::new()
        .with_skip_initial_clear(!cli.keep_initial_clear)
        .with_cancel_match(cli.cancel_match.into())
        .with_progress_interval(cli.progress_interval)
        .with_warnings(
            WarningTrackerConfig::default().with_min_log_severity(cli.min_warning_severity),
        );
    let mut reconstructor = MbpReconstructor::with_config(config);

    let source = CsvSource::new(&cli.input)?;
    let mut sink = CsvSink::create(&cli.output)?;
    let summary = reconstructor.run(source, &mut sink)?;

    if let Some(path) = &cli.warnings_json {
        reconstructor.warnings().export_to_file(path)?;
        log::info!("Diagnostics written to {}", path.display());
    }

    if cli.print_book {
        println!("{}", reconstructor.book());
    }

    Ok(summary)
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    println!("Reading MBO data from: {}", cli.input.display());

    let summary = match run(&cli) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stats = &summary.stats;
    println!("\n{}", "=".repeat(60));
    println!("Reconstruction Complete!");
    println!("  Records read: {}", summary.events_read);
    println!("  Snapshots written: {}", summary.snapshots_written);
    println!(
        "  Trades: {} resolved, {} flushed, {} abandoned",
        stats.trades_resolved, stats.trades_flushed, stats.trades_abandoned
    );
    if stats.initial_clear_skipped {
        println!("  Initial clear skipped");
    }
    if stats.crossed_snapshots > 0 {
        println!("  Crossed snapshots: {}", stats.crossed_snapshots);
    }
    println!("  Processing time: {} ms", summary.elapsed.as_millis());
    println!("  Output written to: {}", cli.output.display());

    ExitCode::SUCCESS
}
