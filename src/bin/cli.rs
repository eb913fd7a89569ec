use clap::{Args, Parser, Subcommand, ValueEnum};
use eos_bloom_rs::{
    CommitPolicy, HarnessSettings, PolicyComparison, TrialReport,
    common::bits2hr, compare_policies, expected_false_positive_rate,
    optimal_bit_vector_size, optimal_num_hashes, run_policy,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one trial under a single commit policy
    Run {
        /// Offset commit policy of the change source
        #[arg(short, long, value_enum)]
        policy: PolicyArg,

        #[command(flatten)]
        trial: TrialArgs,
    },

    /// Run the periodic and the immediate policy on identical inputs
    Compare {
        #[command(flatten)]
        trial: TrialArgs,
    },

    /// Print filter sizing for a capacity and target false positive rate
    Sizing {
        /// Expected number of inserted keys
        #[arg(short, long, default_value = "30000")]
        capacity: usize,

        /// False positive rate (between 0 and 1)
        #[arg(short, long, default_value = "0.05")]
        fpr: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Periodic,
    Immediate,
}

/// Overrides for values read from the environment.
#[derive(Args)]
struct TrialArgs {
    /// Number of rows to insert
    #[arg(short, long)]
    rows: Option<u64>,

    /// Payload value of the first row
    #[arg(short, long)]
    start: Option<i64>,

    /// Force a source disconnect after every N insertions
    #[arg(short, long)]
    disconnect_every: Option<u64>,

    /// Offset flush interval of the periodic policy, in milliseconds
    #[arg(long)]
    flush_interval_ms: Option<u64>,

    /// Expected insertions the filter is sized for
    #[arg(long)]
    capacity: Option<usize>,

    /// Target false positive rate of the filter
    #[arg(long)]
    fpr: Option<f64>,

    /// Fail the run if it takes longer than this
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl TrialArgs {
    fn apply(&self, mut settings: HarnessSettings) -> HarnessSettings {
        if let Some(rows) = self.rows {
            settings.row_count = rows;
        }
        if let Some(start) = self.start {
            settings.start_value = start;
        }
        if let Some(every) = self.disconnect_every {
            settings.disconnect_every = every;
        }
        if let Some(ms) = self.flush_interval_ms {
            settings.flush_interval = Duration::from_millis(ms);
        }
        if let Some(capacity) = self.capacity {
            settings.bloom_capacity = capacity;
        }
        if let Some(fpr) = self.fpr {
            settings.bloom_false_positive_rate = fpr;
        }
        if let Some(secs) = self.deadline_secs {
            settings.deadline = Duration::from_secs(secs);
        }
        settings
    }
}

fn print_report(report: &TrialReport) {
    println!("{report}");
    println!("  Rows: {} (distinct {})", report.rows, report.distinct_rows);
    println!("  Disconnect every: {}", report.disconnect_every);
    println!("  Duplicates: {}", report.totals.duplicates);
    println!(
        "  False positives: {} (observed rate {:.4})",
        report.totals.false_positives,
        report.observed_false_positive_rate()
    );
    println!("  False negatives: {}", report.totals.false_negatives);
    println!("  Unique first sightings: {}", report.totals.uniques);
    println!(
        "  Filter: {} bits ({}), {} hashes, {} insertions",
        report.filter_bits,
        bits2hr(report.filter_bits),
        report.filter_hashes,
        report.filter_insertions
    );
}

/// Reports violated expectations and maps them to the exit code. In JSON
/// mode stdout carries only the document, so violations go to stderr.
fn print_violations(violations: &[String], json: bool) -> ExitCode {
    if violations.is_empty() {
        if !json {
            println!("All expectations met");
        }
        return ExitCode::SUCCESS;
    }
    for violation in violations {
        if json {
            eprintln!("Expectation failed: {violation}");
        } else {
            println!("Expectation failed: {violation}");
        }
    }
    ExitCode::FAILURE
}

fn print_comparison(comparison: &PolicyComparison) {
    print_report(&comparison.periodic);
    println!();
    print_report(&comparison.immediate);
    println!();
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { policy, trial } => {
            let settings = trial.apply(HarnessSettings::from_env()?);
            let policy = match policy {
                PolicyArg::Periodic => {
                    CommitPolicy::periodic(settings.flush_interval)
                }
                PolicyArg::Immediate => CommitPolicy::Immediate,
            };
            info!(%policy, rows = settings.row_count, "Running trial");

            let report =
                match run_policy(&settings, policy, settings.start_value).await {
                    Ok(report) => report,
                    Err(e) => {
                        error!(error = %e, "Trial failed");
                        return Ok(ExitCode::FAILURE);
                    }
                };

            if trial.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(print_violations(&report.check_expectations(), trial.json))
        }
        Commands::Compare { trial } => {
            let settings = trial.apply(HarnessSettings::from_env()?);

            let comparison = match compare_policies(&settings).await {
                Ok(comparison) => comparison,
                Err(e) => {
                    error!(error = %e, "Comparison failed");
                    return Ok(ExitCode::FAILURE);
                }
            };

            if trial.json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                print_comparison(&comparison);
            }
            Ok(print_violations(
                &comparison.check_expectations(),
                trial.json,
            ))
        }
        Commands::Sizing { capacity, fpr } => {
            if *capacity == 0 || *fpr <= 0.0 || *fpr >= 1.0 {
                println!("Error: capacity must be > 0 and fpr in (0, 1)");
                return Ok(ExitCode::FAILURE);
            }
            let bits = optimal_bit_vector_size(*capacity, *fpr);
            let hashes = optimal_num_hashes(*capacity, bits);

            println!("Bloom Filter Sizing:");
            println!("  Capacity: {capacity}");
            println!("  Target false positive rate: {fpr:.4}");
            println!("  Bit vector size: {bits} ({})", bits2hr(bits));
            println!("  Number of hash functions: {hashes}");
            println!(
                "  Rate at capacity: {:.4}",
                expected_false_positive_rate(*capacity, bits, hashes)
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
