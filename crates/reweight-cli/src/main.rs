//! CLI for reweight — make a biased sample speak for its population.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reweight")]
#[command(about = "reweight — measure sampling bias and correct it with per-record weights")]
#[command(version = reweight_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a population record file once and write its summary store
    /// (histograms + reservoir samples) for later validate runs
    Summarize {
        /// Path to the population JSONL stream (one record per line)
        #[arg(long)]
        population_stream: String,

        /// Categorical field to summarize (repeatable)
        #[arg(long = "categorical")]
        categorical: Vec<String>,

        /// Numeric field to summarize (repeatable)
        #[arg(long = "numeric")]
        numeric: Vec<String>,

        /// Timestamp field to summarize (repeatable); yields a month
        /// histogram and an epoch-seconds reservoir
        #[arg(long = "timestamp")]
        timestamp: Vec<String>,

        /// Output directory for the summary store
        #[arg(long, default_value = "summary_store")]
        outdir: String,

        /// RNG seed for reservoir sampling
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Reservoir capacity per numeric distribution
        #[arg(long, default_value = "500000")]
        reservoir: usize,
    },

    /// Compare the sample against the population: divergence tests, bias
    /// tables, distribution and quantile exports
    Validate {
        /// Path to the sample CSV table
        #[arg(long)]
        sample: String,

        /// Directory with precomputed population summaries (preferred when
        /// usable)
        #[arg(long)]
        summary_dir: Option<String>,

        /// Population JSONL stream, used as fallback when no usable summary
        /// store is given
        #[arg(long)]
        population_stream: Option<String>,

        /// Categorical field to test and weight (repeatable)
        #[arg(long = "categorical")]
        categorical: Vec<String>,

        /// Numeric field to test and weight (repeatable)
        #[arg(long = "numeric")]
        numeric: Vec<String>,

        /// Timestamp field to test and weight (repeatable)
        #[arg(long = "timestamp")]
        timestamp: Vec<String>,

        /// Output directory for bias tables and reports
        #[arg(long, default_value = "validation_outputs")]
        outdir: String,

        /// RNG seed for reservoir sampling
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Reservoir capacity per numeric distribution
        #[arg(long, default_value = "500000")]
        reservoir: usize,

        /// Number of quantile bins for numeric bias tables
        #[arg(long, default_value = "20")]
        nbins: usize,
    },

    /// Weight every sample record through exported bias tables and compute
    /// weighted aggregates and association metrics
    Aggregate {
        /// Path to the sample CSV table
        #[arg(long)]
        sample: String,

        /// Directory containing bias tables from a validate run
        #[arg(long)]
        bias_dir: String,

        /// Boolean marker column: correlated against numeric fields and
        /// cross-tabulated against categorical fields
        #[arg(long)]
        target: Option<String>,

        /// Categorical column to group weighted totals by
        #[arg(long)]
        group_by: Option<String>,

        /// Categorical field contributing a weight factor (repeatable)
        #[arg(long = "categorical")]
        categorical: Vec<String>,

        /// Numeric field contributing a weight factor (repeatable)
        #[arg(long = "numeric")]
        numeric: Vec<String>,

        /// Timestamp field contributing a weight factor (repeatable)
        #[arg(long = "timestamp")]
        timestamp: Vec<String>,

        /// Hard cap on combined record weights
        #[arg(long, default_value = "100.0")]
        w_max: f64,

        /// Output directory for aggregates and reports
        #[arg(long, default_value = "aggregate_outputs")]
        outdir: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize {
            population_stream,
            categorical,
            numeric,
            timestamp,
            outdir,
            seed,
            reservoir,
        } => commands::summarize::run(commands::summarize::SummarizeConfig {
            population_stream: &population_stream,
            fields: commands::field_specs(&categorical, &numeric, &timestamp),
            outdir: &outdir,
            seed,
            reservoir,
        }),
        Commands::Validate {
            sample,
            summary_dir,
            population_stream,
            categorical,
            numeric,
            timestamp,
            outdir,
            seed,
            reservoir,
            nbins,
        } => commands::validate::run(commands::validate::ValidateConfig {
            sample: &sample,
            summary_dir: summary_dir.as_deref(),
            population_stream: population_stream.as_deref(),
            fields: commands::field_specs(&categorical, &numeric, &timestamp),
            outdir: &outdir,
            seed,
            reservoir,
            nbins,
        }),
        Commands::Aggregate {
            sample,
            bias_dir,
            target,
            group_by,
            categorical,
            numeric,
            timestamp,
            w_max,
            outdir,
        } => commands::aggregate::run(commands::aggregate::AggregateConfig {
            sample: &sample,
            bias_dir: &bias_dir,
            target: target.as_deref(),
            group_by: group_by.as_deref(),
            fields: commands::field_specs(&categorical, &numeric, &timestamp),
            w_max,
            outdir: &outdir,
        }),
    }
}
