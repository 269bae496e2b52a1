#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

use clap::{Args, Parser, Subcommand};
use gexa::ml::output::{write_envelope, Envelope, Operation};
use gexa::{
    AnalysisError, ClusteringParams, DatasetSource, DifferentialParams, InlineSource,
    PathSource, Result,
};
use log::info;
use std::io::Read;
use std::path::PathBuf;

/// gexa - statistical analysis of gene-expression tables
#[derive(Parser, Debug)]
#[command(name = "gexa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write the JSON envelope to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

/// Where the dataset comes from
#[derive(Args, Debug)]
struct SourceArgs {
    /// Dataset file (.csv, .tsv or .txt)
    #[arg(short, long, required_unless_present = "stdin")]
    dataset: Option<PathBuf>,

    /// Read dataset content from stdin
    #[arg(long, requires = "name", conflicts_with = "dataset")]
    stdin: bool,

    /// File name for stdin content; its extension selects the delimiter
    #[arg(long)]
    name: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Descriptive statistics per numeric column
    Stats {
        #[command(flatten)]
        source: SourceArgs,

        /// Restrict to these columns (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Correlation matrix between numeric columns
    Correlation {
        #[command(flatten)]
        source: SourceArgs,

        /// pearson or spearman
        #[arg(short, long, default_value = "pearson")]
        method: String,
    },

    /// Differential expression between two conditions
    Differential {
        #[command(flatten)]
        source: SourceArgs,

        /// First condition label
        #[arg(long)]
        condition1: String,

        /// Second condition label
        #[arg(long)]
        condition2: String,

        /// Significance threshold for p-values
        #[arg(short, long, default_value = "0.05")]
        p_threshold: f64,
    },

    /// K-means clustering with a 2D PCA projection
    Clustering {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of clusters
        #[arg(short = 'k', long, default_value = "3")]
        clusters: usize,

        /// Clustering method (kmeans)
        #[arg(short, long, default_value = "kmeans")]
        method: String,

        /// Seed for centroid initialization
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() {
    let args = Cli::parse();

    let log_level = args
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: Invalid log level '{}' provided. Defaulting to warn.",
                args.log_level
            );
            log::LevelFilter::Warn
        });
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_micros()
        .init();

    let envelope = match run(args.command) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::error!("{e}");
            Envelope::failure(&e)
        }
    };

    let success = envelope.success;
    if let Err(e) = write_envelope(args.output.as_deref(), &envelope) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if !success {
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<Envelope> {
    match command {
        Commands::Stats { source, columns } => {
            let source = open_source(&source)?;
            let columns = (!columns.is_empty()).then_some(columns.as_slice());
            let report = gexa::basic_stats(source.as_ref(), columns)?;
            Envelope::success(Operation::Stats, &report)
        }

        Commands::Correlation { source, method } => {
            let source = open_source(&source)?;
            let matrix = gexa::correlation(source.as_ref(), &method)?;
            Envelope::success(Operation::Correlation, &matrix)
        }

        Commands::Differential {
            source,
            condition1,
            condition2,
            p_threshold,
        } => {
            let source = open_source(&source)?;
            let params =
                DifferentialParams::new(condition1, condition2).with_p_threshold(p_threshold);
            let result = gexa::differential(source.as_ref(), &params)?;
            info!(
                "{} of {} genes significant ({:?} mode)",
                result.significant_genes, result.total_genes, result.mode
            );
            Envelope::success(Operation::Differential, &result)
        }

        Commands::Clustering {
            source,
            clusters,
            method,
            seed,
        } => {
            let source = open_source(&source)?;
            let params = ClusteringParams {
                n_clusters: clusters,
                method: method.parse()?,
                seed,
            };
            let result = gexa::clustering_with_params(source.as_ref(), &params)?;
            Envelope::success(Operation::Clustering, &result)
        }
    }
}

/// Build the dataset source from CLI arguments
fn open_source(args: &SourceArgs) -> Result<Box<dyn DatasetSource>> {
    if args.stdin {
        let name = args.name.clone().ok_or_else(|| {
            AnalysisError::InvalidParameter("--name is required with --stdin".into())
        })?;
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(Box::new(InlineSource::new(name, content)));
    }

    let path = args
        .dataset
        .clone()
        .ok_or_else(|| AnalysisError::InvalidParameter("--dataset is required".into()))?;
    Ok(Box::new(PathSource::new(path)))
}
