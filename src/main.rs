use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kiparla::{
    process_transcript, read_ignore_file, read_transcript_file, write_conll, write_linear,
    ProcessingConfig, Transcript, TranscriptDocument, TranscriptStats,
};

#[derive(Parser)]
#[command(name = "kiparla")]
#[command(author, version, about = "Jefferson transcript normalization and overlap reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, tokenize and align transcripts, writing CoNLL and per-unit tables
    Process {
        /// Input transcript tables (tab-separated, one unit per row)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Directory for the output files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Overlaps shorter than this (seconds) with no brackets are resynced away
        #[arg(long, default_value = "0.1")]
        duration_threshold: f64,

        /// JSON file listing unit ids whose overlaps must be ignored
        #[arg(long)]
        ignore_file: Option<PathBuf>,

        /// Speaker tiers to skip (replaces the default list)
        #[arg(long)]
        ignore_tier: Vec<String>,

        /// Also write the full transcript as JSON
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print statistics for a transcript
    Analyze {
        /// Input transcript table
        #[arg(short, long)]
        input: PathBuf,

        /// Sampling interval for cumulative series, in seconds
        #[arg(long, default_value = "60")]
        split_size: f64,

        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output_dir,
            duration_threshold,
            ignore_file,
            ignore_tier,
            json,
            verbose,
        } => {
            setup_logging(verbose);
            let mut config = ProcessingConfig {
                duration_threshold,
                ..Default::default()
            };
            if !ignore_tier.is_empty() {
                config.tiers_to_ignore = ignore_tier;
            }
            if let Some(path) = ignore_file {
                config.ignore_relations = read_ignore_file(&path)?;
            }
            process_files(&input, &output_dir, &config, json)
        }
        Commands::Analyze {
            input,
            split_size,
            json,
            verbose,
        } => {
            setup_logging(verbose);
            analyze_transcript(&input, split_size, json)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn transcript_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".to_string())
}

fn load(path: &Path, config: &ProcessingConfig) -> Result<Transcript> {
    info!("Loading transcript from {:?}", path);
    let rows = read_transcript_file(path)?;
    Ok(process_transcript(&transcript_id(path), &rows, config))
}

fn process_files(
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &ProcessingConfig,
    json: bool,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    for input in inputs {
        let transcript = load(input, config)?;
        let tr_id = &transcript.tr_id;

        let conll_path = output_dir.join(format!("{}.conll", tr_id));
        write_conll(&transcript, &conll_path)?;
        let linear_path = output_dir.join(format!("{}.tus.tsv", tr_id));
        write_linear(&transcript, &linear_path)?;
        info!("Output written to {:?} and {:?}", conll_path, linear_path);

        if json {
            let json_path = output_dir.join(format!("{}.json", tr_id));
            TranscriptDocument::new(&transcript, config.duration_threshold)
                .write_json(&json_path)?;
            info!("JSON output written to {:?}", json_path);
        }

        let flagged = transcript
            .iter()
            .filter(|unit| !unit.diagnostics.errors.is_empty())
            .count();
        if flagged > 0 {
            warn!("{}: {} units carry annotation errors", tr_id, flagged);
        }
    }

    Ok(())
}

fn analyze_transcript(input: &Path, split_size: f64, json: bool) -> Result<()> {
    let transcript = load(input, &ProcessingConfig::default())?;
    let stats = TranscriptStats::compute(&transcript, split_size);

    if json {
        let rendered =
            serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("Transcript Analysis: {}", transcript.tr_id);
    println!("==================");
    println!("{}", stats.summary());
    Ok(())
}
