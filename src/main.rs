use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use pdf_outline::batch::run_batch;
use pdf_outline::config::OutlineConfig;
use pdf_outline::dataset::{build_training_set, GroundTruth};
use pdf_outline::parse::{get_pdf_runs, load_pdf};
use pdf_outline::{featured_lines, OutlineExtractor};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Recover the title and heading outline of PDF documents.",
    arg_required_else_help = true
)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// JSON file overriding the default thresholds
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for a debug-level log file
    #[clap(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Log at debug level on stderr
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract the outline of a single PDF
    Extract {
        pdf_path: PathBuf,

        /// Directory holding the model artifacts
        #[clap(short, long)]
        model_dir: PathBuf,

        /// Optional output file path. If omitted, writes to stdout.
        #[clap(short, long)]
        output: Option<PathBuf>,

        #[clap(short, long)]
        pretty: bool,
    },
    /// Extract outlines for every PDF in a directory
    Batch {
        #[clap(short, long)]
        input: PathBuf,

        #[clap(short, long)]
        output: PathBuf,

        #[clap(short, long)]
        model_dir: PathBuf,
    },
    /// Export labeled feature vectors for a PDF and its expected outline
    Dataset {
        pdf_path: PathBuf,

        /// Expected outline JSON (`title` and `outline` entries)
        truth: PathBuf,

        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<OutlineConfig> {
    match path {
        Some(path) => OutlineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(OutlineConfig::default()),
    }
}

fn write_output(output: Option<&PathBuf>, json: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Output written to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = match &args.log_dir {
        Some(log_dir) => Some(pdf_outline::logging::init_logging_with_dir(
            args.verbose,
            log_dir.clone(),
        )?),
        None => {
            pdf_outline::logging::init_logging(args.verbose);
            None
        }
    };

    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Extract {
            pdf_path,
            model_dir,
            output,
            pretty,
        } => {
            let extractor = OutlineExtractor::from_model_dir(&model_dir, config)
                .with_context(|| format!("Failed to load model from {}", model_dir.display()))?;
            let result = extractor
                .extract_path(&pdf_path)
                .with_context(|| format!("Failed to process {}", pdf_path.display()))?;
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            write_output(output.as_ref(), &json)?;
        }
        Command::Batch {
            input,
            output,
            model_dir,
        } => {
            let extractor = OutlineExtractor::from_model_dir(&model_dir, config)
                .with_context(|| format!("Failed to load model from {}", model_dir.display()))?;
            let summary = run_batch(&extractor, &input, &output)?;
            info!(
                processed = summary.processed(),
                failed = summary.failed(),
                "Results saved to {}",
                output.display()
            );
            if summary.processed() == 0 && summary.failed() > 0 {
                bail!("All {} documents failed", summary.failed());
            }
        }
        Command::Dataset {
            pdf_path,
            truth,
            output,
        } => {
            let doc = load_pdf(&pdf_path)
                .with_context(|| format!("Failed to open {}", pdf_path.display()))?;
            let raw = get_pdf_runs(&doc, &config.layout)?;
            let truth_json = fs::read_to_string(&truth)
                .with_context(|| format!("Failed to read {}", truth.display()))?;
            let truth: GroundTruth =
                serde_json::from_str(&truth_json).context("Invalid ground truth JSON")?;
            let set = build_training_set(&featured_lines(&raw, &config), &truth);
            write_output(output.as_ref(), &serde_json::to_string_pretty(&set)?)?;
        }
    }

    Ok(())
}
