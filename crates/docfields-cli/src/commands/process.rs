//! Process command - extract fields from a single document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::output::{render, write_results, OutputFormat};
use super::{extract_pages, load_config, output_stem, read_pages, PipelineArgs};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (OCR JSON, text-layer PDF, or plain text)
    #[arg(required = true)]
    input: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write ocr_raw_text.txt, validation_list.csv and <name>_structured.json here
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print a confidence summary after the output
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.pipeline.apply(&mut config)?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    pb.set_message("Loading schemas...");
    let pipeline = args.pipeline.pipeline(&config)?;

    pb.set_message("Reading document...");
    let pages = read_pages(&args.input, args.pipeline.text_confidence)?;
    debug!("Read {} page(s)", pages.len());

    pb.set_message("Extracting fields...");
    let results = extract_pages(&pipeline, &args.pipeline.doc_type, pages).await?;

    pb.finish_and_clear();

    if let Some(dir) = &args.output_dir {
        let threshold = config.extraction.confidence_threshold;
        let written = write_results(dir, &output_stem(&args.input), &results, threshold)?;
        eprintln!(
            "{} Wrote {} file(s) to {}",
            style("✓").green(),
            written.len(),
            dir.display()
        );
    }

    let output = render(&results, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output.trim_end());
    }

    if args.show_confidence {
        for result in &results {
            let data = &result.structured_data;
            let label = result
                .page_number
                .filter(|_| results.len() > 1)
                .map(|p| format!(" (page {p})"))
                .unwrap_or_default();
            eprintln!(
                "{} Coverage{}: {:.1}%, needs validation: {}",
                style("ℹ").blue(),
                label,
                data.coverage(),
                if data.validation_list().is_empty() {
                    "none".to_string()
                } else {
                    data.validation_list().join(", ")
                }
            );
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}
