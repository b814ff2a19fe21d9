//! Batch processing command for multiple documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use docfields_core::{DocumentPipeline, ProcessingResult};

use super::output::{render, write_results, OutputFormat};
use super::{extract_pages, load_config, output_stem, read_pages, InputKind, PipelineArgs};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern (e.g. "scans/*.json")
    #[arg(required = true)]
    input: String,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Output directory; each document gets its own <name>/ file set
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write a rendering in this format next to each file set
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of documents processed concurrently
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileOutcome {
    path: PathBuf,
    results: Vec<ProcessingResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.pipeline.apply(&mut config)?;
    let threshold = config.extraction.confidence_threshold;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && InputKind::is_supported(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = args.pipeline.pipeline(&config)?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let jobs = args.jobs.max(1);
    let mut outcomes_stream = stream::iter(files)
        .map(|path| {
            let pipeline = &pipeline;
            let args = &args;
            async move {
                let file_start = Instant::now();
                let result = process_single_file(&path, pipeline, &args.pipeline).await;
                let processing_time_ms = file_start.elapsed().as_millis() as u64;
                (path, result, processing_time_ms)
            }
        })
        .buffered(jobs);

    let mut outcomes = Vec::new();
    while let Some((path, result, processing_time_ms)) = outcomes_stream.next().await {
        overall_pb.inc(1);
        match result {
            Ok(results) => outcomes.push(FileOutcome {
                path,
                results,
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = format!("{e:#}");
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    outcomes.push(FileOutcome {
                        path,
                        results: Vec::new(),
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    overall_pb.abandon();
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }
    }
    drop(outcomes_stream);

    overall_pb.finish_and_clear();

    let (successful, failed): (Vec<&FileOutcome>, Vec<&FileOutcome>) =
        outcomes.iter().partition(|o| o.error.is_none());

    if let Some(output_dir) = &args.output_dir {
        for outcome in &successful {
            let stem = output_stem(&outcome.path);
            let dir = output_dir.join(&stem);
            write_results(&dir, &stem, &outcome.results, threshold)?;

            if let Some(format) = args.format {
                let path = dir.join(format!("{stem}.{}", format.extension()));
                fs::write(&path, render(&outcome.results, format)?)?;
                debug!("Wrote {}", path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for outcome in &failed {
            eprintln!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn process_single_file(
    path: &Path,
    pipeline: &DocumentPipeline,
    args: &PipelineArgs,
) -> anyhow::Result<Vec<ProcessingResult>> {
    let pages = read_pages(path, args.text_confidence)?;
    extract_pages(pipeline, &args.doc_type, pages).await
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "pages",
        "coverage",
        "needs_validation",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if outcome.error.is_none() {
            let pages = outcome.results.len().max(1) as f64;
            let coverage: f64 = outcome
                .results
                .iter()
                .map(|r| r.structured_data.coverage())
                .sum::<f64>()
                / pages;
            let needs_validation: usize = outcome
                .results
                .iter()
                .map(|r| r.structured_data.validation_list().len())
                .sum();

            wtr.write_record([
                filename,
                "success",
                &outcome.results.len().to_string(),
                &format!("{coverage:.2}"),
                &needs_validation.to_string(),
                &outcome.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                &outcome.processing_time_ms.to_string(),
                outcome.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
