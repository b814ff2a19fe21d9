//! Correct command - fold human corrections into a stored result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use docfields_core::pipeline::reapply;
use docfields_core::{Corrections, ProcessingResult};

use super::load_config;
use super::output::write_results;

/// Arguments for the correct command.
#[derive(Args)]
pub struct CorrectArgs {
    /// Stored result (`<name>_structured.json` or `process` JSON output)
    #[arg(required = true)]
    input: PathBuf,

    /// Correction as field=value (repeatable)
    #[arg(short, long = "set", value_name = "FIELD=VALUE")]
    set: Vec<String>,

    /// JSON object of field -> value corrections
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Only correct this page of a multi-page result
    #[arg(long)]
    page: Option<u32>,

    /// Output file (default: stdout)
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Overwrite the input file
    #[arg(long)]
    in_place: bool,

    /// Rewrite the output file set in this directory
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,
}

/// A stored single result or a per-page list.
#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    One(Box<ProcessingResult>),
    Pages(Vec<ProcessingResult>),
}

impl Stored {
    fn into_results(self) -> Vec<ProcessingResult> {
        match self {
            Stored::One(result) => vec![*result],
            Stored::Pages(results) => results,
        }
    }
}

pub fn run(args: CorrectArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let corrections = collect_corrections(&args.set, args.file.as_deref())?;
    if corrections.is_empty() {
        anyhow::bail!("No corrections given. Use --set FIELD=VALUE or --file corrections.json");
    }

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let stored: Stored = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a processing result", args.input.display()))?;
    let multi_page = matches!(stored, Stored::Pages(_));
    let results = stored.into_results();

    if let Some(page) = args.page {
        if !results.iter().any(|r| r.page_number == Some(page)) {
            anyhow::bail!("Page {} not found in {}", page, args.input.display());
        }
    }

    let mut corrected = Vec::with_capacity(results.len());
    for result in &results {
        let selected = args.page.is_none_or(|page| result.page_number == Some(page));
        if !selected {
            corrected.push(result.clone());
            continue;
        }

        for name in corrections.keys() {
            if result.structured_data.field(name).is_none() {
                eprintln!(
                    "{} Ignoring unknown field '{}'",
                    style("⚠").yellow(),
                    name
                );
            }
        }
        corrected.push(reapply(result, &corrections));
    }

    let json = if multi_page {
        serde_json::to_string_pretty(&corrected)?
    } else {
        serde_json::to_string_pretty(&corrected[0])?
    };

    if let Some(dir) = &args.output_dir {
        let stem = args
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_end_matches("_structured"))
            .unwrap_or("document");
        write_results(dir, stem, &corrected, config.extraction.confidence_threshold)?;
        debug!("Rewrote file set in {}", dir.display());
    }

    let target = if args.in_place {
        Some(args.input.as_path())
    } else {
        args.output.as_deref()
    };

    match target {
        Some(path) => {
            fs::write(path, &json)?;
            eprintln!(
                "{} Applied {} correction(s), written to {}",
                style("✓").green(),
                corrections.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Merge `--file` and `--set` corrections; `--set` wins on conflicts.
fn collect_corrections(set: &[String], file: Option<&Path>) -> anyhow::Result<Corrections> {
    let mut corrections = Corrections::new();

    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let object: serde_json::Map<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("{} must hold a JSON object", path.display()))?;
        for (name, value) in object {
            let value = match value {
                Value::String(s) => s,
                Value::Null => anyhow::bail!("Correction for '{}' is null", name),
                other => other.to_string(),
            };
            corrections.insert(name, value);
        }
    }

    for pair in set {
        let Some((name, value)) = pair.split_once('=') else {
            anyhow::bail!("Invalid correction '{}', expected FIELD=VALUE", pair);
        };
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Invalid correction '{}', field name is empty", pair);
        }
        corrections.insert(name.to_string(), value.to_string());
    }

    Ok(corrections)
}
