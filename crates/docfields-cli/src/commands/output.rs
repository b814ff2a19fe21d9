//! Rendering of processing results and the output directory file set.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use console::style;
use tracing::debug;

use docfields_core::{FieldResult, ProcessingResult, StructuredResult};

pub const OCR_TEXT_FILE: &str = "ocr_raw_text.txt";
pub const VALIDATION_FILE: &str = "validation_list.csv";

const FIELD_HEADER: [&str; 5] = ["field", "value", "confidence", "source", "needs_validation"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per field
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Render one result per page; a single result renders on its own.
pub fn render(results: &[ProcessingResult], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => render_json(results),
        OutputFormat::Csv => render_csv(results),
        OutputFormat::Text => Ok(render_text(results)),
    }
}

fn render_json(results: &[ProcessingResult]) -> anyhow::Result<String> {
    Ok(match results {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    })
}

fn render_csv(results: &[ProcessingResult]) -> anyhow::Result<String> {
    let paged = results.iter().any(|r| r.page_number.is_some()) && results.len() > 1;
    let mut wtr = csv::Writer::from_writer(vec![]);

    if paged {
        let mut header = vec!["page"];
        header.extend(FIELD_HEADER);
        wtr.write_record(&header)?;
    } else {
        wtr.write_record(FIELD_HEADER)?;
    }

    for result in results {
        let page = result.page_number.map(|p| p.to_string()).unwrap_or_default();
        for field in result.structured_data.fields() {
            let row = field_row(field);
            if paged {
                let mut record = vec![page.clone()];
                record.extend(row);
                wtr.write_record(&record)?;
            } else {
                wtr.write_record(&row)?;
            }
        }
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn field_row(field: &FieldResult) -> [String; 5] {
    [
        field.field_name.clone(),
        field.value.clone().unwrap_or_default(),
        format!("{:.2}", field.confidence),
        field.source.to_string(),
        field.needs_validation.to_string(),
    ]
}

fn render_text(results: &[ProcessingResult]) -> String {
    let mut output = String::new();

    for result in results {
        let data = &result.structured_data;
        match result.page_number {
            Some(page) if results.len() > 1 => {
                let _ = writeln!(output, "{} (page {})", result.structure_config, page);
            }
            _ => {
                let _ = writeln!(output, "{}", result.structure_config);
            }
        }
        let _ = writeln!(
            output,
            "Coverage: {:.1}%  Needs validation: {}",
            data.coverage(),
            data.validation_list().len()
        );
        output.push('\n');

        let width = data
            .fields()
            .iter()
            .map(|f| f.field_name.chars().count())
            .max()
            .unwrap_or(0);

        for field in data.fields() {
            let mark = if field.needs_validation {
                style("⚠").yellow()
            } else {
                style("✓").green()
            };
            let _ = writeln!(
                output,
                "  {} {:<width$}  {}  ({:.1}, {})",
                mark,
                field.field_name,
                field.value.as_deref().unwrap_or("-"),
                field.confidence,
                field.source,
            );
        }
        output.push('\n');
    }

    output.trim_end().to_string() + "\n"
}

/// Rows of `validation_list.csv`: the validation list, or when that is
/// empty, any field at or below `threshold`.
pub fn validation_rows(data: &StructuredResult, threshold: f64) -> Vec<&FieldResult> {
    if data.validation_list().is_empty() {
        return data
            .fields()
            .iter()
            .filter(|f| f.confidence <= threshold)
            .collect();
    }
    data.validation_list()
        .iter()
        .filter_map(|name| data.field(name))
        .collect()
}

pub fn render_validation_csv(data: &StructuredResult, threshold: f64) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(FIELD_HEADER)?;
    for field in validation_rows(data, threshold) {
        wtr.write_record(field_row(field))?;
    }
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

/// Write `ocr_raw_text.txt`, `validation_list.csv` and
/// `<stem>_structured.json` for one result into `dir`.
pub fn write_file_set(
    dir: &Path,
    stem: &str,
    result: &ProcessingResult,
    threshold: f64,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let ocr_path = dir.join(OCR_TEXT_FILE);
    fs::write(&ocr_path, &result.ocr_result.text)?;

    let validation_path = dir.join(VALIDATION_FILE);
    fs::write(&validation_path, render_validation_csv(&result.structured_data, threshold)?)?;

    let structured_path = dir.join(format!("{stem}_structured.json"));
    fs::write(&structured_path, serde_json::to_string_pretty(result)?)?;

    debug!("Wrote output file set to {}", dir.display());
    Ok(vec![ocr_path, validation_path, structured_path])
}

/// Write the file set for every page. Multi-page results go to one
/// `<stem>_p<N>` subdirectory per page.
pub fn write_results(
    dir: &Path,
    stem: &str,
    results: &[ProcessingResult],
    threshold: f64,
) -> anyhow::Result<Vec<PathBuf>> {
    if let [single] = results {
        return write_file_set(dir, stem, single, threshold);
    }

    let mut written = Vec::new();
    for result in results {
        let page_stem = match result.page_number {
            Some(page) => format!("{stem}_p{page}"),
            None => stem.to_string(),
        };
        written.extend(write_file_set(&dir.join(&page_stem), &page_stem, result, threshold)?);
    }
    Ok(written)
}
