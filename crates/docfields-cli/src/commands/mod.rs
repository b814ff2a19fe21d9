//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod correct;
pub mod output;
pub mod process;
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use tracing::debug;

use docfields_core::llm::ProviderKind;
use docfields_core::{
    DocfieldsConfig, DocumentPipeline, OcrDocument, PdfTextSource, ProcessingResult, SchemaRegistry,
};

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docfields")
        .join("config.json")
}

/// Explicit `--config` file, else the user file if present, else defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DocfieldsConfig> {
    if let Some(path) = path {
        return DocfieldsConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        return DocfieldsConfig::from_file(&default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()));
    }
    Ok(DocfieldsConfig::default())
}

pub fn load_registry(dir: &Path) -> anyhow::Result<SchemaRegistry> {
    if !dir.is_dir() {
        anyhow::bail!(
            "Schema directory not found: {}. Use --schema-dir or set schemas.dir.",
            dir.display()
        );
    }
    Ok(SchemaRegistry::load_dir(dir)?)
}

/// Provider names accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProviderArg {
    Openai,
    Gemini,
    Ollama,
    Mock,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Gemini => ProviderKind::Gemini,
            ProviderArg::Ollama => ProviderKind::Ollama,
            ProviderArg::Mock => ProviderKind::Mock,
        }
    }
}

/// Pipeline overrides shared by `process` and `batch`.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Document type (schema key)
    #[arg(short = 't', long)]
    pub doc_type: String,

    /// Schema directory (overrides schemas.dir)
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// Skip the language model
    #[arg(long)]
    pub no_llm: bool,

    /// Language-model provider (overrides llm.provider)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Validation threshold 0-100 (overrides extraction.confidence_threshold)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Confidence given to plain-text input
    #[arg(long, default_value = "100")]
    pub text_confidence: f64,
}

impl PipelineArgs {
    /// Apply overrides to `config`.
    pub fn apply(&self, config: &mut DocfieldsConfig) -> anyhow::Result<()> {
        if let Some(dir) = &self.schema_dir {
            config.schemas.dir = dir.clone();
        }
        if self.no_llm {
            config.llm.enabled = false;
        }
        if let Some(provider) = self.provider {
            config.llm.provider = provider.into();
        }
        if let Some(threshold) = self.threshold {
            config.extraction.confidence_threshold = threshold;
        }
        config.validate()?;
        Ok(())
    }

    /// Load the registry and build the pipeline, failing early on an unknown type.
    pub fn pipeline(&self, config: &DocfieldsConfig) -> anyhow::Result<DocumentPipeline> {
        let registry = load_registry(&config.schemas.dir)?;
        if !registry.contains(&self.doc_type) {
            anyhow::bail!(
                "Unknown document type '{}'. Available: {}",
                self.doc_type,
                registry.doc_types().join(", ")
            );
        }
        Ok(DocumentPipeline::from_config(config, Arc::new(registry)))
    }
}

/// Input file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// OCR collaborator JSON.
    OcrJson,
    /// PDF with a text layer.
    Pdf,
    /// Plain text.
    Text,
}

impl InputKind {
    pub fn detect(path: &Path) -> anyhow::Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(Self::OcrJson),
            "pdf" => Ok(Self::Pdf),
            "txt" | "text" | "md" => Ok(Self::Text),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp" => anyhow::bail!(
                "{} is an image; run it through an OCR engine and pass the OCR JSON instead",
                path.display()
            ),
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    pub fn is_supported(path: &Path) -> bool {
        Self::detect(path).is_ok()
    }
}

/// Read an input file as numbered pages. Single-page inputs are page 1.
pub fn read_pages(path: &Path, text_confidence: f64) -> anyhow::Result<Vec<(u32, OcrDocument)>> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    match InputKind::detect(path)? {
        InputKind::OcrJson => {
            let content = fs::read_to_string(path)?;
            let document: OcrDocument = serde_json::from_str(&content)
                .with_context(|| format!("{} is not an OCR document", path.display()))?;
            Ok(vec![(1, document)])
        }
        InputKind::Pdf => {
            let source = PdfTextSource::from_file(path)?;
            debug!("PDF has {} pages", source.page_count());
            Ok(source.pages()?)
        }
        InputKind::Text => {
            let text = fs::read_to_string(path)?;
            Ok(vec![(1, OcrDocument::from_text(text, text_confidence).with_engine("text"))])
        }
    }
}

/// Run a document through the pipeline. A single page is processed as a
/// plain document, without a page number.
pub async fn extract_pages(
    pipeline: &DocumentPipeline,
    doc_type: &str,
    mut pages: Vec<(u32, OcrDocument)>,
) -> anyhow::Result<Vec<ProcessingResult>> {
    if pages.len() == 1 {
        let (_, document) = pages.remove(0);
        return Ok(vec![pipeline.process(doc_type, &document).await?]);
    }
    Ok(pipeline.process_pages(doc_type, pages).await?)
}

/// File stem used for output names.
pub fn output_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}
