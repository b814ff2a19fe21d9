//! Schema command - inspect and validate field schemas.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use docfields_core::DocumentSchema;

use super::{load_config, load_registry};

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    /// Schema directory (overrides schemas.dir)
    #[arg(long, global = true)]
    schema_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: SchemaCommand,
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// List registered document types
    List,

    /// Show the fields of a document type
    Show {
        /// Document type
        doc_type: String,

        /// Print the schema document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check schema documents (a file, or every *.json in a directory)
    Validate {
        /// File or directory (default: the schema directory)
        path: Option<PathBuf>,
    },
}

pub fn run(args: SchemaArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let dir = args.schema_dir.unwrap_or(config.schemas.dir);

    match args.command {
        SchemaCommand::List => list_schemas(&dir),
        SchemaCommand::Show { doc_type, json } => show_schema(&dir, &doc_type, json),
        SchemaCommand::Validate { path } => validate_schemas(path.as_deref().unwrap_or(&dir)),
    }
}

fn list_schemas(dir: &Path) -> anyhow::Result<()> {
    let registry = load_registry(dir)?;
    let snapshot = registry.snapshot();

    if snapshot.is_empty() {
        println!("No schemas in {}", dir.display());
        return Ok(());
    }

    println!("{}", style("Document types:").bold());
    println!();
    for (doc_type, schema) in snapshot.iter() {
        println!(
            "  {:<20} {:<30} {} fields",
            style(doc_type).cyan(),
            schema.title,
            schema.fields().len()
        );
    }
    Ok(())
}

fn show_schema(dir: &Path, doc_type: &str, json: bool) -> anyhow::Result<()> {
    let registry = load_registry(dir)?;
    let schema = registry.get(doc_type)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schema.to_document())?);
        return Ok(());
    }

    println!("{} ({})", style(&schema.title).bold(), schema.doc_type);
    if let Some(description) = &schema.description {
        println!("{description}");
    }
    println!();

    for field in schema.fields() {
        let required = if field.required { "required" } else { "optional" };
        println!(
            "  {:<24} {:<8} {:<8} {}",
            style(&field.name).cyan(),
            field.field_type,
            required,
            field.pattern().unwrap_or("")
        );
        if !field.aliases.is_empty() {
            println!("  {:<24} aliases: {}", "", field.aliases.join(", "));
        }
    }
    Ok(())
}

fn validate_schemas(path: &Path) -> anyhow::Result<()> {
    let files: Vec<PathBuf> = if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        files.sort();
        files
    } else if path.exists() {
        vec![path.to_path_buf()]
    } else {
        anyhow::bail!("Schema path not found: {}", path.display());
    };

    let mut invalid = 0;
    for file in &files {
        match DocumentSchema::from_file(file) {
            Ok(schema) => println!(
                "{} {} ({} fields)",
                style("✓").green(),
                file.display(),
                schema.fields().len()
            ),
            Err(e) => {
                invalid += 1;
                println!("{} {}: {}", style("✗").red(), file.display(), e);
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{} of {} schema file(s) are invalid", invalid, files.len());
    }
    Ok(())
}
