use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

const INVOICE_TEXT: &str = "Invoice No: 42001543\nDate: 2023-05-01\nTotal:   1,353.00\n";

fn schema_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/structures")
}

/// The binary, isolated from the user's config and any `.env`.
fn docfields(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docfields").unwrap();
    cmd.current_dir(home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

fn field<'a>(result: &'a Value, name: &str) -> &'a Value {
    &result["structured_data"]["fields"][name]
}

#[test]
fn test_schema_list() {
    let home = TempDir::new().unwrap();
    docfields(&home)
        .args(["schema", "list", "--schema-dir"])
        .arg(schema_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("invoice").and(predicate::str::contains("id_card")));
}

#[test]
fn test_schema_validate_reports_bad_pattern() {
    let home = TempDir::new().unwrap();
    let bad = home.path().join("broken.json");
    fs::write(&bad, r#"{"items": [{"field": "a", "pattern": "(unclosed"}]}"#).unwrap();

    docfields(&home)
        .args(["schema", "validate"])
        .arg(&bad)
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid pattern"));
}

#[test]
fn test_process_text_without_llm() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("scan.txt");
    fs::write(&input, INVOICE_TEXT).unwrap();

    let output = docfields(&home)
        .args(["process", "-t", "invoice", "--no-llm", "--schema-dir"])
        .arg(schema_dir())
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["doc_type"], "invoice");
    assert_eq!(field(&result, "invoice_number")["value"], "42001543");
    assert_eq!(field(&result, "invoice_number")["source"], "ocr");
    assert_eq!(field(&result, "invoice_date")["value"], "2023-05-01");
    assert_eq!(field(&result, "invoice_date")["source"], "nlp");
    assert_eq!(field(&result, "seller")["value"], Value::Null);
    assert_eq!(field(&result, "seller")["source"], "unknown");

    let validation = result["structured_data"]["validation_list"].as_array().unwrap();
    assert!(validation.contains(&Value::from("seller")));
    assert!(!validation.contains(&Value::from("invoice_number")));
}

#[test]
fn test_process_unknown_doc_type() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("scan.txt");
    fs::write(&input, INVOICE_TEXT).unwrap();

    docfields(&home)
        .args(["process", "-t", "receipt", "--no-llm", "--schema-dir"])
        .arg(schema_dir())
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown document type 'receipt'"));
}

#[test]
fn test_process_then_correct() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("scan.txt");
    let out_dir = home.path().join("out");
    fs::write(&input, INVOICE_TEXT).unwrap();

    docfields(&home)
        .args(["process", "-t", "invoice", "--no-llm", "--format", "text", "--schema-dir"])
        .arg(schema_dir())
        .arg("--output-dir")
        .arg(&out_dir)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Coverage:"));

    assert_eq!(
        fs::read_to_string(out_dir.join("ocr_raw_text.txt")).unwrap(),
        INVOICE_TEXT
    );
    let validation = fs::read_to_string(out_dir.join("validation_list.csv")).unwrap();
    assert!(validation.starts_with("field,value,confidence,source,needs_validation\n"));
    assert!(validation.contains("seller,,0.00,unknown,true"));

    let stored = out_dir.join("scan_structured.json");
    docfields(&home)
        .arg("correct")
        .arg(&stored)
        .args(["--set", "seller=ACME Ltd", "--set", "vendor_code=X1", "--in-place"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring unknown field 'vendor_code'"));

    let corrected: Value = serde_json::from_str(&fs::read_to_string(&stored).unwrap()).unwrap();
    assert_eq!(field(&corrected, "seller")["value"], "ACME Ltd");
    assert_eq!(field(&corrected, "seller")["source"], "manual");
    assert_eq!(field(&corrected, "seller")["confidence"], 100.0);
    assert_eq!(field(&corrected, "seller")["needs_validation"], false);
    assert_eq!(field(&corrected, "invoice_number")["value"], "42001543");

    let validation = corrected["structured_data"]["validation_list"].as_array().unwrap();
    assert!(!validation.contains(&Value::from("seller")));
}

#[test]
fn test_config_init_and_get() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("docfields.json");

    docfields(&home)
        .args(["config", "init", "--output"])
        .arg(&config)
        .assert()
        .success();

    docfields(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "extraction.confidence_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("80"));
}
