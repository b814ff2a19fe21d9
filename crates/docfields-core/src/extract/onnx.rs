//! ONNX token-classification recogniser.
//!
//! The model directory must contain `model.onnx`, `tokenizer.json` and a
//! Hugging Face style `config.json` with an `id2label` map.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{ArrayView3, Axis};
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::recognizer::{EntityRecognizer, LabeledSpan};
use crate::error::NerError;

/// Recogniser backed by an ONNX Runtime session.
pub struct OnnxRecognizer {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    uses_token_types: bool,
}

#[derive(Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

impl OnnxRecognizer {
    /// Load the model, tokenizer and label map from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, NerError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");

        for path in [&model_path, &tokenizer_path, &config_path] {
            if !path.exists() {
                return Err(NerError::ModelLoad(format!("{} not found", path.display())));
            }
        }

        let session = Session::builder()
            .map_err(|e| NerError::ModelLoad(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e| NerError::ModelLoad(e.to_string()))?;

        let uses_token_types = session.inputs().iter().any(|i| i.name() == "token_type_ids");

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| NerError::ModelLoad(format!("load tokenizer: {e}")))?;

        let labels = read_labels(&config_path)?;

        info!(
            labels = labels.len(),
            model = %model_path.display(),
            "loaded NER model"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
            uses_token_types,
        })
    }
}

impl EntityRecognizer for OnnxRecognizer {
    fn name(&self) -> &str {
        "onnx-ner"
    }

    fn recognize(&self, text: &str) -> Result<Vec<LabeledSpan>, NerError> {
        let inference = |e: ort::Error| NerError::Inference(e.to_string());

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| NerError::Inference(format!("tokenize: {e}")))?;

        let seq_len = encoding.get_ids().len();
        if seq_len == 0 {
            return Ok(Vec::new());
        }

        let to_i64 = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<_>>().into_boxed_slice();
        let shape = [1i64, seq_len as i64];

        let ids = Tensor::from_array((shape, to_i64(encoding.get_ids()))).map_err(inference)?;
        let mask = Tensor::from_array((shape, to_i64(encoding.get_attention_mask()))).map_err(inference)?;

        let (dims, logits) = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| NerError::Inference(format!("failed to lock session: {e}")))?;

            let outputs = if self.uses_token_types {
                let types = Tensor::from_array((shape, to_i64(encoding.get_type_ids()))).map_err(inference)?;
                session.run(ort::inputs![
                    "input_ids" => ids,
                    "attention_mask" => mask,
                    "token_type_ids" => types,
                ])
            } else {
                session.run(ort::inputs![
                    "input_ids" => ids,
                    "attention_mask" => mask,
                ])
            }
            .map_err(inference)?;

            let (shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(inference)?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            (dims, data.to_vec())
        };

        if dims.len() != 3 || dims[0] != 1 || dims[1] != seq_len {
            return Err(NerError::Inference(format!(
                "unexpected output shape {dims:?}, expected [1, {seq_len}, labels]"
            )));
        }

        let logits = ArrayView3::from_shape((dims[0], dims[1], dims[2]), &logits)
            .map_err(|e| NerError::Inference(e.to_string()))?;
        let logits = logits.index_axis(Axis(0), 0);

        let token_labels: Vec<Option<&str>> = logits
            .outer_iter()
            .enumerate()
            .map(|(j, row)| {
                if encoding.get_special_tokens_mask().get(j).copied().unwrap_or(0) == 1 {
                    return None;
                }
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
                    .0;
                self.labels.get(best).map(String::as_str)
            })
            .collect();

        let spans = merge_tokens(&token_labels, encoding.get_offsets());
        debug!("NER produced {} span(s)", spans.len());
        Ok(spans)
    }
}

/// Merge per-token BIO labels into labelled byte spans.
fn merge_tokens(labels: &[Option<&str>], offsets: &[(usize, usize)]) -> Vec<LabeledSpan> {
    let mut spans: Vec<LabeledSpan> = Vec::new();
    let mut current: Option<LabeledSpan> = None;

    for (label, &(start, end)) in labels.iter().zip(offsets) {
        let Some(label) = label.filter(|l| *l != "O" && start < end) else {
            spans.extend(current.take());
            continue;
        };
        let (begins, bare) = match label.split_once('-') {
            Some(("B" | "S" | "U", rest)) => (true, rest),
            Some(("I" | "E" | "L", rest)) => (false, rest),
            _ => (false, label),
        };

        match current.as_mut() {
            Some(span) if !begins && span.label == bare => span.end = end,
            _ => {
                spans.extend(current.take());
                current = Some(LabeledSpan {
                    label: bare.to_string(),
                    start,
                    end,
                });
            }
        }
    }
    spans.extend(current);
    spans
}

fn read_labels(path: &Path) -> Result<Vec<String>, NerError> {
    let content = std::fs::read_to_string(path).map_err(|e| NerError::ModelLoad(e.to_string()))?;
    let config: ModelConfig =
        serde_json::from_str(&content).map_err(|e| NerError::ModelLoad(format!("config.json: {e}")))?;

    let mut indexed: Vec<(usize, String)> = config
        .id2label
        .into_iter()
        .filter_map(|(id, label)| id.parse().ok().map(|id| (id, label)))
        .collect();
    indexed.sort();

    let size = indexed.last().map_or(0, |(id, _)| id + 1);
    let mut labels = vec!["O".to_string(); size];
    for (id, label) in indexed {
        labels[id] = label;
    }
    Ok(labels)
}
