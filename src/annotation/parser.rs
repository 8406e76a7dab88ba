//! Batch output retrieval and per-record parsing.

use std::collections::BTreeMap;

use serde_json::Value;

use super::extract::extract_label_json;
use super::label::{ContactLabel, EpisodeAnnotations, FrameAnnotation};
use crate::batch::{parse_custom_id, BatchApi, BatchStatus};
use crate::error::{AnnotationError, BatchError};

/// Raw output and error records of a finished batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    pub records: Vec<Value>,
    pub errors: Vec<Value>,
}

/// Parse a JSONL document, skipping blank lines.
pub fn parse_jsonl(content: &str) -> Result<Vec<Value>, BatchError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| BatchError::ParseError(format!("line {}: {}", i + 1, e)))
        })
        .collect()
}

/// Download the output (and error) records of a completed batch.
pub async fn retrieve_results(api: &dyn BatchApi, batch_id: &str) -> Result<BatchResults, BatchError> {
    let batch = api.retrieve_batch(batch_id).await?;
    tracing::info!(batch_id, status = %batch.status, "Batch status");

    if batch.status != BatchStatus::Completed {
        return Err(BatchError::NotCompleted {
            id: batch_id.to_string(),
            status: batch.status.to_string(),
        });
    }
    let output_file_id = batch
        .output_file_id
        .as_deref()
        .ok_or_else(|| BatchError::MissingOutput(batch_id.to_string()))?;

    tracing::info!(file_id = output_file_id, "Downloading batch output");
    let records = parse_jsonl(&api.file_content(output_file_id).await?)?;

    let errors = match batch.error_file_id.as_deref() {
        Some(error_file_id) => {
            let errors = parse_jsonl(&api.file_content(error_file_id).await?)?;
            if !errors.is_empty() {
                tracing::warn!(count = errors.len(), "Batch reported request errors; see errors.jsonl");
            }
            errors
        }
        None => Vec::new(),
    };

    Ok(BatchResults { records, errors })
}

/// Message content of a batch output record.
fn response_content(record: &Value) -> Result<&str, AnnotationError> {
    record
        .pointer("/response/body/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or(AnnotationError::MissingContent)
}

/// Parse model output into a label.
pub fn parse_label(content: &str) -> Result<ContactLabel, AnnotationError> {
    let json = extract_label_json(content)
        .ok_or_else(|| AnnotationError::InvalidLabel("no JSON object in response".to_string()))?;
    serde_json::from_str(json).map_err(|e| AnnotationError::InvalidLabel(e.to_string()))
}

/// One output record after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub annotation: FrameAnnotation,
    /// Why the fallback label was used, if it was.
    pub error: Option<String>,
}

impl ParsedRecord {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Parse one output record.
///
/// Only an unusable `custom_id` is an error; a bad response body yields the
/// fallback label.
pub fn parse_record(record: &Value) -> Result<ParsedRecord, AnnotationError> {
    let custom_id = record
        .get("custom_id")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let (episode_index, frame_index) = parse_custom_id(custom_id)?;

    let (label, error) = match response_content(record).and_then(parse_label) {
        Ok(label) => (label, None),
        Err(e) => {
            tracing::warn!(custom_id, error = %e, "Failed to parse response, using fallback label");
            (ContactLabel::fallback(&e), Some(e.to_string()))
        }
    };

    Ok(ParsedRecord {
        annotation: FrameAnnotation {
            label,
            frame_index,
            episode_index,
        },
        error,
    })
}

/// Annotations keyed by episode then frame, both ascending.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    episodes: BTreeMap<u64, BTreeMap<u64, FrameAnnotation>>,
    records: usize,
    failed: usize,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[Value]) -> Self {
        let mut set = Self::new();
        for record in records {
            set.add_record(record);
        }
        set
    }

    /// Parse and store one output record.
    pub fn add_record(&mut self, record: &Value) {
        self.records += 1;
        match parse_record(record) {
            Ok(parsed) => {
                if parsed.is_fallback() {
                    self.failed += 1;
                }
                self.insert(parsed.annotation);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping record");
                self.failed += 1;
            }
        }
    }

    /// Store an annotation, replacing any earlier one for the same frame.
    pub fn insert(&mut self, annotation: FrameAnnotation) {
        self.episodes
            .entry(annotation.episode_index)
            .or_default()
            .insert(annotation.frame_index, annotation);
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn parsed_ok(&self) -> usize {
        self.records.saturating_sub(self.failed)
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    pub fn frame_count(&self) -> usize {
        self.episodes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn get(&self, episode_index: u64, frame_index: u64) -> Option<&FrameAnnotation> {
        self.episodes.get(&episode_index)?.get(&frame_index)
    }

    /// Frames of every episode in order.
    pub fn frames(&self) -> impl Iterator<Item = &FrameAnnotation> {
        self.episodes.values().flat_map(BTreeMap::values)
    }

    pub fn to_episodes(&self) -> Vec<EpisodeAnnotations> {
        self.episodes
            .iter()
            .map(|(&episode_index, frames)| EpisodeAnnotations {
                episode_index,
                frames: frames.values().cloned().collect(),
            })
            .collect()
    }
}
