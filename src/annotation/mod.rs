//! Result parsing: turn a finished batch into per-frame contact labels.

pub mod extract;
pub mod label;
pub mod parser;
pub mod writer;

use std::path::PathBuf;

use serde::Serialize;

pub use label::{Confidence, ContactLabel, EpisodeAnnotations, FrameAnnotation};
pub use parser::{parse_label, parse_record, retrieve_results, AnnotationSet, BatchResults, ParsedRecord};
pub use writer::{write_outputs, OutputFiles};

use crate::batch::BatchApi;
use crate::config::ProcessConfig;

/// Outcome of processing one batch.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    pub batch_id: String,
    pub records: usize,
    pub parsed_ok: usize,
    pub failed: usize,
    pub batch_errors: usize,
    pub episodes: usize,
    pub combined: PathBuf,
    pub summary_csv: PathBuf,
}

/// Download a completed batch's results and write the annotation files.
pub async fn process_batch(
    api: &dyn BatchApi,
    batch_id: &str,
    config: &ProcessConfig,
) -> anyhow::Result<ProcessSummary> {
    let results = retrieve_results(api, batch_id).await?;
    tracing::info!(records = results.records.len(), "Downloaded batch output");

    let set = AnnotationSet::from_records(&results.records);
    let files = write_outputs(&set, &results.errors, &config.out_dir)?;

    let summary = ProcessSummary {
        batch_id: batch_id.to_string(),
        records: set.records(),
        parsed_ok: set.parsed_ok(),
        failed: set.failed(),
        batch_errors: results.errors.len(),
        episodes: set.episode_count(),
        combined: files.combined,
        summary_csv: files.summary_csv,
    };
    tracing::info!(
        parsed_ok = summary.parsed_ok,
        failed = summary.failed,
        episodes = summary.episodes,
        "Annotations written"
    );
    Ok(summary)
}
