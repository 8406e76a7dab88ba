//! Annotation artifacts: per-episode JSON, the combined JSON, a summary CSV
//! and the batch error log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use super::label::FrameAnnotation;
use super::parser::AnnotationSet;
use crate::error::AnnotationError;

pub const COMBINED_FILE: &str = "episodes_contact.json";
pub const SUMMARY_CSV_FILE: &str = "summary.csv";
pub const ERRORS_FILE: &str = "errors.jsonl";

const CSV_COLUMNS: [&str; 7] = [
    "episode_index",
    "frame_index",
    "left_hand_contact",
    "right_hand_contact",
    "contact_object",
    "confidence",
    "reason",
];

pub fn episode_file_name(episode_index: u64) -> String {
    format!("episode_{:06}_contact.json", episode_index)
}

/// Paths written by [`write_outputs`].
#[derive(Debug, Clone, Serialize)]
pub struct OutputFiles {
    pub episode_files: Vec<PathBuf>,
    pub combined: PathBuf,
    pub summary_csv: PathBuf,
    pub errors: Option<PathBuf>,
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Row terminator, matching Python's `csv` module default.
const CSV_LINE_END: &str = "\r\n";

fn csv_opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// `True`/`False`, or an empty cell when unknown.
fn csv_bool(value: Option<bool>) -> String {
    match value {
        Some(true) => "True".to_string(),
        Some(false) => "False".to_string(),
        None => String::new(),
    }
}

fn csv_row(annotation: &FrameAnnotation) -> String {
    let label = &annotation.label;
    [
        annotation.episode_index.to_string(),
        annotation.frame_index.to_string(),
        csv_bool(label.left_hand_contact),
        csv_bool(label.right_hand_contact),
        csv_opt(&label.contact_object),
        label.confidence.to_string(),
        label.reason.clone(),
    ]
    .iter()
    .map(|v| csv_escape(v))
    .collect::<Vec<_>>()
    .join(",")
}

fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AnnotationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn write_summary_csv(set: &AnnotationSet, path: &Path) -> Result<(), AnnotationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write!(writer, "{}{}", CSV_COLUMNS.join(","), CSV_LINE_END)?;
    for annotation in set.frames() {
        write!(writer, "{}{}", csv_row(annotation), CSV_LINE_END)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_errors(errors: &[Value], path: &Path) -> Result<(), AnnotationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for error in errors {
        serde_json::to_writer(&mut writer, error)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every artifact into `out_dir`.
///
/// `errors.jsonl` is only written when `errors` is non-empty.
pub fn write_outputs(
    set: &AnnotationSet,
    errors: &[Value],
    out_dir: &Path,
) -> Result<OutputFiles, AnnotationError> {
    std::fs::create_dir_all(out_dir)?;

    let errors_path = if errors.is_empty() {
        None
    } else {
        let path = out_dir.join(ERRORS_FILE);
        write_errors(errors, &path)?;
        Some(path)
    };

    let episodes = set.to_episodes();
    let mut episode_files = Vec::with_capacity(episodes.len());
    for episode in &episodes {
        let path = out_dir.join(episode_file_name(episode.episode_index));
        write_json_pretty(&path, episode)?;
        episode_files.push(path);
    }

    let combined = out_dir.join(COMBINED_FILE);
    write_json_pretty(&combined, &episodes)?;

    let summary_csv = out_dir.join(SUMMARY_CSV_FILE);
    write_summary_csv(set, &summary_csv)?;

    tracing::debug!(
        episodes = episode_files.len(),
        out_dir = %out_dir.display(),
        "Annotation files written"
    );

    Ok(OutputFiles {
        episode_files,
        combined,
        summary_csv,
        errors: errors_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::label::{Confidence, ContactLabel, EpisodeAnnotations};
    use serde_json::json;

    fn annotation(ep: u64, fr: u64, reason: &str) -> FrameAnnotation {
        FrameAnnotation {
            label: ContactLabel {
                left_hand_contact: Some(true),
                right_hand_contact: None,
                contact_object: Some("cube".to_string()),
                confidence: Confidence::High,
                reason: reason.to_string(),
            },
            frame_index: fr,
            episode_index: ep,
        }
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a, b"), "\"a, b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_row_nulls_are_empty() {
        let row = csv_row(&annotation(1, 20, "left, clearly"));
        assert_eq!(row, "1,20,True,,cube,high,\"left, clearly\"");
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut set = AnnotationSet::new();
        set.insert(annotation(5, 10, "b"));
        set.insert(annotation(5, 0, "a"));
        set.insert(annotation(2, 0, "c"));

        let files = write_outputs(&set, &[], dir.path()).expect("write");
        assert_eq!(files.episode_files.len(), 2);
        assert!(files.errors.is_none());
        assert!(!dir.path().join(ERRORS_FILE).exists());

        let ep5: EpisodeAnnotations = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("episode_000005_contact.json")).expect("read"),
        )
        .expect("episode json");
        assert_eq!(ep5.episode_index, 5);
        let frames: Vec<u64> = ep5.frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(frames, vec![0, 10]);

        let combined: Vec<EpisodeAnnotations> =
            serde_json::from_str(&std::fs::read_to_string(&files.combined).expect("read"))
                .expect("combined json");
        assert_eq!(
            combined.iter().map(|e| e.episode_index).collect::<Vec<_>>(),
            vec![2, 5]
        );

        let csv = std::fs::read_to_string(&files.summary_csv).expect("read");
        assert!(csv.ends_with("\r\n"));
        assert_eq!(csv.matches("\r\n").count(), csv.matches('\n').count());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2,0,"));
        assert!(lines[3].starts_with("5,10,"));
    }

    #[test]
    fn test_errors_file_written_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let errors = vec![json!({"custom_id": "ep000000_fr000000", "error": {"code": "x"}})];
        let files = write_outputs(&AnnotationSet::new(), &errors, dir.path()).expect("write");
        let path = files.errors.expect("errors path");
        let content = std::fs::read_to_string(path).expect("read");
        assert_eq!(content.lines().count(), 1);
    }
}
