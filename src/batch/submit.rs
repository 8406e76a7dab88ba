//! Batch submission: upload the request file, create the batch, record its id.

use std::path::{Path, PathBuf};

use super::client::BatchApi;
use super::monitor::{console_url, write_batch_id};
use super::status::{Batch, FileObject};
use crate::error::BatchError;

#[derive(Debug, Clone)]
pub struct Submission {
    pub file: FileObject,
    pub batch: Batch,
    /// Where the batch id was written.
    pub id_path: PathBuf,
}

/// Upload `input` and create a batch over it.
///
/// The new batch id is written to `batch_id.txt` in `id_dir` so later
/// `watch` and `process` runs can find it.
pub async fn submit_batch(
    api: &dyn BatchApi,
    input: &Path,
    id_dir: &Path,
) -> Result<Submission, BatchError> {
    if !input.is_file() {
        return Err(BatchError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "batch input {} not found; run `contact-forge prepare` first",
                input.display()
            ),
        )));
    }

    let file = api.upload_file(input).await?;
    tracing::info!(file_id = %file.id, "Uploaded batch input file");

    let batch = api.create_batch(&file.id).await?;
    tracing::info!(
        batch_id = %batch.id,
        status = %batch.status,
        console = %console_url(&batch.id),
        "Batch created"
    );

    let id_path = write_batch_id(id_dir, &batch.id)?;
    tracing::info!(path = %id_path.display(), "Saved batch id");

    Ok(Submission {
        file,
        batch,
        id_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::monitor::read_batch_id;
    use crate::batch::status::BatchStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        uploaded: Mutex<Vec<PathBuf>>,
        created_from: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BatchApi for RecordingApi {
        async fn upload_file(&self, path: &Path) -> Result<FileObject, BatchError> {
            self.uploaded.lock().expect("lock").push(path.to_path_buf());
            Ok(FileObject {
                id: "file-123".to_string(),
                bytes: None,
                filename: None,
                purpose: Some("batch".to_string()),
            })
        }

        async fn create_batch(&self, input_file_id: &str) -> Result<Batch, BatchError> {
            self.created_from
                .lock()
                .expect("lock")
                .push(input_file_id.to_string());
            Ok(serde_json::from_value(serde_json::json!({
                "id": "batch_456",
                "status": "validating",
                "input_file_id": input_file_id
            }))?)
        }

        async fn retrieve_batch(&self, _batch_id: &str) -> Result<Batch, BatchError> {
            unreachable!("not used by submit")
        }

        async fn file_content(&self, _file_id: &str) -> Result<String, BatchError> {
            unreachable!("not used by submit")
        }
    }

    #[tokio::test]
    async fn test_submit_uploads_creates_and_saves_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("batch_input.jsonl");
        std::fs::write(&input, "{}\n").expect("write");

        let api = RecordingApi::default();
        let submission = submit_batch(&api, &input, dir.path()).await.expect("submit");

        assert_eq!(submission.batch.id, "batch_456");
        assert_eq!(submission.batch.status, BatchStatus::Validating);
        assert_eq!(*api.uploaded.lock().expect("lock"), vec![input]);
        assert_eq!(*api.created_from.lock().expect("lock"), vec!["file-123".to_string()]);
        assert_eq!(read_batch_id(&submission.id_path).expect("id"), "batch_456");
    }

    #[tokio::test]
    async fn test_submit_missing_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = RecordingApi::default();
        let result = submit_batch(&api, &dir.path().join("missing.jsonl"), dir.path()).await;
        assert!(matches!(result, Err(BatchError::Io(_))));
        assert!(api.uploaded.lock().expect("lock").is_empty());
    }
}
