//! Request-file loading and the per-record view model.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::ViewerError;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Read a JSONL file, skipping blank lines.
pub fn load_jsonl(path: &Path) -> Result<Vec<Value>, ViewerError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ViewerError::FileNotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| ViewerError::InvalidLine {
                line: i + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// What the viewer page shows for one request record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub custom_id: String,
    pub model: String,
    pub system_text: String,
    pub user_text: String,
    pub image_b64: String,
    pub image_mime: String,
}

impl Default for RecordView {
    fn default() -> Self {
        Self {
            custom_id: String::new(),
            model: String::new(),
            system_text: String::new(),
            user_text: String::new(),
            image_b64: String::new(),
            image_mime: DEFAULT_IMAGE_MIME.to_string(),
        }
    }
}

/// Split `data:<mime>;base64,<payload>` into (mime, payload).
fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let mime = header.split(';').next().unwrap_or_default();
    Some((mime, data))
}

impl RecordView {
    /// Build a view from a batch request record. Missing fields stay empty.
    pub fn from_request(record: &Value) -> Self {
        let str_at = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

        let mut view = Self {
            custom_id: str_at(record, "custom_id"),
            ..Self::default()
        };
        let Some(body) = record.get("body") else {
            return view;
        };
        view.model = str_at(body, "model");

        let messages = body
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for message in messages {
            let content = message.get("content").unwrap_or(&Value::Null);
            match message.get("role").and_then(Value::as_str) {
                Some("system") => {
                    view.system_text = content.as_str().unwrap_or_default().to_string();
                }
                Some("user") => match content {
                    Value::Array(parts) => {
                        for part in parts {
                            match part.get("type").and_then(Value::as_str) {
                                Some("image_url") => {
                                    let url = part
                                        .pointer("/image_url/url")
                                        .and_then(Value::as_str)
                                        .unwrap_or_default();
                                    if let Some((mime, data)) = split_data_url(url) {
                                        if !mime.is_empty() {
                                            view.image_mime = mime.to_string();
                                        }
                                        view.image_b64 = data.to_string();
                                    }
                                }
                                Some("text") => view.user_text = str_at(part, "text"),
                                _ => {}
                            }
                        }
                    }
                    Value::String(text) => view.user_text = text.clone(),
                    Value::Null => {}
                    other => view.user_text = other.to_string(),
                },
                _ => {}
            }
        }
        view
    }
}
