//! Batch request records and the custom-id convention.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::prompts;
use crate::error::AnnotationError;
use crate::strip::StripImage;

/// Endpoint every request record targets.
pub const CHAT_COMPLETIONS_ENDPOINT: &str = "/v1/chat/completions";

/// Request id keyed on the annotated (middle) frame.
pub fn format_custom_id(episode_index: u64, frame_index: u64) -> String {
    format!("ep{:06}_fr{:06}", episode_index, frame_index)
}

/// Inverse of [`format_custom_id`].
pub fn parse_custom_id(custom_id: &str) -> Result<(u64, u64), AnnotationError> {
    let invalid = || AnnotationError::InvalidCustomId(custom_id.to_string());
    let (ep, fr) = custom_id.split_once('_').ok_or_else(invalid)?;
    let ep = ep.strip_prefix("ep").ok_or_else(invalid)?;
    let fr = fr.strip_prefix("fr").ok_or_else(invalid)?;
    if ep.is_empty() || fr.is_empty() {
        return Err(invalid());
    }
    let ep = ep.parse::<u64>().map_err(|_| invalid())?;
    let fr = fr.parse::<u64>().map_err(|_| invalid())?;
    Ok((ep, fr))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub response_format: Value,
}

/// One line of the batch input file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchRequest {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: RequestBody,
}

/// Inputs for one contact-annotation request.
#[derive(Debug, Clone)]
pub struct AnnotationRequest<'a> {
    pub episode_index: u64,
    pub center_frame_index: u64,
    pub task: &'a str,
    pub model: &'a str,
    pub strip_size: usize,
    pub temperature: Option<f64>,
}

impl AnnotationRequest<'_> {
    pub fn into_batch_request(self, strip: &StripImage) -> BatchRequest {
        let middle = crate::strip::middle_label(self.strip_size);
        BatchRequest {
            custom_id: format_custom_id(self.episode_index, self.center_frame_index),
            method: "POST".to_string(),
            url: CHAT_COMPLETIONS_ENDPOINT.to_string(),
            body: RequestBody {
                model: self.model.to_string(),
                messages: vec![
                    ChatMessage::system(prompts::system_message(self.strip_size)),
                    ChatMessage::user_parts(vec![
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: strip.to_data_url(),
                                detail: "high".to_string(),
                            },
                        },
                        ContentPart::Text {
                            text: prompts::user_message(self.task, self.strip_size, middle),
                        },
                    ]),
                ],
                temperature: self.temperature,
                response_format: prompts::response_format(),
            },
        }
    }
}
