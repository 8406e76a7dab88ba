//! Contact labels as returned by the vision model.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame contact label. `None` means the model could not tell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactLabel {
    pub left_hand_contact: Option<bool>,
    pub right_hand_contact: Option<bool>,
    pub contact_object: Option<String>,
    pub confidence: Confidence,
    pub reason: String,
}

impl ContactLabel {
    /// Label recorded when a response could not be parsed.
    pub fn fallback(error: impl fmt::Display) -> Self {
        Self {
            left_hand_contact: None,
            right_hand_contact: None,
            contact_object: None,
            confidence: Confidence::Low,
            reason: format!("parse error: {}", error),
        }
    }
}

/// A label attached to its frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnnotation {
    #[serde(flatten)]
    pub label: ContactLabel,
    pub frame_index: u64,
    pub episode_index: u64,
}

/// All annotations of one episode, ordered by frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeAnnotations {
    pub episode_index: u64,
    pub frames: Vec<FrameAnnotation>,
}
