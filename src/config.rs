//! Stage configuration for the annotation pipeline.
//!
//! Each pipeline stage has a small config struct with defaults matching the
//! CLI and builder-style setters. `validate()` rejects values the stage
//! cannot work with before any I/O happens.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, StripError};

/// Default HuggingFace dataset to annotate.
pub const DEFAULT_REPO_ID: &str = "eunjuri/pick_and_place";

/// Default camera stream (third-person view).
pub const DEFAULT_CAMERA_KEY: &str = "observation.images.cam_third";

/// Episodes per `videos/chunk-NNN` directory in LeRobot datasets.
pub const DEFAULT_CHUNK_SIZE: u64 = 1000;

/// Default model used for batch requests.
pub const DEFAULT_MODEL: &str = "gpt-5-mini";

/// Default HuggingFace Hub endpoint.
pub const DEFAULT_HF_ENDPOINT: &str = "https://huggingface.co";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_FRAMES_DIR: &str = "frames";
pub const DEFAULT_BATCH_DIR: &str = "batch";
pub const DEFAULT_ANNOTATIONS_DIR: &str = "annotations";

pub const MANIFEST_FILE: &str = "episodes_meta.json";
pub const BATCH_INPUT_FILE: &str = "batch_input.jsonl";
pub const BATCH_ID_FILE: &str = "batch_id.txt";

/// Configuration for the frame extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// HuggingFace dataset repository id.
    pub repo_id: String,
    /// Camera key used in the video path.
    pub camera_key: String,
    /// Output directory for frames and the manifest.
    pub out_dir: PathBuf,
    /// Keep one frame every `frame_step` decoded frames.
    pub frame_step: u64,
    /// Process at most this many episodes.
    pub max_episodes: Option<usize>,
    /// Episodes per chunk directory.
    pub chunk_size: u64,
}

impl ExtractConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_id: DEFAULT_REPO_ID.to_string(),
            camera_key: DEFAULT_CAMERA_KEY.to_string(),
            out_dir: out_dir.into(),
            frame_step: 10,
            max_episodes: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_repo(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = repo_id.into();
        self
    }

    pub fn with_camera_key(mut self, key: impl Into<String>) -> Self {
        self.camera_key = key.into();
        self
    }

    pub fn with_frame_step(mut self, step: u64) -> Self {
        self.frame_step = step;
        self
    }

    pub fn with_max_episodes(mut self, max: Option<usize>) -> Self {
        self.max_episodes = max;
        self
    }

    pub fn with_chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = size;
        self
    }

    /// Path of the manifest written by this stage.
    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(MANIFEST_FILE)
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.frame_step == 0 {
            return Err(DatasetError::InvalidConfig(
                "frame_step must be >= 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(DatasetError::InvalidConfig(
                "chunk_size must be >= 1".to_string(),
            ));
        }
        if self.repo_id.trim().is_empty() {
            return Err(DatasetError::InvalidConfig(
                "repo_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRAMES_DIR)
    }
}

/// Configuration for building the batch request file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub model: String,
    /// Number of consecutive frames per strip (odd).
    pub strip_size: usize,
    /// Optional per-frame downscale ratio in (0, 1].
    pub scale: Option<f32>,
    /// Sampling temperature; omitted from requests when unset.
    pub temperature: Option<f64>,
}

impl PrepareConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            strip_size: 3,
            scale: None,
            temperature: None,
        }
    }

    pub fn with_strip_size(mut self, size: usize) -> Self {
        self.strip_size = size;
        self
    }

    pub fn with_scale(mut self, scale: Option<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn validate(&self) -> Result<(), StripError> {
        if self.strip_size == 0 || self.strip_size % 2 == 0 {
            return Err(StripError::InvalidStripSize(self.strip_size));
        }
        if let Some(scale) = self.scale {
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(StripError::InvalidScale(scale));
            }
        }
        Ok(())
    }
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

/// Configuration for the batch status monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay between status checks.
    pub interval: Duration,
    /// Maximum number of polls; `None` polls until a terminal status.
    pub max_polls: Option<u32>,
}

impl WatchConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_polls: None,
        }
    }

    /// Map the CLI `--repeat` convention (-1 or 0 means forever).
    pub fn with_repeat(mut self, repeat: i64) -> Self {
        self.max_polls = if repeat > 0 {
            Some(u32::try_from(repeat).unwrap_or(u32::MAX))
        } else {
            None
        };
        self
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Configuration for result processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub out_dir: PathBuf,
}

impl ProcessConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ANNOTATIONS_DIR)
    }
}
