//! Dataset access and frame extraction.
//!
//! Downloads LeRobot-format episode videos from the HuggingFace Hub, samples
//! frames at a fixed step with ffmpeg, and records them in a manifest.

pub mod extractor;
pub mod ffmpeg;
pub mod hub;
pub mod manifest;
pub mod meta;

pub use extractor::{DatasetSource, ExtractSummary, FrameExtractor, HubDataset, LocalDataset};
pub use hub::{HubClient, HubConfig};
pub use manifest::{EpisodeFrames, FrameRef, Manifest};
pub use meta::{EpisodeInfo, TaskMap};
