//! contact-forge: robot hand-object contact annotation pipeline.
//!
//! Samples frames from a LeRobot-format video dataset, composes them into
//! strip images, labels each sampled frame through a hosted batch inference
//! API and collects the labels into per-episode JSON and CSV files.

pub mod annotation;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod progress;
pub mod strip;
pub mod viewer;

// Re-export commonly used error types
pub use error::{AnnotationError, BatchError, DatasetError, FfmpegError, StripError, ViewerError};
