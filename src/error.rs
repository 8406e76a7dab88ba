//! Error types for contact-forge operations.
//!
//! Defines error types for each pipeline stage:
//! - Dataset download and frame extraction
//! - FFmpeg invocation
//! - Strip composition
//! - Batch API interactions
//! - Result parsing
//! - The local request viewer

use thiserror::Error;

/// Errors that can occur while reading the hosted dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to download '{file}' from {repo} ({status}): {message}")]
    DownloadFailed {
        repo: String,
        file: String,
        status: u16,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid metadata line {line} in '{file}': {message}")]
    InvalidMetadata {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame extraction failed: {0}")]
    Ffmpeg(#[from] FfmpegError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while shelling out to ffmpeg.
#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while composing strip images.
#[derive(Debug, Error)]
pub enum StripError {
    #[error("Cannot compose a strip from zero frames")]
    Empty,

    #[error("Failed to open frame '{path}': {message}")]
    Open { path: String, message: String },

    #[error("Invalid strip size {0}: must be an odd number >= 1")]
    InvalidStripSize(usize),

    #[error("Invalid scale {0}: must be in (0, 1]")]
    InvalidScale(f32),

    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors that can occur while talking to the batch inference API.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Missing API key: OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Batch '{id}' is not completed yet (status={status}); wait for it with `contact-forge watch`")]
    NotCompleted { id: String, status: String },

    #[error("Batch '{0}' has no output file; it may have failed entirely")]
    MissingOutput(String),

    #[error("Batch id file not found: {0}; pass --batch-id or run `contact-forge submit` first")]
    IdFileNotFound(String),

    #[error("Request build failed: {0}")]
    Strip(#[from] StripError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while parsing batch results.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Invalid custom_id '{0}': expected ep<episode>_fr<frame>")]
    InvalidCustomId(String),

    #[error("Response content missing at response.body.choices[0].message.content")]
    MissingContent,

    #[error("Label JSON invalid: {0}")]
    InvalidLabel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while serving the request viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("JSONL file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON on line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
