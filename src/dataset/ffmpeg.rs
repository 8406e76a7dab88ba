//! Frame sampling through the ffmpeg CLI.
//!
//! ffmpeg keeps every `frame_step`-th decoded frame via a `select` filter and
//! writes them with sequential numbers into a scratch directory. Sequence
//! number `k` maps back to decode index `k * frame_step`.

use std::path::{Path, PathBuf};

use crate::error::FfmpegError;

/// JPEG quality scale for `-q:v` (2 is near-lossless).
const JPEG_QSCALE: &str = "2";

const SCRATCH_PATTERN: &str = "sample_%06d.jpg";

/// A sampled frame on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledFrame {
    pub frame_index: u64,
    pub path: PathBuf,
}

pub fn frame_file_name(frame_index: u64) -> String {
    format!("frame_{:06}.jpg", frame_index)
}

/// Build the ffmpeg argument list for sampling.
pub fn sample_args(video: &Path, scratch_dir: &Path, frame_step: u64) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-vf".to_string(),
        format!("select=not(mod(n\\,{}))", frame_step),
        "-vsync".to_string(),
        "vfr".to_string(),
        "-q:v".to_string(),
        JPEG_QSCALE.to_string(),
        "-start_number".to_string(),
        "0".to_string(),
        scratch_dir.join(SCRATCH_PATTERN).to_string_lossy().to_string(),
    ]
}

/// Parse the sequence number out of a scratch file name.
fn scratch_sequence(name: &str) -> Option<u64> {
    name.strip_prefix("sample_")?
        .strip_suffix(".jpg")?
        .parse()
        .ok()
}

/// Move scratch outputs into `episode_dir` under their decode index.
///
/// Existing frame files are kept untouched so re-runs do not rewrite them.
pub fn collect_samples(
    scratch_dir: &Path,
    episode_dir: &Path,
    frame_step: u64,
) -> Result<Vec<SampledFrame>, FfmpegError> {
    let mut sequences = Vec::new();
    for entry in std::fs::read_dir(scratch_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(seq) = scratch_sequence(&name) {
            sequences.push((seq, entry.path()));
        }
    }
    sequences.sort_by_key(|(seq, _)| *seq);

    let mut frames = Vec::with_capacity(sequences.len());
    for (seq, scratch_path) in sequences {
        let frame_index = seq * frame_step;
        let target = episode_dir.join(frame_file_name(frame_index));
        if !target.exists() {
            std::fs::rename(&scratch_path, &target)?;
        }
        frames.push(SampledFrame {
            frame_index,
            path: target,
        });
    }
    Ok(frames)
}

/// Decode `video` and keep every `frame_step`-th frame as a JPEG in `episode_dir`.
pub async fn sample_frames(
    video: &Path,
    episode_dir: &Path,
    frame_step: u64,
) -> Result<Vec<SampledFrame>, FfmpegError> {
    if !video.exists() {
        return Err(FfmpegError::VideoNotFound(
            video.to_string_lossy().to_string(),
        ));
    }

    tokio::fs::create_dir_all(episode_dir).await?;
    let scratch = tempfile::Builder::new()
        .prefix(".sampling-")
        .tempdir_in(episode_dir)?;

    let output = tokio::process::Command::new("ffmpeg")
        .args(sample_args(video, scratch.path(), frame_step))
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    collect_samples(scratch.path(), episode_dir, frame_step)
}
