//! Batch input file builder.
//!
//! Emits one request per sampled frame. Each request carries a strip of the
//! frames around it and is keyed on that frame.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use serde::Serialize;

use super::request::AnnotationRequest;
use crate::config::{PrepareConfig, BATCH_INPUT_FILE};
use crate::dataset::{EpisodeFrames, Manifest};
use crate::error::BatchError;
use crate::progress::{ProgressCounters, ProgressMonitor, DEFAULT_PROGRESS_INTERVAL};
use crate::strip::{compose_strip, window_indices};

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub episodes: usize,
    pub frames: usize,
    pub requests: usize,
    pub skipped: usize,
    pub output: PathBuf,
}

pub struct RequestBuilder {
    config: PrepareConfig,
}

impl RequestBuilder {
    pub fn new(config: PrepareConfig) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PrepareConfig {
        &self.config
    }

    /// Write the request records for one episode, returning (written, skipped).
    fn write_episode<W: Write>(
        &self,
        episode: &EpisodeFrames,
        out: &mut W,
    ) -> Result<(usize, usize), BatchError> {
        let frames = &episode.frames;
        let mut written = 0usize;
        let mut skipped = 0usize;

        for (i, frame) in frames.iter().enumerate() {
            let paths: Vec<&Path> = window_indices(i, frames.len(), self.config.strip_size)
                .into_iter()
                .map(|j| frames[j].path.as_path())
                .collect();

            let missing: Vec<&&Path> = paths.iter().filter(|p| !p.exists()).collect();
            if !missing.is_empty() {
                for p in missing {
                    tracing::warn!(
                        episode = episode.episode_index,
                        path = %p.display(),
                        "Missing frame, skipping window"
                    );
                }
                skipped += 1;
                continue;
            }

            let strip = compose_strip(&paths, self.config.scale)?;
            let request = AnnotationRequest {
                episode_index: episode.episode_index,
                center_frame_index: frame.frame_index,
                task: &episode.task,
                model: &self.config.model,
                strip_size: self.config.strip_size,
                temperature: self.config.temperature,
            }
            .into_batch_request(&strip);

            serde_json::to_writer(&mut *out, &request)?;
            out.write_all(b"\n")?;
            written += 1;
        }

        Ok((written, skipped))
    }

    /// Build `<out_dir>/batch_input.jsonl` from the manifest.
    pub async fn build(&self, manifest: &Manifest, out_dir: &Path) -> Result<BuildSummary, BatchError> {
        std::fs::create_dir_all(out_dir)?;
        let output = out_dir.join(BATCH_INPUT_FILE);

        tracing::info!(
            episodes = manifest.episodes.len(),
            frames = manifest.total_frames(),
            strip_size = self.config.strip_size,
            scale = ?self.config.scale,
            output = %output.display(),
            "Building batch requests"
        );

        let counters = ProgressCounters::new();
        let monitor = ProgressMonitor::start(
            "prepare",
            counters.clone(),
            manifest.episodes.len(),
            DEFAULT_PROGRESS_INTERVAL,
        );

        let mut writer = BufWriter::new(std::fs::File::create(&output)?);
        let mut requests = 0usize;
        let mut skipped = 0usize;
        for episode in &manifest.episodes {
            let (w, s) = self.write_episode(episode, &mut writer)?;
            requests += w;
            skipped += s;
            counters.requests.fetch_add(w, Ordering::Relaxed);
            counters.skipped.fetch_add(s, Ordering::Relaxed);
            counters.episodes.fetch_add(1, Ordering::Relaxed);
            tokio::task::yield_now().await;
        }
        writer.flush()?;
        monitor.stop().await;

        let summary = BuildSummary {
            episodes: manifest.episodes.len(),
            frames: manifest.total_frames(),
            requests,
            skipped,
            output,
        };
        tracing::info!(
            requests = summary.requests,
            skipped = summary.skipped,
            output = %summary.output.display(),
            "Batch requests written"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::request::{parse_custom_id, BatchRequest};
    use crate::dataset::FrameRef;
    use image::{Rgb, RgbImage};

    fn episode_with_frames(dir: &Path, episode_index: u64, count: u64) -> EpisodeFrames {
        let frames = (0..count)
            .map(|k| {
                let path = dir.join(format!("ep{}_frame_{:06}.png", episode_index, k * 10));
                RgbImage::from_pixel(4, 3, Rgb([k as u8 * 20, 0, 0]))
                    .save(&path)
                    .expect("save");
                FrameRef {
                    frame_index: k * 10,
                    path,
                }
            })
            .collect();
        EpisodeFrames {
            episode_index,
            task_index: 0,
            task: "pick the cube".to_string(),
            frames,
        }
    }

    #[tokio::test]
    async fn test_build_writes_one_request_per_frame() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = Manifest {
            episodes: vec![episode_with_frames(dir.path(), 0, 3), episode_with_frames(dir.path(), 4, 2)],
        };
        let out = dir.path().join("batch");
        let builder = RequestBuilder::new(PrepareConfig::new("gpt-5-mini")).expect("builder");
        let summary = builder.build(&manifest, &out).await.expect("build");

        assert_eq!(summary.requests, 5);
        assert_eq!(summary.skipped, 0);

        let content = std::fs::read_to_string(&summary.output).expect("read");
        let ids: Vec<(u64, u64)> = content
            .lines()
            .map(|l| {
                let req: BatchRequest = serde_json::from_str(l).expect("request line");
                parse_custom_id(&req.custom_id).expect("custom id")
            })
            .collect();
        assert_eq!(ids, vec![(0, 0), (0, 10), (0, 20), (4, 0), (4, 10)]);
    }

    #[tokio::test]
    async fn test_build_skips_windows_with_missing_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut episode = episode_with_frames(dir.path(), 1, 4);
        std::fs::remove_file(&episode.frames[3].path).expect("remove");
        episode.task = "stack".to_string();
        let manifest = Manifest {
            episodes: vec![episode],
        };

        let builder = RequestBuilder::new(PrepareConfig::default()).expect("builder");
        let summary = builder
            .build(&manifest, &dir.path().join("out"))
            .await
            .expect("build");

        // windows centred on frames 2 and 3 include the removed frame
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_builder_rejects_even_strip() {
        let result = RequestBuilder::new(PrepareConfig::default().with_strip_size(2));
        assert!(matches!(result, Err(BatchError::Strip(_))));
    }
}
