//! Episode frame extraction driver.
//!
//! Walks the episode list, fetches each episode video, samples frames and
//! writes the manifest consumed by the request builder.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde::Serialize;

use super::ffmpeg;
use super::hub::HubClient;
use super::manifest::{EpisodeFrames, FrameRef, Manifest};
use super::meta::{self, EpisodeInfo, TaskMap};
use crate::config::ExtractConfig;
use crate::error::DatasetError;
use crate::progress::{ProgressCounters, ProgressMonitor, DEFAULT_PROGRESS_INTERVAL};

/// Source of dataset files addressed by repository-relative path.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch a file, returning a local path to it.
    async fn fetch(&self, filename: &str) -> Result<PathBuf, DatasetError>;
}

/// A [`DatasetSource`] backed by one HuggingFace dataset repository.
pub struct HubDataset {
    client: HubClient,
    repo_id: String,
}

impl HubDataset {
    pub fn new(client: HubClient, repo_id: impl Into<String>) -> Self {
        Self {
            client,
            repo_id: repo_id.into(),
        }
    }
}

#[async_trait]
impl DatasetSource for HubDataset {
    async fn fetch(&self, filename: &str) -> Result<PathBuf, DatasetError> {
        self.client.download(&self.repo_id, filename).await
    }
}

/// A [`DatasetSource`] reading from an already-downloaded dataset directory.
pub struct LocalDataset {
    root: PathBuf,
}

impl LocalDataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DatasetSource for LocalDataset {
    async fn fetch(&self, filename: &str) -> Result<PathBuf, DatasetError> {
        let path = self.root.join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(DatasetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )))
        }
    }
}

/// Result of an extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    pub episodes: usize,
    pub skipped_episodes: usize,
    pub total_frames: usize,
    pub manifest_path: PathBuf,
}

pub struct FrameExtractor<S: DatasetSource> {
    source: S,
    config: ExtractConfig,
}

impl<S: DatasetSource> FrameExtractor<S> {
    pub fn new(source: S, config: ExtractConfig) -> Result<Self, DatasetError> {
        config.validate()?;
        Ok(Self { source, config })
    }

    pub async fn load_task_map(&self) -> Result<TaskMap, DatasetError> {
        let path = self.source.fetch(meta::TASKS_FILE).await?;
        meta::load_task_map(&path)
    }

    pub async fn load_episodes(&self) -> Result<Vec<EpisodeInfo>, DatasetError> {
        let path = self.source.fetch(meta::EPISODES_FILE).await?;
        meta::load_episodes(&path, self.config.max_episodes)
    }

    /// Fetch and sample one episode.
    async fn extract_episode(
        &self,
        episode: &EpisodeInfo,
        tasks: &TaskMap,
    ) -> Result<EpisodeFrames, DatasetError> {
        let ep = episode.episode_index;
        let video_file = meta::video_path(ep, self.config.chunk_size, &self.config.camera_key);
        let video = self.source.fetch(&video_file).await?;

        let episode_dir = self.config.out_dir.join(meta::episode_dir_name(ep));
        let sampled = ffmpeg::sample_frames(&video, &episode_dir, self.config.frame_step).await?;

        Ok(EpisodeFrames {
            episode_index: ep,
            task_index: episode.task_index(),
            task: episode.resolve_task(tasks),
            frames: sampled
                .into_iter()
                .map(|f| FrameRef {
                    frame_index: f.frame_index,
                    path: f.path,
                })
                .collect(),
        })
    }

    /// Run the full extraction and write the manifest.
    pub async fn run(&self) -> Result<ExtractSummary, DatasetError> {
        std::fs::create_dir_all(&self.config.out_dir)?;

        let tasks = self.load_task_map().await?;
        tracing::info!(repo = %self.config.repo_id, "Loading episode list");
        let episodes = self.load_episodes().await?;
        tracing::info!(
            episodes = episodes.len(),
            tasks = tasks.len(),
            "Episodes to process"
        );

        let counters = ProgressCounters::new();
        let monitor = ProgressMonitor::start(
            "extract",
            counters.clone(),
            episodes.len(),
            DEFAULT_PROGRESS_INTERVAL,
        );

        let mut manifest = Manifest::new();
        let mut skipped = 0usize;
        for episode in &episodes {
            match self.extract_episode(episode, &tasks).await {
                Ok(frames) => {
                    tracing::debug!(
                        episode = episode.episode_index,
                        frames = frames.frames.len(),
                        "Episode sampled"
                    );
                    counters
                        .frames
                        .fetch_add(frames.frames.len(), Ordering::Relaxed);
                    manifest.push(frames);
                }
                Err(e) => {
                    tracing::warn!(episode = episode.episode_index, error = %e, "Skipping episode");
                    skipped += 1;
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
            counters.episodes.fetch_add(1, Ordering::Relaxed);
        }
        monitor.stop().await;

        let manifest_path = self.config.manifest_path();
        manifest.save(&manifest_path)?;

        let summary = ExtractSummary {
            episodes: manifest.episodes.len(),
            skipped_episodes: skipped,
            total_frames: manifest.total_frames(),
            manifest_path,
        };
        tracing::info!(
            episodes = summary.episodes,
            skipped = summary.skipped_episodes,
            frames = summary.total_frames,
            manifest = %summary.manifest_path.display(),
            "Frame extraction finished"
        );
        Ok(summary)
    }
}
