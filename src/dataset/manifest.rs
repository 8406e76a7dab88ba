//! Frame manifest shared between the extract and prepare stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameRef {
    pub frame_index: u64,
    pub path: PathBuf,
}

/// Sampled frames of one episode, ordered by frame index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeFrames {
    pub episode_index: u64,
    pub task_index: u64,
    pub task: String,
    pub frames: Vec<FrameRef>,
}

/// The `episodes_meta.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Manifest {
    pub episodes: Vec<EpisodeFrames>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, episode: EpisodeFrames) {
        self.episodes.push(episode);
    }

    pub fn total_frames(&self) -> usize {
        self.episodes.iter().map(|e| e.frames.len()).sum()
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::ManifestNotFound(
                path.display().to_string(),
            ));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            episodes: vec![EpisodeFrames {
                episode_index: 3,
                task_index: 0,
                task: "pick".to_string(),
                frames: vec![
                    FrameRef {
                        frame_index: 0,
                        path: PathBuf::from("frames/episode_000003/frame_000000.jpg"),
                    },
                    FrameRef {
                        frame_index: 10,
                        path: PathBuf::from("frames/episode_000003/frame_000010.jpg"),
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_manifest_is_plain_array() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert!(json.is_array());
        assert_eq!(json[0]["episode_index"], 3);
        assert_eq!(
            json[0]["frames"][1]["path"],
            "frames/episode_000003/frame_000010.jpg"
        );
    }

    #[test]
    fn test_manifest_save_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("episodes_meta.json");
        let manifest = sample();
        manifest.save(&path).expect("save");
        let loaded = Manifest::load(&path).expect("load");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.total_frames(), 2);
    }

    #[test]
    fn test_manifest_missing() {
        let result = Manifest::load(Path::new("/nonexistent/episodes_meta.json"));
        assert!(matches!(result, Err(DatasetError::ManifestNotFound(_))));
    }
}
