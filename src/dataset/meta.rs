//! LeRobot dataset metadata: episode list, task map, and video layout.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::DatasetError;

pub const EPISODES_FILE: &str = "meta/episodes.jsonl";
pub const TASKS_FILE: &str = "meta/tasks.jsonl";

/// Fallback task description when neither the task map nor the episode
/// carries one.
pub const UNKNOWN_TASK: &str = "unknown task";

/// One line of `meta/episodes.jsonl`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EpisodeInfo {
    pub episode_index: u64,
    #[serde(default)]
    pub task_index: Option<u64>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub length: Option<u64>,
}

impl EpisodeInfo {
    pub fn task_index(&self) -> u64 {
        self.task_index.unwrap_or(0)
    }

    /// Resolve the task description for this episode.
    pub fn resolve_task(&self, tasks: &TaskMap) -> String {
        tasks
            .get(self.task_index())
            .map(str::to_string)
            .or_else(|| self.tasks.first().cloned())
            .unwrap_or_else(|| UNKNOWN_TASK.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TaskLine {
    task_index: u64,
    task: String,
}

/// `task_index -> task` lookup built from `meta/tasks.jsonl`.
#[derive(Debug, Clone, Default)]
pub struct TaskMap(HashMap<u64, String>);

impl TaskMap {
    pub fn get(&self, index: u64) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_jsonl<T: for<'de> Deserialize<'de>>(
    content: &str,
    file: &str,
) -> Result<Vec<T>, DatasetError> {
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str(line).map_err(|e| DatasetError::InvalidMetadata {
            file: file.to_string(),
            line: i + 1,
            message: e.to_string(),
        })?;
        out.push(value);
    }
    Ok(out)
}

/// Parse the episode list, keeping at most `max_episodes` entries in file order.
pub fn parse_episodes(
    content: &str,
    max_episodes: Option<usize>,
) -> Result<Vec<EpisodeInfo>, DatasetError> {
    let mut episodes: Vec<EpisodeInfo> = parse_jsonl(content, EPISODES_FILE)?;
    if let Some(max) = max_episodes {
        episodes.truncate(max);
    }
    Ok(episodes)
}

pub fn parse_task_map(content: &str) -> Result<TaskMap, DatasetError> {
    let lines: Vec<TaskLine> = parse_jsonl(content, TASKS_FILE)?;
    Ok(TaskMap(
        lines.into_iter().map(|l| (l.task_index, l.task)).collect(),
    ))
}

pub fn load_episodes(
    path: &Path,
    max_episodes: Option<usize>,
) -> Result<Vec<EpisodeInfo>, DatasetError> {
    let content = std::fs::read_to_string(path)?;
    parse_episodes(&content, max_episodes)
}

pub fn load_task_map(path: &Path) -> Result<TaskMap, DatasetError> {
    let content = std::fs::read_to_string(path)?;
    parse_task_map(&content)
}

pub fn episode_chunk(episode_index: u64, chunk_size: u64) -> u64 {
    episode_index / chunk_size
}

/// Repository-relative path of an episode video.
pub fn video_path(episode_index: u64, chunk_size: u64, camera_key: &str) -> String {
    format!(
        "videos/chunk-{:03}/{}/episode_{:06}.mp4",
        episode_chunk(episode_index, chunk_size),
        camera_key,
        episode_index
    )
}

pub fn episode_dir_name(episode_index: u64) -> String {
    format!("episode_{:06}", episode_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_episodes_truncates() {
        let content = r#"{"episode_index": 0, "tasks": ["pick the cup"], "length": 300}
{"episode_index": 1, "task_index": 2}

{"episode_index": 2}
"#;
        let all = parse_episodes(content, None).expect("parse");
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].task_index(), 2);
        assert_eq!(all[2].task_index(), 0);

        let first = parse_episodes(content, Some(1)).expect("parse");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].length, Some(300));
    }

    #[test]
    fn test_parse_episodes_reports_line() {
        let content = "{\"episode_index\": 0}\nnot json\n";
        match parse_episodes(content, None) {
            Err(DatasetError::InvalidMetadata { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_task_fallbacks() {
        let map = parse_task_map(r#"{"task_index": 0, "task": "Pick and place the apple"}"#)
            .expect("tasks");
        assert_eq!(map.len(), 1);

        let mapped = EpisodeInfo {
            episode_index: 0,
            task_index: None,
            tasks: vec![],
            length: None,
        };
        assert_eq!(mapped.resolve_task(&map), "Pick and place the apple");

        let own = EpisodeInfo {
            episode_index: 1,
            task_index: Some(7),
            tasks: vec!["stack blocks".to_string()],
            length: None,
        };
        assert_eq!(own.resolve_task(&map), "stack blocks");

        let none = EpisodeInfo {
            episode_index: 2,
            task_index: Some(7),
            tasks: vec![],
            length: None,
        };
        assert_eq!(none.resolve_task(&map), UNKNOWN_TASK);
    }

    #[test]
    fn test_video_path_layout() {
        assert_eq!(
            video_path(42, 1000, "observation.images.cam_third"),
            "videos/chunk-000/observation.images.cam_third/episode_000042.mp4"
        );
        assert_eq!(
            video_path(1234, 1000, "cam"),
            "videos/chunk-001/cam/episode_001234.mp4"
        );
        assert_eq!(episode_chunk(999, 1000), 0);
        assert_eq!(episode_dir_name(7), "episode_000007");
    }
}
