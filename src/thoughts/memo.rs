use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One memoized thought, stored as a JSON line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoEntry {
    pub episode_id: String,
    pub step_index: usize,
    pub thought: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only memo of generated thoughts keyed by `(episode_id, step_index)`.
pub struct ThoughtMemo {
    index: DashMap<(String, usize), String>,
    file: Option<Mutex<File>>,
}

impl ThoughtMemo {
    pub fn in_memory() -> Self {
        Self {
            index: DashMap::new(),
            file: None,
        }
    }

    /// Load existing entries from `path` and append new ones to it.
    /// Unparseable lines (for instance a torn final line) are ignored.
    pub async fn open(path: &Path) -> io::Result<Self> {
        let index = DashMap::new();
        let mut torn_tail = false;
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                torn_tail = !contents.is_empty() && !contents.ends_with('\n');
                for (number, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<MemoEntry>(line) {
                        Ok(entry) => {
                            index.insert((entry.episode_id, entry.step_index), entry.thought);
                        }
                        Err(err) => warn!(line = number + 1, error = %err, "ignoring memo line"),
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        if torn_tail {
            file.write_all(b"\n").await?;
        }
        info!(path = %path.display(), entries = index.len(), "thought memo opened");
        Ok(Self {
            index,
            file: Some(Mutex::new(file)),
        })
    }

    pub fn get(&self, episode_id: &str, step_index: usize) -> Option<String> {
        self.index
            .get(&(episode_id.to_string(), step_index))
            .map(|entry| entry.value().clone())
    }

    /// Persist a thought, then make it visible to lookups.
    pub async fn record(&self, episode_id: &str, step_index: usize, thought: &str) -> io::Result<()> {
        if let Some(file) = self.file.as_ref() {
            let entry = MemoEntry {
                episode_id: episode_id.to_string(),
                step_index,
                thought: thought.to_string(),
                created_at: Utc::now(),
            };
            let mut line = serde_json::to_string(&entry).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            line.push('\n');
            let mut file = file.lock().await;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
        }
        self.index
            .insert((episode_id.to_string(), step_index), thought.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo/thoughts.jsonl");
        {
            let memo = ThoughtMemo::open(&path).await.unwrap();
            memo.record("ep-1", 3, "I should open the menu.").await.unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, format!("{contents}{{\"episode_id\": \"torn")).unwrap();

        let memo = ThoughtMemo::open(&path).await.unwrap();
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get("ep-1", 3).as_deref(), Some("I should open the menu."));
        assert_eq!(memo.get("ep-1", 4), None);
    }
}
