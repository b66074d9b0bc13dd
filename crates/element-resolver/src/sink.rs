use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ResolverError;

/// Which resolver operation failed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    /// The page renderer could not produce a tree.
    PageBuild,
    /// A locator did not resolve to an element id.
    #[default]
    Locate,
}

/// Structured record of a soft resolver failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolveFailure {
    pub episode_id: String,
    #[serde(default)]
    pub phase: FailurePhase,
    /// Empty for page build failures.
    #[serde(default)]
    pub locator: String,
    pub kind: String,
    pub error: String,
    pub recorded_at: DateTime<Utc>,
}

impl ResolveFailure {
    /// Unresolved locator.
    pub fn new(episode_id: &str, locator: &str, error: &ResolverError) -> Self {
        Self {
            episode_id: episode_id.to_string(),
            phase: FailurePhase::Locate,
            locator: locator.to_string(),
            kind: error.kind().to_string(),
            error: error.to_string(),
            recorded_at: Utc::now(),
        }
    }

    /// Renderer failure while building a page tree.
    pub fn page_build(episode_id: &str, error: &ResolverError) -> Self {
        Self {
            phase: FailurePhase::PageBuild,
            ..Self::new(episode_id, "", error)
        }
    }
}

struct SinkInner {
    records: Vec<ResolveFailure>,
    mirror: Option<File>,
}

/// Append-only error sink shared by every render worker.
///
/// Each record is appended under one lock, so concurrent writers never
/// interleave partial lines in the mirror file.
pub struct ErrorSink {
    inner: Mutex<SinkInner>,
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSink {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SinkInner {
                records: Vec::new(),
                mirror: None,
            }),
        }
    }

    /// Sink that also appends every record as a JSON line to `path`.
    pub fn with_file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Mutex::new(SinkInner {
                records: Vec::new(),
                mirror: Some(file),
            }),
        })
    }

    pub fn record(&self, failure: ResolveFailure) {
        let mut inner = self.inner.lock();
        if let Some(file) = inner.mirror.as_mut() {
            match serde_json::to_string(&failure) {
                Ok(mut line) => {
                    line.push('\n');
                    if let Err(err) = file.write_all(line.as_bytes()) {
                        warn!(?err, "failed to mirror resolver failure");
                    }
                }
                Err(err) => warn!(?err, "failed to encode resolver failure"),
            }
        }
        inner.records.push(failure);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records of unresolved locators.
    pub fn misses(&self) -> usize {
        self.count(FailurePhase::Locate)
    }

    /// Records of failed page builds.
    pub fn build_failures(&self) -> usize {
        self.count(FailurePhase::PageBuild)
    }

    fn count(&self, phase: FailurePhase) -> usize {
        self.inner
            .lock()
            .records
            .iter()
            .filter(|record| record.phase == phase)
            .count()
    }

    pub fn snapshot(&self) -> Vec<ResolveFailure> {
        self.inner.lock().records.clone()
    }

    pub fn for_episode(&self, episode_id: &str) -> Vec<ResolveFailure> {
        self.inner
            .lock()
            .records
            .iter()
            .filter(|record| record.episode_id == episode_id)
            .cloned()
            .collect()
    }
}
