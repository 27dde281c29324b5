//! ARC task files on disk
//!
//! Tasks live at `<root>/<split>/<name>.json` in the public ARC layout:
//! `{"train": [{"input": .., "output": ..}], "test": [{"input": ..}]}`.

use super::grid::Grid;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid task name: {0:?}")]
    InvalidName(String),
    #[error("task not found: {split}/{name}")]
    NotFound { split: String, name: String },
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed task {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One input/output pair; test outputs may be withheld
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: Grid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Grid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcTask {
    pub train: Vec<Example>,
    pub test: Vec<Example>,
}

impl ArcTask {
    pub fn first_test(&self) -> Option<&Example> {
        self.test.first()
    }

    /// Expected output of the first test pair, when the file carries it
    pub fn expected_output(&self) -> Option<&Grid> {
        self.first_test().and_then(|e| e.output.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
}

impl Dataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_component(value: &str) -> Result<(), DatasetError> {
        let bad = value.is_empty()
            || value == "."
            || value.contains("..")
            || value.contains('/')
            || value.contains('\\')
            || value.contains('\0');
        if bad {
            return Err(DatasetError::InvalidName(value.to_string()));
        }
        Ok(())
    }

    /// Path of a task file after validating both components
    pub fn task_path(&self, split: &str, name: &str) -> Result<PathBuf, DatasetError> {
        Self::check_component(split)?;
        Self::check_component(name)?;
        Ok(self.root.join(split).join(format!("{}.json", name)))
    }

    pub fn load(&self, split: &str, name: &str) -> Result<ArcTask, DatasetError> {
        let path = self.task_path(split, name)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DatasetError::NotFound {
                    split: split.to_string(),
                    name: name.to_string(),
                })
            }
            Err(source) => return Err(DatasetError::Io { path, source }),
        };

        let task = serde_json::from_str(&text)
            .map_err(|source| DatasetError::Malformed { path: path.clone(), source })?;
        tracing::debug!("Loaded task {}/{}", split, name);
        Ok(task)
    }

    /// Task names in a split, sorted; a missing split is empty
    pub fn list(&self, split: &str) -> Result<Vec<String>, DatasetError> {
        Self::check_component(split)?;
        let dir = self.root.join(split);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(DatasetError::Io { path: dir, source }),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DatasetError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
