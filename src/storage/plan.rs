//! Plan files
//!
//! A plan file is read once, completely, and then parsed. The file handle
//! is closed before parsing starts; the resulting tree holds no reference
//! to the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::ProjectConfig;
use super::outline;
use crate::domain::TaskTree;

/// A plan outline on disk
pub struct PlanFile {
    path: PathBuf,
}

impl PlanFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the plan file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file
    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read plan: {}", self.path.display()))
    }

    /// Reads and parses the plan
    pub fn load(&self, config: &ProjectConfig) -> Result<TaskTree> {
        let text = self.read()?;
        tracing::debug!(path = %self.path.display(), bytes = text.len(), "read plan");

        outline::parse_with(&text, config)
            .with_context(|| format!("Failed to parse plan: {}", self.path.display()))
    }
}
