//! Configuration handling for plantree
//!
//! Configuration is stored in `.plantree.toml` (project, found by walking up
//! from the current directory) and `~/.config/plantree/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DEFAULT_UNASSIGNED_LABEL;

/// File name of the project configuration
pub const PROJECT_CONFIG_FILE: &str = ".plantree.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Kind of top-level metadata grouping in a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingKind {
    /// Everything below is done
    Completed,
    /// Children declare milestone tags
    Milestones,
    /// Children declare resource tags
    Resources,
}

/// Names that mark the top-level metadata groupings
///
/// Names are compared trimmed and case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupingConfig {
    pub completed: Vec<String>,
    pub milestones: Vec<String>,
    pub resources: Vec<String>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            completed: vec!["Completed Work".to_string()],
            milestones: vec!["Milestones".to_string()],
            resources: vec!["Resources".to_string()],
        }
    }
}

impl GroupingConfig {
    /// Returns which grouping a top-level record with this name starts
    pub fn kind_of(&self, name: &str) -> Option<GroupingKind> {
        let name = name.trim();

        if is_listed(&self.completed, name) {
            Some(GroupingKind::Completed)
        } else if is_listed(&self.milestones, name) {
            Some(GroupingKind::Milestones)
        } else if is_listed(&self.resources, name) {
            Some(GroupingKind::Resources)
        } else {
            None
        }
    }

    /// All configured grouping names
    pub fn all_names(&self) -> impl Iterator<Item = &String> {
        self.completed
            .iter()
            .chain(&self.milestones)
            .chain(&self.resources)
    }
}

fn is_listed(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n.trim().eq_ignore_ascii_case(name))
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Name of the root when the plan has no `@title`
    pub root_name: String,

    /// Name of the resource view group for tasks without a resource
    pub unassigned_label: String,

    /// Metadata grouping names
    pub groupings: GroupingConfig,

    /// Names hidden by `show --working` (defaults to the grouping names)
    pub working_excludes: Option<Vec<String>>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root_name: "Project".to_string(),
            unassigned_label: DEFAULT_UNASSIGNED_LABEL.to_string(),
            groupings: GroupingConfig::default(),
            working_excludes: None,
        }
    }
}

impl ProjectConfig {
    /// Names hidden from the working view
    pub fn working_excludes(&self) -> Vec<String> {
        match &self.working_excludes {
            Some(names) => names.clone(),
            None => self.groupings.all_names().cloned().collect(),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.root_name.trim().is_empty() {
            return Err(ConfigError::Invalid("root_name must not be empty".to_string()));
        }
        if self.unassigned_label.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "unassigned_label must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text, json or yaml)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_file = std::env::current_dir()
            .ok()
            .and_then(|dir| Self::find_project_config(&dir));

        let project = match &project_file {
            Some(path) => Self::load_project_config(path)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            project_file,
        })
    }

    /// Loads configuration with an explicit project config file
    pub fn with_project_file(path: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(path)?;

        Ok(Self {
            project,
            global,
            project_file: Some(path.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "plantree", "plantree").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a file
    pub fn load_project_config(path: &Path) -> Result<ProjectConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project config: {}", path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse project config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", path.display()))
    }

    /// Finds `.plantree.toml` in `start` or one of its parents
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(PROJECT_CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
