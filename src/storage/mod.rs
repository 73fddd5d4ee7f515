//! # Storage Layer
//!
//! Reading plans and configuration from disk.
//!
//! ## Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Plans | Outline text (see [`outline`]) | any path given on the command line |
//! | Project config | TOML | `.plantree.toml`, searched upward from the current directory |
//! | Global config | TOML | `~/.config/plantree/config.toml` |
//!
//! Plans are read once and never written back.
//!
//! ## Key Types
//!
//! - [`PlanFile`] - Reads and parses a plan file
//! - [`Config`] - Project and global configuration
//! - [`parse`] / [`parse_with`] - Outline parser

pub mod outline;
mod config;
mod plan;

pub use config::{
    Config, ConfigError, GlobalConfig, GroupingConfig, GroupingKind, OutputFormat, ProjectConfig,
    PROJECT_CONFIG_FILE,
};
pub use outline::{parse, parse_with, ParseError, ParseErrorKind};
pub use plan::PlanFile;
