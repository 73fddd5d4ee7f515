//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose | Example |
//! |---------|---------|---------|
//! | `show` | Render a plan, optionally filtered or grouped | `show plan.txt --working --by-resource` |
//! | `get` | One task and its ancestor path | `get plan.txt 1.2` |
//! | `check` | Parse a plan and summarize it | `check plan.txt` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//! - `yaml` - YAML, same shape as JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! plantree --verbose show plan.txt --milestone 'WS[12]'
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod render;
mod view;

pub use app::{run, Cli, Commands};
pub use output::Output;
pub use render::render_tree;
