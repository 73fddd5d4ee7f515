//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::output::{Output, OutputFormat};
use super::view::{self, ShowOptions};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "plantree")]
#[command(author, version, about = "Hierarchical project plans: filter, inspect and group by resource")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project config file (defaults to .plantree.toml found upward)
    #[arg(long, global = true, env = "PLANTREE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a plan as a tree
    Show {
        /// Plan file
        file: PathBuf,

        /// Hide tasks whose whole name matches this regex (repeatable)
        #[arg(long, short = 'x')]
        exclude: Vec<String>,

        /// Hide the completed, milestone and resource groupings
        #[arg(long)]
        working: bool,

        /// Keep only tasks whose milestone matches this regex
        #[arg(long, short = 'm')]
        milestone: Option<String>,

        /// Group leaf tasks under their resource
        #[arg(long, short = 'r')]
        by_resource: bool,
    },

    /// Show a single task by ID
    Get {
        /// Plan file
        file: PathBuf,

        /// Task ID (outline path such as 1.2, or an explicit id)
        id: String,
    },

    /// Parse a plan and print a summary
    Check {
        /// Plan file
        file: PathBuf,
    },
}

/// Initialize tracing on stderr so stdout stays clean for output
fn init_tracing(verbose: bool) {
    let default = if verbose { "plantree=debug" } else { "plantree=warn" };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::with_project_file(path)?,
        None => Config::load()?,
    };
    let format = cli.format.unwrap_or(config.global.default_format);
    let output = Output::new(format, cli.verbose);

    if output.is_verbose() {
        match &config.project_file {
            Some(path) => output.verbose_ctx("config", &format!("Project config: {}", path.display())),
            None => output.verbose("No project config found, using defaults"),
        }
    }

    match cli.command {
        Commands::Show {
            file,
            exclude,
            working,
            milestone,
            by_resource,
        } => {
            let options = ShowOptions {
                excludes: exclude,
                working,
                milestone,
                by_resource,
            };
            view::show(&output, &config, &file, &options)
        }
        Commands::Get { file, id } => view::get(&output, &config, &file, &id),
        Commands::Check { file } => view::check(&output, &config, &file),
    }
}
