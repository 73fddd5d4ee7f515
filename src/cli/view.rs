//! Plan commands (show, get, check)

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;

use super::output::{format_days, Output};
use super::render::render_tree;
use crate::domain::{exclude_by_name, milestone_match, resource_tree_with_label, TaskId, TaskTree};
use crate::storage::{Config, PlanFile};

/// Filters applied by `show`, in the order they run
#[derive(Debug, Default)]
pub struct ShowOptions {
    pub excludes: Vec<String>,
    pub working: bool,
    pub milestone: Option<String>,
    pub by_resource: bool,
}

fn load(output: &Output, config: &Config, file: &Path) -> Result<TaskTree> {
    let plan = PlanFile::new(file);
    output.verbose_ctx("load", &format!("Reading plan: {}", plan.path().display()));
    let tree = plan.load(&config.project)?;
    output.verbose_ctx("load", &format!("Parsed {} tasks", tree.len()));
    Ok(tree)
}

/// Case-insensitive alternation over literal names
fn working_pattern(names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let escaped: Vec<String> = names.iter().map(|name| regex::escape(name.trim())).collect();
    Some(format!("(?i){}", escaped.join("|")))
}

/// Show a plan, optionally filtered and grouped
pub fn show(output: &Output, config: &Config, file: &Path, options: &ShowOptions) -> Result<()> {
    let mut tree = load(output, config, file)?;

    for pattern in &options.excludes {
        output.verbose_ctx("show", &format!("Excluding: {}", pattern));
        tree = exclude_by_name(&tree, pattern)?;
    }

    if options.working {
        if let Some(pattern) = working_pattern(&config.project.working_excludes()) {
            output.verbose_ctx("show", &format!("Working view excludes: {}", pattern));
            tree = exclude_by_name(&tree, &pattern)?;
        }
    }

    if let Some(pattern) = &options.milestone {
        output.verbose_ctx("show", &format!("Milestone: {}", pattern));
        tree = milestone_match(&tree, pattern)?;
    }

    if options.by_resource {
        output.verbose_ctx("show", "Grouping by resource");
        tree = resource_tree_with_label(&tree, &config.project.unassigned_label)?;
    }

    if tree.is_bare() {
        output.verbose_ctx("show", "No tasks left to show");
    }

    if output.is_text() {
        print!("{}", render_tree(&tree));
    } else {
        output.data(&tree);
    }
    Ok(())
}

/// Show one task and the path leading to it
pub fn get(output: &Output, config: &Config, file: &Path, id: &str) -> Result<()> {
    let id: TaskId = id
        .parse()
        .with_context(|| format!("Invalid task ID: {}", id))?;
    let tree = load(output, config, file)?;

    let Some(node) = tree.get(&id) else {
        bail!("Task not found: {}", id);
    };
    let record = node.record();

    // Root first
    let mut path: Vec<_> = node.ancestors().collect();
    path.reverse();

    if output.is_text() {
        println!("{}  {}", record.id(), record.name());
        println!();
        println!(
            "Status:    {}",
            if record.is_completed() { "completed" } else { "open" }
        );
        if let Some(milestone) = record.milestone() {
            println!("Milestone: {}", milestone);
        }
        if let Some(resource) = record.resource() {
            println!("Resource:  {}", resource);
        }
        if record.duration() > 0.0 {
            println!("Duration:  {}", format_days(record.duration()));
        }
        if !node.is_root() {
            let names: Vec<&str> = path.iter().map(|n| n.record().name()).collect();
            println!("Path:      {}", names.join(" > "));
        }
        let children: Vec<String> = node.children().map(|c| c.id().to_string()).collect();
        if !children.is_empty() {
            println!("Children:  {}", children.join(", "));
        }
    } else {
        let path: Vec<String> = path.iter().map(|n| n.id().to_string()).collect();
        let children: Vec<String> = node.children().map(|c| c.id().to_string()).collect();
        output.data(&json!({
            "task": record,
            "path": path,
            "children": children,
        }));
    }
    Ok(())
}

/// Parse a plan and report what it contains
pub fn check(output: &Output, config: &Config, file: &Path) -> Result<()> {
    let tree = load(output, config, file)?;
    let summary = tree.summary();
    let catalog = tree.catalog();

    if output.is_text() {
        println!("{}: ok", file.display());
        println!("Title:      {}", tree.root().record().name());
        println!("Tasks:      {} ({} completed)", summary.tasks, summary.completed);
        println!(
            "Duration:   {} ({} remaining)",
            format_days(summary.total_days),
            format_days(summary.remaining_days)
        );
        if !catalog.milestones().is_empty() {
            println!("Milestones: {}", catalog.milestones().join(", "));
        }
        if !catalog.resources().is_empty() {
            println!("Resources:  {}", catalog.resources().join(", "));
        }
    } else {
        output.data(&json!({
            "file": file.display().to_string(),
            "title": tree.root().record().name(),
            "summary": summary,
            "catalog": catalog,
        }));
    }
    Ok(())
}
