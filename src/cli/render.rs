//! ASCII tree rendering for task trees.

use super::output::format_days;
use crate::domain::{NodeRef, TaskRecord, TaskTree};

const OPEN: char = '○';
const COMPLETED: char = '●';

/// Get the status symbol for a task.
fn status_symbol(record: &TaskRecord) -> char {
    if record.is_completed() {
        COMPLETED
    } else {
        OPEN
    }
}

/// Milestone, resource and duration annotations, each preceded by a space.
fn annotations(record: &TaskRecord) -> String {
    let mut out = String::new();
    if let Some(milestone) = record.milestone() {
        out.push_str(&format!(" [{}]", milestone));
    }
    if let Some(resource) = record.resource() {
        // A resource group is already named after its resource
        if !record.id().is_group() {
            out.push_str(&format!(" @{}", resource));
        }
    }
    if record.duration() > 0.0 {
        out.push(' ');
        out.push_str(&format_days(record.duration()));
    }
    out
}

/// Render a task tree as ASCII art with status symbols.
///
/// Example output:
/// ```text
/// Website Relaunch
/// ├── ○ Design
/// │   ├── ○ Wireframes [WS1] @alice 3d
/// │   └── ● Style guide @bob 1.5d
/// └── ● Completed Work
///     └── ● Kickoff
/// ```
pub fn render_tree(tree: &TaskTree) -> String {
    let mut output = String::new();
    let root = tree.root();
    output.push_str(root.record().name());
    output.push('\n');

    let count = root.children().len();
    for (i, child) in root.children().enumerate() {
        render_node(&mut output, child, "", i == count - 1);
    }
    output
}

/// Recursively render a node and its children.
fn render_node(output: &mut String, node: NodeRef<'_>, prefix: &str, is_last: bool) {
    let record = node.record();
    let branch = if is_last { "└── " } else { "├── " };

    output.push_str(prefix);
    output.push_str(branch);
    output.push(status_symbol(record));
    output.push(' ');
    output.push_str(record.name());
    output.push_str(&annotations(record));
    output.push('\n');

    let continuation = if is_last { "    " } else { "│   " };
    let child_prefix = format!("{}{}", prefix, continuation);

    let count = node.children().len();
    for (i, child) in node.children().enumerate() {
        render_node(output, child, &child_prefix, i == count - 1);
    }
}
