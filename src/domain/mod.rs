//! Domain models for plantree
//!
//! The task tree and its queries, without any I/O concerns.

mod id;
mod task;
mod tree;
mod query;

pub use id::{IdError, TaskId};
pub use task::{RecordError, TaskRecord};
pub use tree::{
    Catalog, Groupings, NodeHandle, NodeRef, Summary, TaskTree, TreeBuilder, TreeError, Walk,
};
pub use query::{
    exclude, exclude_by_name, milestone_match, resource_tree, resource_tree_with_label,
    retain_matching, MilestoneMatches, NameMatches, Pattern, PatternError, QueryError,
    RecordPredicate, DEFAULT_UNASSIGNED_LABEL,
};
