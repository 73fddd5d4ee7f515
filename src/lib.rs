//! plantree - hierarchical project plans
//!
//! A plan is an outline of tasks with milestones, resources and durations.
//! plantree parses it into a [`TaskTree`] and derives views from it:
//! subtrees hidden by name, tasks of a milestone, tasks grouped by owner.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{
    exclude_by_name, milestone_match, resource_tree, TaskId, TaskRecord, TaskTree,
};
pub use storage::{parse, ParseError};
