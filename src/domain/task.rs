//! Task record
//!
//! A `TaskRecord` is the immutable description of one task: who owns it,
//! which milestone it belongs to, whether it is done and how long it takes.
//! Fields are private; records are built once and shared between trees.

use serde::Serialize;
use thiserror::Error;

use super::id::TaskId;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Task name must not be empty")]
    EmptyName,

    #[error("Duration must be a finite, non-negative number of days, got {0}")]
    InvalidDuration(f64),
}

/// One task of a project plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    id: TaskId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    milestone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    completed: bool,
    duration: f64,
}

impl TaskRecord {
    /// Creates an open task with no milestone, resource or duration
    pub fn new(id: TaskId, name: impl Into<String>) -> Result<Self, RecordError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RecordError::EmptyName);
        }

        Ok(Self {
            id,
            name,
            milestone: None,
            resource: None,
            completed: false,
            duration: 0.0,
        })
    }

    pub fn with_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets the duration in working days
    pub fn with_duration(mut self, days: f64) -> Result<Self, RecordError> {
        if !days.is_finite() || days < 0.0 {
            return Err(RecordError::InvalidDuration(days));
        }
        self.duration = days;
        Ok(self)
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn milestone(&self) -> Option<&str> {
        self.milestone.as_deref()
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Duration in working days (0 when unspecified)
    pub fn duration(&self) -> f64 {
        self.duration
    }
}
