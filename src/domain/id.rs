//! Task identifiers
//!
//! ID Format:
//! - Root: `0`
//! - Outline IDs (assigned by the parser): `{seq}.{seq}...` (e.g., `2.1.3`)
//! - Named IDs (given in the source): a letter followed by letters, digits,
//!   `-`, `_` or `.` (e.g., `kickoff`, `ws1-review`)
//! - Resource group IDs (synthetic, resource views only): `@{tag}`, and
//!   a bare `@` for the unassigned group
//!
//! The three forms never overlap, so an assigned ID cannot collide with one
//! written in the source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID: '{0}' (expected an outline path like '1.2', or a name starting with a letter)")]
    InvalidTaskId(String),

    #[error("Invalid sequence number: {0}")]
    InvalidSequence(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Kind {
    Outline(Vec<u32>),
    Named(String),
    Group(Option<String>),
}

/// Identifier of a node in a task tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId {
    kind: Kind,
}

impl TaskId {
    /// The ID of a parsed tree's root
    pub fn root() -> Self {
        Self {
            kind: Kind::Outline(vec![]),
        }
    }

    /// Creates an outline ID from its position path
    pub fn outline(segments: Vec<u32>) -> Self {
        Self {
            kind: Kind::Outline(segments),
        }
    }

    /// Creates a named ID, validating its characters
    pub fn named(name: &str) -> Result<Self, IdError> {
        let name = name.trim();
        let mut chars = name.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if !valid_start || !valid_rest {
            return Err(IdError::InvalidTaskId(name.to_string()));
        }

        Ok(Self {
            kind: Kind::Named(name.to_string()),
        })
    }

    /// ID of the synthetic group collecting tasks owned by `tag`
    pub fn resource_group(tag: impl Into<String>) -> Self {
        Self {
            kind: Kind::Group(Some(tag.into())),
        }
    }

    /// ID of the synthetic group collecting tasks with no resource
    pub fn unassigned_group() -> Self {
        Self {
            kind: Kind::Group(None),
        }
    }

    /// Returns true for synthetic resource group IDs
    pub fn is_group(&self) -> bool {
        matches!(self.kind, Kind::Group(_))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Outline(segments) if segments.is_empty() => write!(f, "0"),
            Kind::Outline(segments) => {
                for (i, seg) in segments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", seg)?;
                }
                Ok(())
            }
            Kind::Named(name) => write!(f, "{}", name),
            Kind::Group(Some(tag)) => write!(f, "@{}", tag),
            Kind::Group(None) => write!(f, "@"),
        }
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s == "0" {
            return Ok(Self::root());
        }

        if let Some(tag) = s.strip_prefix('@') {
            return Ok(if tag.is_empty() {
                Self::unassigned_group()
            } else {
                Self::resource_group(tag)
            });
        }

        if s.starts_with(|c: char| c.is_ascii_digit()) {
            let segments: Result<Vec<u32>, _> = s
                .split('.')
                .map(|p| match p.parse::<u32>() {
                    Ok(0) | Err(_) => Err(IdError::InvalidSequence(p.to_string())),
                    Ok(n) => Ok(n),
                })
                .collect();
            return Ok(Self::outline(segments?));
        }

        Self::named(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.to_string()
    }
}
