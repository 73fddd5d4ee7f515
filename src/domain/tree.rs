//! Task tree
//!
//! A `TaskTree` owns every node in an arena. Nodes refer to their parent
//! and children by position in the arena, so back-references never own
//! anything, and a tree is dropped as a unit. Each tree carries its own
//! `TaskId` index; there is no shared registry between trees.
//!
//! Trees are immutable once built. Queries (see `query`) read one tree and
//! build a new one with [`TreeBuilder`], sharing the `Arc<TaskRecord>`
//! values but never the nodes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::id::TaskId;
use super::task::TaskRecord;

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("Duplicate task ID: {0}")]
    DuplicateId(TaskId),

    #[error("Parent node does not belong to this tree")]
    UnknownParent,
}

/// Milestone and resource tags declared by a plan's metadata groupings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    milestones: Vec<String>,
    resources: Vec<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a milestone tag; returns false if it was already known
    pub fn add_milestone(&mut self, tag: impl Into<String>) -> bool {
        push_unique(&mut self.milestones, tag.into())
    }

    /// Records a resource tag; returns false if it was already known
    pub fn add_resource(&mut self, tag: impl Into<String>) -> bool {
        push_unique(&mut self.resources, tag.into())
    }

    /// Declared milestone tags, in declaration order
    pub fn milestones(&self) -> &[String] {
        &self.milestones
    }

    /// Declared resource tags, in declaration order
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty() && self.resources.is_empty()
    }
}

fn push_unique(tags: &mut Vec<String>, tag: String) -> bool {
    if tags.contains(&tag) {
        false
    } else {
        tags.push(tag);
        true
    }
}

/// IDs of the recognised top-level metadata groupings of a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Groupings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestones: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<TaskId>,
}

impl Groupings {
    /// Keeps only the groupings whose node is still present in `tree`
    pub fn retained_in(&self, tree: &TaskTree) -> Groupings {
        let keep = |id: &Option<TaskId>| id.clone().filter(|id| tree.contains(id));
        Groupings {
            completed: keep(&self.completed),
            milestones: keep(&self.milestones),
            resources: keep(&self.resources),
        }
    }
}

#[derive(Debug, Clone)]
struct TaskNode {
    record: Arc<TaskRecord>,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
}

/// A rooted, ordered tree of tasks with an ID index
#[derive(Debug, Clone)]
pub struct TaskTree {
    nodes: Vec<TaskNode>,
    index: HashMap<TaskId, usize>,
    catalog: Catalog,
    groupings: Groupings,
}

const ROOT: usize = 0;

impl TaskTree {
    /// Returns the root node
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            idx: ROOT,
        }
    }

    /// Looks up a node by ID; a miss is not an error
    pub fn get(&self, id: &TaskId) -> Option<NodeRef<'_>> {
        self.index.get(id).map(|&idx| NodeRef { tree: self, idx })
    }

    /// Returns true if the tree contains a node with this ID
    pub fn contains(&self, id: &TaskId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the root has no children
    pub fn is_bare(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    /// Pre-order traversal starting at the root
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![ROOT],
        }
    }

    /// All node IDs in pre-order
    pub fn ids(&self) -> impl Iterator<Item = &TaskId> {
        self.walk().map(|node| node.id())
    }

    /// Number of entries in the ID index
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn groupings(&self) -> &Groupings {
        &self.groupings
    }

    /// Totals over the work items below the root
    ///
    /// Synthetic resource groups are skipped, as are the milestone and
    /// resource groupings together with the tags they declare.
    pub fn summary(&self) -> Summary {
        let declares = |id: &TaskId| {
            [&self.groupings.milestones, &self.groupings.resources]
                .into_iter()
                .flatten()
                .any(|grouping| grouping == id)
        };

        let mut summary = Summary::default();
        for node in self.walk().skip(1) {
            let record = node.record();
            if record.id().is_group()
                || declares(record.id())
                || node.ancestors().any(|a| declares(a.id()))
            {
                continue;
            }
            summary.tasks += 1;
            summary.total_days += record.duration();
            if record.is_completed() {
                summary.completed += 1;
            } else {
                summary.remaining_days += record.duration();
            }
        }
        summary
    }
}

/// Task counts and durations of a tree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub tasks: usize,
    pub completed: usize,
    pub total_days: f64,
    pub remaining_days: f64,
}

impl PartialEq for TaskTree {
    /// Structural equality: same records in the same shape and order
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}

/// Read-only view of one node of a tree
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a TaskTree,
    idx: usize,
}

impl<'a> NodeRef<'a> {
    fn node(&self) -> &'a TaskNode {
        &self.tree.nodes[self.idx]
    }

    pub fn record(&self) -> &'a TaskRecord {
        &self.node().record
    }

    /// The shared record, for building other trees without copying it
    pub fn shared_record(&self) -> Arc<TaskRecord> {
        Arc::clone(&self.node().record)
    }

    pub fn id(&self) -> &'a TaskId {
        self.record().id()
    }

    /// Distance from the root (the root is at depth 0)
    pub fn depth(&self) -> usize {
        self.node().depth
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|idx| NodeRef {
            tree: self.tree,
            idx,
        })
    }

    /// Children in source order
    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&idx| NodeRef { tree, idx })
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'a>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn is_leaf(&self) -> bool {
        self.node().children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.idx == ROOT
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.record() == other.record()
            && self.children().len() == other.children().len()
            && self.children().zip(other.children()).all(|(a, b)| a == b)
    }
}

/// Pre-order iterator over a tree
pub struct Walk<'a> {
    tree: &'a TaskTree,
    stack: Vec<usize>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        self.stack
            .extend(self.tree.nodes[idx].children.iter().rev().copied());
        Some(NodeRef {
            tree: self.tree,
            idx,
        })
    }
}

/// Opaque handle to a node inside a [`TreeBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(usize);

/// Builds a `TaskTree` top-down
///
/// The builder enforces the tree invariants: every node gets exactly one
/// parent, IDs are unique, and nodes can only be attached below nodes that
/// already exist, so no cycle can be formed.
#[derive(Debug)]
pub struct TreeBuilder {
    tree: TaskTree,
}

impl TreeBuilder {
    /// Starts a tree with the given root record
    pub fn new(root: impl Into<Arc<TaskRecord>>) -> Self {
        let record = root.into();
        let mut index = HashMap::new();
        index.insert(record.id().clone(), ROOT);

        Self {
            tree: TaskTree {
                nodes: vec![TaskNode {
                    record,
                    parent: None,
                    children: Vec::new(),
                    depth: 0,
                }],
                index,
                catalog: Catalog::new(),
                groupings: Groupings::default(),
            },
        }
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle(ROOT)
    }

    /// Appends a child below `parent`, after any existing children
    pub fn add_child(
        &mut self,
        parent: NodeHandle,
        record: impl Into<Arc<TaskRecord>>,
    ) -> Result<NodeHandle, TreeError> {
        let record = record.into();
        let depth = match self.tree.nodes.get(parent.0) {
            Some(node) => node.depth + 1,
            None => return Err(TreeError::UnknownParent),
        };

        if self.tree.index.contains_key(record.id()) {
            return Err(TreeError::DuplicateId(record.id().clone()));
        }

        let idx = self.tree.nodes.len();
        self.tree.index.insert(record.id().clone(), idx);
        self.tree.nodes.push(TaskNode {
            record,
            parent: Some(parent.0),
            children: Vec::new(),
            depth,
        });
        self.tree.nodes[parent.0].children.push(idx);

        Ok(NodeHandle(idx))
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.tree.catalog
    }

    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.tree.catalog = catalog;
    }

    pub fn set_groupings(&mut self, groupings: Groupings) {
        self.tree.groupings = groupings;
    }

    pub fn build(self) -> TaskTree {
        self.tree
    }

    /// Finishes the tree, keeping those of `groupings` whose node it contains
    pub fn build_retaining(mut self, groupings: &Groupings) -> TaskTree {
        self.tree.groupings = groupings.retained_in(&self.tree);
        self.tree
    }
}

#[derive(Serialize)]
struct NestedNode<'a> {
    #[serde(flatten)]
    record: &'a TaskRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NestedNode<'a>>,
}

impl<'a> From<NodeRef<'a>> for NestedNode<'a> {
    fn from(node: NodeRef<'a>) -> Self {
        NestedNode {
            record: node.record(),
            children: node.children().map(NestedNode::from).collect(),
        }
    }
}

impl Serialize for TaskTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct TreeView<'a> {
            root: NestedNode<'a>,
            #[serde(skip_serializing_if = "Catalog::is_empty")]
            catalog: &'a Catalog,
        }

        TreeView {
            root: NestedNode::from(self.root()),
            catalog: &self.catalog,
        }
        .serialize(serializer)
    }
}
