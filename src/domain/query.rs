//! Tree queries
//!
//! Every query reads a tree and returns a new, independent one. Records
//! are shared with the input; nodes never are. Patterns are regular
//! expressions that must match the whole field value.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use thiserror::Error;

use super::id::TaskId;
use super::task::{RecordError, TaskRecord};
use super::tree::{NodeHandle, NodeRef, TaskTree, TreeBuilder, TreeError};

/// Name of the synthetic group holding tasks without a resource
pub const DEFAULT_UNASSIGNED_LABEL: &str = "unassigned";

#[derive(Debug, Error)]
#[error("Invalid pattern '{pattern}': {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

impl PatternError {
    /// The pattern as given by the caller
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// A regular expression matched against a whole field value
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let invalid = |source| PatternError {
            pattern: pattern.to_string(),
            source,
        };

        // Validate the pattern on its own first so that an unbalanced group
        // cannot be "fixed" by the anchoring wrapper.
        Regex::new(pattern).map_err(invalid)?;
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(invalid)?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// A test over a task record
pub trait RecordPredicate {
    fn matches(&self, record: &TaskRecord) -> bool;
}

/// Matches records whose name matches a pattern
#[derive(Debug, Clone)]
pub struct NameMatches(pub Pattern);

impl RecordPredicate for NameMatches {
    fn matches(&self, record: &TaskRecord) -> bool {
        self.0.is_match(record.name())
    }
}

/// Matches records whose milestone matches a pattern
///
/// A record without a milestone is tested as the empty string, so it only
/// matches patterns that accept `""`.
#[derive(Debug, Clone)]
pub struct MilestoneMatches(pub Pattern);

impl RecordPredicate for MilestoneMatches {
    fn matches(&self, record: &TaskRecord) -> bool {
        self.0.is_match(record.milestone().unwrap_or(""))
    }
}

impl<F> RecordPredicate for F
where
    F: Fn(&TaskRecord) -> bool,
{
    fn matches(&self, record: &TaskRecord) -> bool {
        self(record)
    }
}

/// Removes every node whose name matches `pattern`, with its subtree
pub fn exclude_by_name(tree: &TaskTree, pattern: &str) -> Result<TaskTree, QueryError> {
    let predicate = NameMatches(Pattern::new(pattern)?);
    let result = exclude(tree, &predicate)?;
    tracing::debug!(
        pattern,
        before = tree.len(),
        after = result.len(),
        "excluded by name"
    );
    Ok(result)
}

/// Keeps nodes whose milestone matches `pattern`, plus their ancestors
pub fn milestone_match(tree: &TaskTree, pattern: &str) -> Result<TaskTree, QueryError> {
    let predicate = MilestoneMatches(Pattern::new(pattern)?);
    let result = retain_matching(tree, &predicate)?;
    tracing::debug!(
        pattern,
        before = tree.len(),
        after = result.len(),
        "matched milestones"
    );
    Ok(result)
}

/// Removes every node matching `predicate` together with its subtree
///
/// The root is always kept.
pub fn exclude(tree: &TaskTree, predicate: &impl RecordPredicate) -> Result<TaskTree, QueryError> {
    copy_where(tree, |node| !predicate.matches(node.record()))
}

/// Keeps the nodes matching `predicate` and every ancestor needed to reach
/// them from the root
pub fn retain_matching(
    tree: &TaskTree,
    predicate: &impl RecordPredicate,
) -> Result<TaskTree, QueryError> {
    let mut kept = HashSet::new();
    mark_matching(tree.root(), predicate, &mut kept);
    copy_where(tree, |node| kept.contains(node.id()))
}

/// Marks matching nodes and their ancestors; returns true if `node` is kept
fn mark_matching<'a>(
    node: NodeRef<'a>,
    predicate: &impl RecordPredicate,
    kept: &mut HashSet<&'a TaskId>,
) -> bool {
    let mut keep = predicate.matches(node.record());
    for child in node.children() {
        // No short-circuit: every matching descendant must be marked
        keep |= mark_matching(child, predicate, kept);
    }
    if keep {
        kept.insert(node.id());
    }
    keep
}

/// Copies the tree, skipping the subtree of every non-root node for which
/// `keep` returns false
fn copy_where<'a>(
    tree: &'a TaskTree,
    keep: impl Fn(NodeRef<'a>) -> bool,
) -> Result<TaskTree, QueryError> {
    let mut builder = TreeBuilder::new(tree.root().shared_record());
    let root = builder.root();
    copy_children(tree.root(), root, &mut builder, &keep)?;

    builder.set_catalog(tree.catalog().clone());
    Ok(builder.build_retaining(tree.groupings()))
}

fn copy_children<'a>(
    from: NodeRef<'a>,
    to: NodeHandle,
    builder: &mut TreeBuilder,
    keep: &impl Fn(NodeRef<'a>) -> bool,
) -> Result<(), TreeError> {
    for child in from.children() {
        if keep(child) {
            let handle = builder.add_child(to, child.shared_record())?;
            copy_children(child, handle, builder, keep)?;
        }
    }
    Ok(())
}

/// Regroups every task under its resource
///
/// See [`resource_tree_with_label`]; the unassigned group is named
/// [`DEFAULT_UNASSIGNED_LABEL`].
pub fn resource_tree(tree: &TaskTree) -> Result<TaskTree, QueryError> {
    resource_tree_with_label(tree, DEFAULT_UNASSIGNED_LABEL)
}

/// Regroups every task under its resource
///
/// The result keeps the input's root. Its children are one group per
/// resource tag, in the order the tags are first met in a pre-order walk,
/// followed by a group named `unassigned_label` for tasks without a
/// resource (only if there are any). Every task of the input becomes a
/// leaf of its group; the original nesting is dropped. Groups left over
/// from an earlier resource view are not regrouped.
pub fn resource_tree_with_label(
    tree: &TaskTree,
    unassigned_label: &str,
) -> Result<TaskTree, QueryError> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<NodeRef<'_>>> = HashMap::new();
    let mut unassigned = Vec::new();

    for node in tree.walk().skip(1) {
        if node.id().is_group() {
            continue;
        }
        match node.record().resource() {
            Some(tag) => {
                let bucket = members.entry(tag).or_insert_with(|| {
                    order.push(tag);
                    Vec::new()
                });
                bucket.push(node);
            }
            None => unassigned.push(node),
        }
    }

    let mut builder = TreeBuilder::new(tree.root().shared_record());
    let root = builder.root();

    for tag in &order {
        let tasks = members.remove(tag).unwrap_or_default();
        let record = group_record(TaskId::resource_group(*tag), tag, &tasks)?.with_resource(*tag);
        add_group(&mut builder, root, record, &tasks)?;
    }

    if !unassigned.is_empty() {
        let record = group_record(TaskId::unassigned_group(), unassigned_label, &unassigned)?;
        add_group(&mut builder, root, record, &unassigned)?;
    }

    builder.set_catalog(tree.catalog().clone());
    tracing::debug!(
        groups = order.len() + usize::from(!unassigned.is_empty()),
        "built resource view"
    );
    Ok(builder.build_retaining(tree.groupings()))
}

/// Builds a group's record: durations add up, done when every member is
///
/// The sum saturates at `f64::MAX`, so members that each hold a valid
/// duration always yield a valid group.
fn group_record(id: TaskId, name: &str, tasks: &[NodeRef<'_>]) -> Result<TaskRecord, RecordError> {
    let days = tasks
        .iter()
        .map(|t| t.record().duration())
        .sum::<f64>()
        .min(f64::MAX);
    let completed = tasks.iter().all(|t| t.record().is_completed());
    Ok(TaskRecord::new(id, name)?
        .with_duration(days)?
        .with_completed(completed))
}

fn add_group(
    builder: &mut TreeBuilder,
    root: NodeHandle,
    record: TaskRecord,
    tasks: &[NodeRef<'_>],
) -> Result<(), TreeError> {
    let group = builder.add_child(root, record)?;
    for task in tasks {
        builder.add_child(group, task.shared_record())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::Groupings;

    fn record(id: &str, name: &str) -> TaskRecord {
        TaskRecord::new(id.parse().unwrap(), name).unwrap()
    }

    fn names(tree: &TaskTree) -> Vec<String> {
        tree.walk()
            .map(|n| format!("{}{}", "  ".repeat(n.depth()), n.record().name()))
            .collect()
    }

    /// root -> { A (WS1), B (WS2) -> { C (WS1) } }
    fn milestone_tree() -> TaskTree {
        let mut builder = TreeBuilder::new(record("0", "root"));
        let root = builder.root();
        builder
            .add_child(root, record("a", "A").with_milestone("WS1"))
            .unwrap();
        let b = builder
            .add_child(root, record("b", "B").with_milestone("WS2"))
            .unwrap();
        builder
            .add_child(b, record("c", "C").with_milestone("WS1"))
            .unwrap();
        builder.build()
    }

    /// Project -> { Work -> { T1 (alice), T2 (bob) }, Completed Work -> { T3 } }
    fn work_tree() -> TaskTree {
        let mut builder = TreeBuilder::new(record("0", "Project"));
        let root = builder.root();
        let work = builder.add_child(root, record("1", "Work")).unwrap();
        builder
            .add_child(
                work,
                record("1.1", "T1")
                    .with_resource("alice")
                    .with_duration(2.0)
                    .unwrap(),
            )
            .unwrap();
        builder
            .add_child(work, record("1.2", "T2").with_resource("bob"))
            .unwrap();
        let done = builder
            .add_child(root, record("2", "Completed Work"))
            .unwrap();
        builder
            .add_child(done, record("2.1", "T3").with_completed(true))
            .unwrap();
        builder.set_groupings(Groupings {
            completed: Some("2".parse().unwrap()),
            ..Groupings::default()
        });
        builder.build()
    }

    #[test]
    fn pattern_matches_whole_string() {
        let pattern = Pattern::new("Work").unwrap();
        assert!(pattern.is_match("Work"));
        assert!(!pattern.is_match("Completed Work"));
        assert_eq!(pattern.as_str(), "Work");
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Pattern::new("(unclosed").unwrap_err();
        assert_eq!(err.pattern(), "(unclosed");

        // Would balance inside the anchoring group if not checked alone
        assert!(Pattern::new("a)|(b").is_err());
    }

    #[test]
    fn exclude_removes_whole_subtree() {
        let tree = work_tree();
        let result = exclude_by_name(&tree, "Completed Work").unwrap();

        assert_eq!(names(&result), vec!["Project", "  Work", "    T1", "    T2"]);
        assert!(result.get(&"2.1".parse().unwrap()).is_none());
        assert!(result.groupings().completed.is_none());
    }

    #[test]
    fn exclude_never_removes_root() {
        let tree = work_tree();
        let result = exclude_by_name(&tree, "Project|Work|Completed Work").unwrap();

        assert_eq!(names(&result), vec!["Project"]);
        assert!(result.is_bare());
        assert_eq!(result.index_len(), 1);
    }

    #[test]
    fn exclude_preserves_ids_and_attributes() {
        let tree = work_tree();
        let result = exclude_by_name(&tree, "T2").unwrap();

        let t1 = result.get(&"1.1".parse().unwrap()).unwrap();
        assert_eq!(t1.record(), tree.get(&"1.1".parse().unwrap()).unwrap().record());
        assert_eq!(result.groupings(), tree.groupings());
    }

    #[test]
    fn exclude_does_not_touch_input() {
        let tree = work_tree();
        let before = tree.clone();
        exclude_by_name(&tree, "Work").unwrap();
        assert_eq!(tree, before);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn exclude_is_idempotent() {
        let tree = work_tree();
        let once = exclude_by_name(&tree, "T.").unwrap();
        let twice = exclude_by_name(&once, "T.").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn exclude_with_bad_pattern_fails() {
        let err = exclude_by_name(&work_tree(), "[").unwrap_err();
        assert!(matches!(err, QueryError::Pattern(_)));
    }

    #[test]
    fn milestone_match_keeps_connecting_ancestors() {
        let result = milestone_match(&milestone_tree(), "WS1").unwrap();
        assert_eq!(names(&result), vec!["root", "  A", "  B", "    C"]);
    }

    #[test]
    fn milestone_match_drops_non_matching_children() {
        let mut builder = TreeBuilder::new(record("0", "root"));
        let root = builder.root();
        let a = builder
            .add_child(root, record("a", "A").with_milestone("WS1"))
            .unwrap();
        builder
            .add_child(a, record("a1", "A1").with_milestone("WS2"))
            .unwrap();
        builder
            .add_child(a, record("a2", "A2").with_milestone("WS1"))
            .unwrap();
        let tree = builder.build();

        let result = milestone_match(&tree, "WS1").unwrap();
        assert_eq!(names(&result), vec!["root", "  A", "    A2"]);
    }

    #[test]
    fn absent_milestone_only_matches_empty_pattern() {
        let tree = work_tree();

        let none = milestone_match(&tree, "WS.*").unwrap();
        assert!(none.is_bare());

        let all = milestone_match(&tree, "").unwrap();
        assert_eq!(all, tree);
    }

    #[test]
    fn milestone_match_with_bad_pattern_fails() {
        assert!(milestone_match(&milestone_tree(), "(").is_err());
    }

    #[test]
    fn closure_predicates_work() {
        let tree = work_tree();
        let result = retain_matching(&tree, &|r: &TaskRecord| r.is_completed()).unwrap();
        assert_eq!(names(&result), vec!["Project", "  Completed Work", "    T3"]);
    }

    #[test]
    fn resource_tree_groups_in_first_seen_order() {
        let mut builder = TreeBuilder::new(record("0", "root"));
        let root = builder.root();
        builder
            .add_child(root, record("t1", "T1").with_resource("alice"))
            .unwrap();
        builder
            .add_child(root, record("t2", "T2").with_resource("bob"))
            .unwrap();
        builder.add_child(root, record("t3", "T3")).unwrap();
        let tree = builder.build();

        let result = resource_tree(&tree).unwrap();
        assert_eq!(
            names(&result),
            vec!["root", "  alice", "    T1", "  bob", "    T2", "  unassigned", "    T3"]
        );
    }

    #[test]
    fn resource_tree_flattens_nesting() {
        let result = resource_tree(&work_tree()).unwrap();
        assert_eq!(
            names(&result),
            vec![
                "Project",
                "  alice",
                "    T1",
                "  bob",
                "    T2",
                "  unassigned",
                "    Work",
                "    Completed Work",
                "    T3",
            ]
        );
    }

    #[test]
    fn resource_groups_are_indexed_by_tag() {
        let result = resource_tree(&work_tree()).unwrap();

        let alice = result.get(&TaskId::resource_group("alice")).unwrap();
        assert_eq!(alice.record().resource(), Some("alice"));
        assert_eq!(alice.record().duration(), 2.0);
        assert!(!alice.record().is_completed());

        let unassigned = result.get(&TaskId::unassigned_group()).unwrap();
        assert_eq!(unassigned.children().len(), 3);

        // Grouped tasks keep their IDs, so they can be found in the source
        let t1 = result.get(&"1.1".parse().unwrap()).unwrap();
        assert_eq!(t1.parent().unwrap().id(), &TaskId::resource_group("alice"));
    }

    #[test]
    fn resource_tree_conserves_task_ids() {
        let tree = work_tree();
        let result = resource_tree(&tree).unwrap();

        let source: HashSet<_> = tree.ids().cloned().collect();
        let grouped: HashSet<_> = result.ids().filter(|id| !id.is_group()).cloned().collect();
        assert_eq!(source, grouped);
        assert_eq!(result.summary(), tree.summary());
    }

    #[test]
    fn resource_group_duration_saturates() {
        let mut builder = TreeBuilder::new(record("0", "Project"));
        let root = builder.root();
        for (id, name) in [("1", "A"), ("2", "B")] {
            builder
                .add_child(
                    root,
                    record(id, name)
                        .with_resource("alice")
                        .with_duration(1e308)
                        .unwrap(),
                )
                .unwrap();
        }

        let result = resource_tree(&builder.build()).unwrap();
        let alice = result.get(&TaskId::resource_group("alice")).unwrap();
        assert_eq!(alice.record().duration(), f64::MAX);
        assert_eq!(alice.children().len(), 2);
    }

    #[test]
    fn resource_tree_of_resource_tree_is_stable() {
        let once = resource_tree(&work_tree()).unwrap();
        let twice = resource_tree(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unassigned_label_is_configurable() {
        let result = resource_tree_with_label(&work_tree(), "nobody").unwrap();
        let group = result.get(&TaskId::unassigned_group()).unwrap();
        assert_eq!(group.record().name(), "nobody");
    }

    #[test]
    fn resource_tree_of_bare_tree_is_bare() {
        let tree = TreeBuilder::new(record("0", "root")).build();
        assert!(resource_tree(&tree).unwrap().is_bare());
    }
}
