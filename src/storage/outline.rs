//! Outline format for project plans
//!
//! A plan is a line-based outline. Nesting is explicit: a record ending in
//! `{` opens a group, a line holding only `}` closes it. Indentation is
//! ignored.
//!
//! ```text
//! @title Website Relaunch
//! # Lines starting with '#' are comments
//! Design {
//!   Wireframes | milestone=WS1 | resource=alice | duration=3
//!   [x] Style guide | resource=bob | duration=1.5d
//! }
//! Completed Work {
//!   Kickoff | id=kickoff
//! }
//! Milestones {
//!   WS1
//! }
//! Resources {
//!   alice
//!   bob
//! }
//! ```
//!
//! Records are `[checkbox] name [| key=value]...` with the keys `id`,
//! `milestone`, `resource` and `duration`. Records without an `id` get
//! their outline position (`1.2`) as ID; the synthetic root is `0`.
//!
//! Top-level groups named like a configured grouping are metadata:
//! everything inside a completed grouping is done, and the direct children
//! of the milestone and resource groupings declare the plan's tags.
//!
//! Parsing is fail-fast. The first malformed line aborts the parse and no
//! tree is returned.

use thiserror::Error;

use super::config::{GroupingKind, ProjectConfig};
use crate::domain::{
    Groupings, IdError, NodeHandle, RecordError, TaskId, TaskRecord, TaskTree, TreeBuilder,
    TreeError,
};

/// A malformed line in a plan
#[derive(Debug, Error, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number of the offending line
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("group is never closed")]
    UnterminatedGroup,

    #[error("'}}' does not close any group")]
    UnexpectedClose,

    #[error("record has no name")]
    MissingName,

    #[error("braces are only allowed as a trailing '{{' or a lone '}}'")]
    StrayBrace,

    #[error("field '{0}' is not of the form key=value")]
    MalformedField(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{0}' is given more than once")]
    DuplicateField(String),

    #[error("field '{0}' has no value")]
    EmptyValue(String),

    #[error("invalid duration '{0}': expected a non-negative number of days")]
    InvalidDuration(String),

    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error("duplicate task ID '{0}'")]
    DuplicateId(TaskId),

    #[error("unknown directive '{0}'")]
    UnknownDirective(String),

    #[error("the title is already set")]
    DuplicateTitle,

    #[error("directives must come before the first record")]
    DirectiveAfterRecords,
}

impl ParseError {
    fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

/// One record line, before it is placed in the tree
#[derive(Debug, Default)]
struct RawRecord<'a> {
    name: &'a str,
    id: Option<TaskId>,
    milestone: Option<&'a str>,
    resource: Option<&'a str>,
    duration: Option<f64>,
    checked: bool,
    opens_group: bool,
}

const FIELDS: [&str; 4] = ["id", "milestone", "resource", "duration"];

/// Parses a plan with the default configuration
pub fn parse(text: &str) -> Result<TaskTree, ParseError> {
    parse_with(text, &ProjectConfig::default())
}

/// Parses a plan
pub fn parse_with(text: &str, config: &ProjectConfig) -> Result<TaskTree, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
        .peekable();

    let mut title: Option<(usize, &str)> = None;
    while let Some((line, directive)) = lines.next_if(|(_, l)| l.starts_with('@')) {
        let name = parse_title(directive).map_err(|kind| ParseError::new(line, kind))?;
        if title.replace((line, name)).is_some() {
            return Err(ParseError::new(line, ParseErrorKind::DuplicateTitle));
        }
    }

    let (title_line, root_name) = title.unwrap_or((1, config.root_name.as_str()));
    let root = TaskRecord::new(TaskId::root(), root_name)
        .map_err(|_| ParseError::new(title_line, ParseErrorKind::MissingName))?;

    let mut outline = Outline::new(root, config);
    for (line, content) in lines {
        outline.line = line;
        outline
            .feed(content)
            .map_err(|kind| ParseError::new(line, kind))?;
    }

    let tree = outline.finish()?;
    warn_undeclared_tags(&tree);
    tracing::debug!(
        nodes = tree.len(),
        milestones = tree.catalog().milestones().len(),
        resources = tree.catalog().resources().len(),
        "parsed outline"
    );
    Ok(tree)
}

/// Parses `@title <name>`
fn parse_title(line: &str) -> Result<&str, ParseErrorKind> {
    let (directive, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    if directive != "@title" {
        return Err(ParseErrorKind::UnknownDirective(directive.to_string()));
    }

    let name = rest.trim();
    if name.is_empty() {
        return Err(ParseErrorKind::MissingName);
    }
    Ok(name)
}

/// Parses one record line (already trimmed, not a comment)
fn parse_record(line: &str) -> Result<RawRecord<'_>, ParseErrorKind> {
    let mut record = RawRecord::default();

    let body = match line.strip_suffix('{') {
        Some(rest) => {
            record.opens_group = true;
            rest.trim_end()
        }
        None => line,
    };
    if body.contains(['{', '}']) {
        return Err(ParseErrorKind::StrayBrace);
    }

    let body = if let Some(rest) = body.strip_prefix("[x]").or_else(|| body.strip_prefix("[X]")) {
        record.checked = true;
        rest
    } else {
        body.strip_prefix("[ ]").unwrap_or(body)
    };

    let mut segments = body.split('|');
    record.name = segments.next().unwrap_or_default().trim();
    if record.name.is_empty() {
        return Err(ParseErrorKind::MissingName);
    }

    let mut seen: Vec<&str> = Vec::new();
    for segment in segments {
        let segment = segment.trim();
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| ParseErrorKind::MalformedField(segment.to_string()))?;
        let (key, value) = (key.trim(), value.trim());

        if !FIELDS.contains(&key) {
            return Err(ParseErrorKind::UnknownField(key.to_string()));
        }
        if seen.contains(&key) {
            return Err(ParseErrorKind::DuplicateField(key.to_string()));
        }
        seen.push(key);

        if value.is_empty() {
            return Err(ParseErrorKind::EmptyValue(key.to_string()));
        }

        match key {
            "id" => record.id = Some(TaskId::named(value)?),
            "milestone" => record.milestone = Some(value),
            "resource" => record.resource = Some(value),
            _ => record.duration = Some(parse_duration(value)?),
        }
    }

    Ok(record)
}

/// Parses `3`, `1.5` or `2d` as a number of working days
fn parse_duration(value: &str) -> Result<f64, ParseErrorKind> {
    let number = value.strip_suffix('d').unwrap_or(value).trim();
    match number.parse::<f64>() {
        Ok(days) if days.is_finite() && days >= 0.0 => Ok(days),
        _ => Err(ParseErrorKind::InvalidDuration(value.to_string())),
    }
}

/// An open group on the nesting stack
struct Frame {
    handle: NodeHandle,
    /// Line that opened the group (0 for the root)
    line: usize,
    path: Vec<u32>,
    children: u32,
    grouping: Option<GroupingKind>,
    /// Everything below this group is done
    completed_scope: bool,
}

/// Tree under construction
struct Outline<'c> {
    config: &'c ProjectConfig,
    builder: TreeBuilder,
    stack: Vec<Frame>,
    groupings: Groupings,
    /// Line currently being fed
    line: usize,
}

impl<'c> Outline<'c> {
    fn new(root: TaskRecord, config: &'c ProjectConfig) -> Self {
        let builder = TreeBuilder::new(root);
        let root = Frame {
            handle: builder.root(),
            line: 0,
            path: Vec::new(),
            children: 0,
            grouping: None,
            completed_scope: false,
        };

        Self {
            config,
            builder,
            stack: vec![root],
            groupings: Groupings::default(),
            line: 0,
        }
    }

    fn feed(&mut self, content: &str) -> Result<(), ParseErrorKind> {
        if content.starts_with('@') {
            return Err(match parse_title(content) {
                Ok(_) => ParseErrorKind::DirectiveAfterRecords,
                Err(kind) => kind,
            });
        }

        if content == "}" {
            if self.stack.len() == 1 {
                return Err(ParseErrorKind::UnexpectedClose);
            }
            self.stack.pop();
            return Ok(());
        }

        let raw = parse_record(content)?;
        self.add(raw)
    }

    fn add(&mut self, raw: RawRecord<'_>) -> Result<(), ParseErrorKind> {
        let top_level = self.stack.len() == 1;
        let parent = self.stack.last_mut().ok_or(ParseErrorKind::UnexpectedClose)?;
        parent.children += 1;

        let mut path = parent.path.clone();
        path.push(parent.children);
        let parent_handle = parent.handle;
        let parent_grouping = parent.grouping;
        let completed_scope = parent.completed_scope;

        match parent_grouping {
            Some(GroupingKind::Milestones) => {
                self.builder.catalog_mut().add_milestone(raw.name);
            }
            Some(GroupingKind::Resources) => {
                self.builder.catalog_mut().add_resource(raw.name);
            }
            _ => {}
        }

        let id = raw.id.unwrap_or_else(|| TaskId::outline(path.clone()));
        let mut record = TaskRecord::new(id.clone(), raw.name)
            .map_err(|_| ParseErrorKind::MissingName)?
            .with_completed(raw.checked || completed_scope);
        if let Some(milestone) = raw.milestone {
            record = record.with_milestone(milestone);
        }
        if let Some(resource) = raw.resource {
            record = record.with_resource(resource);
        }
        if let Some(days) = raw.duration {
            record = record.with_duration(days).map_err(|e| match e {
                RecordError::InvalidDuration(d) => ParseErrorKind::InvalidDuration(d.to_string()),
                RecordError::EmptyName => ParseErrorKind::MissingName,
            })?;
        }

        let handle = self
            .builder
            .add_child(parent_handle, record)
            .map_err(|e| match e {
                TreeError::DuplicateId(id) => ParseErrorKind::DuplicateId(id),
                TreeError::UnknownParent => ParseErrorKind::UnexpectedClose,
            })?;

        let grouping = if top_level {
            self.config.groupings.kind_of(raw.name)
        } else {
            None
        };
        if let Some(kind) = grouping {
            tracing::debug!(?kind, id = %id, "found metadata grouping");
            let slot = match kind {
                GroupingKind::Completed => &mut self.groupings.completed,
                GroupingKind::Milestones => &mut self.groupings.milestones,
                GroupingKind::Resources => &mut self.groupings.resources,
            };
            slot.get_or_insert(id);
        }

        if raw.opens_group {
            self.stack.push(Frame {
                handle,
                line: self.line,
                path,
                children: 0,
                grouping,
                completed_scope: completed_scope || grouping == Some(GroupingKind::Completed),
            });
        }

        Ok(())
    }

    fn finish(mut self) -> Result<TaskTree, ParseError> {
        if self.stack.len() > 1 {
            let line = self.stack.last().map(|frame| frame.line).unwrap_or_default();
            return Err(ParseError::new(line, ParseErrorKind::UnterminatedGroup));
        }

        let groupings = std::mem::take(&mut self.groupings);
        self.builder.set_groupings(groupings);
        Ok(self.builder.build())
    }
}

/// Logs tags that a non-empty catalog does not declare
fn warn_undeclared_tags(tree: &TaskTree) {
    let catalog = tree.catalog();
    for node in tree.walk() {
        let record = node.record();
        if let Some(milestone) = record.milestone() {
            if !catalog.milestones().is_empty() && !catalog.milestones().iter().any(|m| m == milestone) {
                tracing::warn!(id = %record.id(), milestone, "milestone is not declared");
            }
        }
        if let Some(resource) = record.resource() {
            if !catalog.resources().is_empty() && !catalog.resources().iter().any(|r| r == resource) {
                tracing::warn!(id = %record.id(), resource, "resource is not declared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::config::GroupingConfig;

    const PLAN: &str = r#"
@title Website Relaunch

# Active work
Design {
  Wireframes | milestone=WS1 | resource=alice | duration=3
  [x] Style guide | resource=bob | duration=1.5d
}
Build | id=build | milestone=WS2 {
  Parser | resource=bob
}
Completed Work {
  Kickoff | id=kickoff
  Research {
    Interviews
  }
}
Milestones {
  WS1
  WS2
}
Resources {
  alice
  bob
}
"#;

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn err(text: &str) -> ParseError {
        parse(text).unwrap_err()
    }

    #[test]
    fn parses_structure_in_source_order() {
        let tree = parse(PLAN).unwrap();

        assert_eq!(tree.root().record().name(), "Website Relaunch");
        let top: Vec<_> = tree.root().children().map(|n| n.record().name()).collect();
        assert_eq!(
            top,
            vec!["Design", "Build", "Completed Work", "Milestones", "Resources"]
        );

        let design = tree.get(&id("1")).unwrap();
        let children: Vec<_> = design.children().map(|n| n.record().name()).collect();
        assert_eq!(children, vec!["Wireframes", "Style guide"]);
    }

    #[test]
    fn parses_fields() {
        let tree = parse(PLAN).unwrap();

        let wireframes = tree.get(&id("1.1")).unwrap().record();
        assert_eq!(wireframes.milestone(), Some("WS1"));
        assert_eq!(wireframes.resource(), Some("alice"));
        assert_eq!(wireframes.duration(), 3.0);
        assert!(!wireframes.is_completed());

        let style = tree.get(&id("1.2")).unwrap().record();
        assert!(style.is_completed());
        assert_eq!(style.duration(), 1.5);
    }

    #[test]
    fn explicit_ids_are_kept_and_children_use_their_position() {
        let tree = parse(PLAN).unwrap();

        let build = tree.get(&id("build")).unwrap();
        assert_eq!(build.record().milestone(), Some("WS2"));
        assert_eq!(build.children().next().unwrap().id(), &id("2.1"));
        assert!(tree.get(&id("2")).is_none());
    }

    #[test]
    fn completed_grouping_marks_all_descendants() {
        let tree = parse(PLAN).unwrap();

        assert!(tree.get(&id("kickoff")).unwrap().record().is_completed());
        assert!(tree.get(&id("3.2")).unwrap().record().is_completed());
        assert!(tree.get(&id("3.2.1")).unwrap().record().is_completed());
        assert!(!tree.get(&id("3")).unwrap().record().is_completed());
        assert_eq!(tree.groupings().completed, Some(id("3")));
    }

    #[test]
    fn nested_grouping_names_are_ordinary_tasks() {
        let tree = parse("Phase {\n  Completed Work {\n    Task\n  }\n}\n").unwrap();

        assert!(!tree.get(&id("1.1.1")).unwrap().record().is_completed());
        assert!(tree.groupings().completed.is_none());
    }

    #[test]
    fn catalogs_are_seeded_from_metadata_groupings() {
        let tree = parse(PLAN).unwrap();

        assert_eq!(tree.catalog().milestones(), &["WS1", "WS2"]);
        assert_eq!(tree.catalog().resources(), &["alice", "bob"]);
        assert_eq!(tree.groupings().milestones, Some(id("4")));
        assert_eq!(tree.groupings().resources, Some(id("5")));
    }

    #[test]
    fn grouping_names_are_configurable() {
        let config = ProjectConfig {
            groupings: GroupingConfig {
                completed: vec!["Done".to_string()],
                ..GroupingConfig::default()
            },
            ..ProjectConfig::default()
        };
        let tree = parse_with("done {\n  Ship\n}\nCompleted Work {\n  Other\n}\n", &config).unwrap();

        assert!(tree.get(&id("1.1")).unwrap().record().is_completed());
        assert!(!tree.get(&id("2.1")).unwrap().record().is_completed());
    }

    #[test]
    fn index_covers_every_node() {
        let tree = parse(PLAN).unwrap();

        assert_eq!(tree.index_len(), tree.walk().count());
        for node in tree.walk() {
            assert!(tree.get(node.id()).is_some());
        }
    }

    #[test]
    fn empty_document_is_a_bare_root() {
        let tree = parse("\n# nothing here\n\n").unwrap();

        assert!(tree.is_bare());
        assert_eq!(tree.root().record().name(), "Project");
        assert_eq!(tree.root().id(), &TaskId::root());
    }

    #[test]
    fn root_name_comes_from_config_without_title() {
        let config = ProjectConfig {
            root_name: "Roadmap".to_string(),
            ..ProjectConfig::default()
        };
        let tree = parse_with("Task\n", &config).unwrap();
        assert_eq!(tree.root().record().name(), "Roadmap");
    }

    #[test]
    fn unterminated_group_reports_its_opening_line() {
        let e = err("Design {\n  Wireframes\nBuild {\n  Parser\n}\n");
        assert_eq!(e, ParseError::new(1, ParseErrorKind::UnterminatedGroup));
        assert_eq!(e.to_string(), "line 1: group is never closed");
    }

    #[test]
    fn innermost_unterminated_group_is_reported() {
        let e = err("A {\n\n  B {\n    C\n");
        assert_eq!(e, ParseError::new(3, ParseErrorKind::UnterminatedGroup));
    }

    #[test]
    fn stray_close_is_rejected() {
        assert_eq!(
            err("Task\n}\n"),
            ParseError::new(2, ParseErrorKind::UnexpectedClose)
        );
    }

    #[test]
    fn line_numbers_count_blank_and_comment_lines() {
        let e = err("# header\n\nTask | owner=bob\n");
        assert_eq!(e.line, 3);
        assert_eq!(e.kind, ParseErrorKind::UnknownField("owner".to_string()));
    }

    #[test]
    fn malformed_records_are_rejected() {
        assert_eq!(err("| resource=bob\n").kind, ParseErrorKind::MissingName);
        assert_eq!(err("[x]\n").kind, ParseErrorKind::MissingName);
        assert_eq!(
            err("Task | bob\n").kind,
            ParseErrorKind::MalformedField("bob".to_string())
        );
        assert_eq!(
            err("Task | resource=a | resource=b\n").kind,
            ParseErrorKind::DuplicateField("resource".to_string())
        );
        assert_eq!(
            err("Task | milestone=\n").kind,
            ParseErrorKind::EmptyValue("milestone".to_string())
        );
        assert_eq!(err("Task { x }\n").kind, ParseErrorKind::StrayBrace);
        assert_eq!(err("Task {}\n").kind, ParseErrorKind::StrayBrace);
    }

    #[test]
    fn invalid_durations_are_rejected() {
        for value in ["-1", "soon", "NaN", "inf", "3w"] {
            let e = err(&format!("Task | duration={}\n", value));
            assert_eq!(e.kind, ParseErrorKind::InvalidDuration(value.to_string()));
        }
    }

    #[test]
    fn invalid_and_duplicate_ids_are_rejected() {
        assert!(matches!(
            err("Task | id=1.2\n").kind,
            ParseErrorKind::InvalidId(_)
        ));
        assert_eq!(
            err("A | id=same\nB | id=same\n"),
            ParseError::new(2, ParseErrorKind::DuplicateId(id("same")))
        );
    }

    #[test]
    fn directives_are_checked() {
        assert_eq!(
            err("@title A\n@title B\n"),
            ParseError::new(2, ParseErrorKind::DuplicateTitle)
        );
        assert_eq!(
            err("@owner bob\n").kind,
            ParseErrorKind::UnknownDirective("@owner".to_string())
        );
        assert_eq!(err("@title   \n").kind, ParseErrorKind::MissingName);
        assert_eq!(
            err("Task\n@title Late\n"),
            ParseError::new(2, ParseErrorKind::DirectiveAfterRecords)
        );
    }

    #[test]
    fn unchecked_box_is_accepted() {
        let tree = parse("[ ] Open task\n").unwrap();
        let record = tree.get(&id("1")).unwrap().record();
        assert_eq!(record.name(), "Open task");
        assert!(!record.is_completed());
    }

    #[test]
    fn declared_tags_are_not_counted_as_work() {
        let tree = parse("Work\nMilestones {\n  WS1\n  WS2\n}\nResources {\n  alice\n}\n").unwrap();
        assert_eq!(tree.summary().tasks, 1);
        assert_eq!(tree.catalog().milestones(), ["WS1", "WS2"]);
    }

    #[test]
    fn huge_durations_still_group_by_resource() {
        let tree = parse(
            "A | resource=alice | duration=1e308\nB | resource=alice | duration=1e308\n",
        )
        .unwrap();
        let grouped = crate::domain::resource_tree(&tree).unwrap();
        let alice = grouped.get(&TaskId::resource_group("alice")).unwrap();
        assert!(alice.record().duration().is_finite());
    }
}
