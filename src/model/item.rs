// File: ./src/model/item.rs
use crate::model::due::{DueSpec, DueState};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

/// Half-open byte range into `Task::raw_text`. Always on char boundaries.
pub type Span = Range<usize>;

/// A parsed value together with the exact source range it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub range: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, range: Span) -> Self {
        Self { value, range }
    }
}

// --- PRIORITY ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Priority(char);

impl Priority {
    pub const HIGHEST: Priority = Priority('A');
    pub const LOWEST: Priority = Priority('Z');

    pub fn new(letter: char) -> Option<Self> {
        letter.is_ascii_uppercase().then_some(Self(letter))
    }

    pub fn letter(self) -> char {
        self.0
    }

    /// Positive `delta` raises the priority (towards `A`), negative lowers it.
    /// Clamped to `A..=Z`.
    pub fn shifted(self, delta: i8) -> Self {
        let current = i16::from(self.0 as u8 - b'A');
        let idx = (current - i16::from(delta)).clamp(0, 25);
        Self((b'A' + idx as u8) as char)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::LOWEST
    }
}

impl TryFrom<char> for Priority {
    type Error = String;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Self::new(c).ok_or_else(|| format!("priority must be a letter A-Z, got '{}'", c))
    }
}

impl From<Priority> for char {
    fn from(p: Priority) -> Self {
        p.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- ATTRIBUTES ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub value: String,
    pub scheme: String,
    pub range: Span,
}

/// Completion counter (`{count:2/5}`). Replaces the boolean done flag:
/// the task is done once `current` reaches `needed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub current: u32,
    pub needed: u32,
    pub range: Span,
}

impl Count {
    pub fn is_complete(&self) -> bool {
        self.current >= self.needed
    }
}

/// A `{key:value}` attribute with an identifier this crate does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttribute {
    pub key: String,
    pub value: Option<String>,
    pub range: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialAttributes {
    /// `{cr:...}`
    pub creation: Option<Spanned<NaiveDateTime>>,
    /// `{cm}` or `{cm:...}`
    pub completion: Option<Spanned<Option<NaiveDateTime>>>,
    /// `{t:...}` / `{threshold:...}`
    pub threshold: Option<Spanned<NaiveDate>>,
    pub is_hidden: bool,
    pub hidden_range: Option<Span>,
    pub count: Option<Count>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<RawAttribute>,
}

// --- DIAGNOSTICS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum DiagnosticKind {
    MalformedAttribute,
    AmbiguousMarker,
    InconsistentIndentation,
    OverlappingRanges,
}

/// A recoverable problem found while parsing a line. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub range: Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, range: Option<Span>) -> Self {
        Self {
            kind,
            message: message.into(),
            range,
        }
    }
}

// --- TASK ---

/// One parsed line. Created fresh on every parse and never mutated afterwards:
/// edits go through the source text (see `crate::edit`) and a re-parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub raw_text: String,
    pub line_index: usize,
    pub done: bool,
    pub done_range: Option<Span>,
    pub priority: Priority,
    pub priority_range: Option<Span>,
    pub tags: Vec<Spanned<String>>,
    pub projects: Vec<Spanned<String>>,
    pub contexts: Vec<Spanned<String>>,
    pub links: Vec<Link>,
    pub special: SpecialAttributes,
    pub due: Option<DueSpec>,
    /// The whole `{due:...}` attribute.
    pub due_range: Option<Span>,
    /// Only the value part, for in-place replacement.
    pub due_value_range: Option<Span>,
    /// A due attribute whose value did not parse. It stays in the title.
    pub invalid_due: Option<Spanned<String>>,
    /// Leading whitespace width in columns.
    pub indent: usize,
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Task {
    /// A task with no attributes at all, `title` being the whole trimmed line.
    pub fn plain(raw_text: &str, line_index: usize, default_priority: Priority) -> Self {
        Self {
            title: raw_text.split_whitespace().collect::<Vec<_>>().join(" "),
            raw_text: raw_text.to_string(),
            line_index,
            done: false,
            done_range: None,
            priority: default_priority,
            priority_range: None,
            tags: Vec::new(),
            projects: Vec::new(),
            contexts: Vec::new(),
            links: Vec::new(),
            special: SpecialAttributes::default(),
            due: None,
            due_range: None,
            due_value_range: None,
            invalid_due: None,
            indent: 0,
            depth: 0,
            children: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// The priority only if the line actually carries a marker.
    pub fn explicit_priority(&self) -> Option<Priority> {
        self.priority_range.as_ref().map(|_| self.priority)
    }

    pub fn tag_names(&self) -> Vec<&str> {
        unique_values(&self.tags)
    }

    pub fn project_names(&self) -> Vec<&str> {
        unique_values(&self.projects)
    }

    pub fn context_names(&self) -> Vec<&str> {
        unique_values(&self.contexts)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.value == tag)
    }

    pub fn has_project(&self, project: &str) -> bool {
        self.projects.iter().any(|p| p.value == project)
    }

    pub fn has_context(&self, context: &str) -> bool {
        self.contexts.iter().any(|c| c.value == context)
    }

    pub fn is_recurring(&self) -> bool {
        self.due.as_ref().is_some_and(DueSpec::is_recurring)
    }

    /// `None` when the line has no due attribute, `Some(Invalid)` when it has
    /// one that failed to parse.
    pub fn due_state(&self, now: NaiveDateTime) -> Option<DueState> {
        match (&self.due, &self.invalid_due) {
            (Some(due), _) => Some(due.classify(now)),
            (None, Some(_)) => Some(DueState::Invalid),
            (None, None) => None,
        }
    }

    pub fn creation_date(&self) -> Option<NaiveDateTime> {
        self.special.creation.as_ref().map(|c| c.value)
    }

    pub fn completion_date(&self) -> Option<NaiveDateTime> {
        self.special.completion.as_ref().and_then(|c| c.value)
    }

    /// Hidden tasks and tasks whose threshold lies in the future are not shown.
    pub fn is_visible(&self, now: NaiveDateTime) -> bool {
        if self.special.is_hidden {
            return false;
        }
        match &self.special.threshold {
            Some(t) => t.value <= now.date(),
            None => true,
        }
    }

    /// Every range the builder consumed, in source order.
    pub fn attribute_ranges(&self) -> Vec<Span> {
        let mut ranges: Vec<Span> = Vec::new();
        ranges.extend(self.done_range.clone());
        ranges.extend(self.priority_range.clone());
        ranges.extend(self.tags.iter().map(|t| t.range.clone()));
        ranges.extend(self.projects.iter().map(|p| p.range.clone()));
        ranges.extend(self.contexts.iter().map(|c| c.range.clone()));
        ranges.extend(self.links.iter().map(|l| l.range.clone()));
        ranges.extend(self.due_range.clone());
        let special = &self.special;
        ranges.extend(special.creation.as_ref().map(|c| c.range.clone()));
        ranges.extend(special.completion.as_ref().map(|c| c.range.clone()));
        ranges.extend(special.threshold.as_ref().map(|t| t.range.clone()));
        ranges.extend(special.hidden_range.clone());
        ranges.extend(special.count.as_ref().map(|c| c.range.clone()));
        ranges.extend(special.other.iter().map(|o| o.range.clone()));
        ranges.sort_by_key(|r| r.start);
        ranges
    }

    /// This line followed by every nested line, in document order.
    pub fn raw_text_with_children(&self) -> String {
        let mut lines = Vec::new();
        self.collect_raw_lines(&mut lines);
        lines.join("\n")
    }

    fn collect_raw_lines<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.raw_text);
        for child in &self.children {
            child.collect_raw_lines(out);
        }
    }
}

fn unique_values(items: &[Spanned<String>]) -> Vec<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|s| s.value.as_str())
        .filter(|v| seen.insert(*v))
        .collect()
}

/// Pre-order walk over a forest of tasks.
pub fn flatten(tasks: &[Task]) -> Vec<&Task> {
    fn walk<'a>(task: &'a Task, out: &mut Vec<&'a Task>) {
        out.push(task);
        for child in &task.children {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    for task in tasks {
        walk(task, &mut out);
    }
    out
}
