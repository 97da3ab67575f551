// File: src/model/parser.rs
use crate::model::due::{DueSpec, parse_date, parse_timestamp};
use crate::model::item::{
    Count, Diagnostic, DiagnosticKind, Link, Priority, RawAttribute, Span, Spanned, Task,
};
use crate::model::scanner::{Scanner, SyntaxToken, SyntaxType};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Columns a tab counts for when measuring indentation.
pub const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub done_symbol: String,
    pub default_priority: Priority,
    /// Extra URL schemes recognised as links, with or without `://`.
    pub link_schemes: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            done_symbol: "x".to_string(),
            default_priority: Priority::default(),
            link_schemes: Vec::new(),
        }
    }
}

/// Parses one line on its own. Nesting is handled by [`IndentStack`].
pub fn parse_line(
    raw: &str,
    line_index: usize,
    options: &ParseOptions,
    now: NaiveDateTime,
) -> Task {
    let mut task = Task::plain(raw, line_index, options.default_priority);
    task.indent = indent_width(raw);
    let mut consumed: Vec<Span> = Vec::new();

    for token in Scanner::new(raw, options) {
        match token.kind {
            SyntaxType::Text => {}
            SyntaxType::Done => {
                task.done = true;
                task.done_range = Some(token.range.clone());
                consumed.push(token.range);
            }
            SyntaxType::Priority => {
                if let Some(p) = token.text.chars().next().and_then(Priority::new) {
                    task.priority = p;
                    task.priority_range = Some(token.range.clone());
                    consumed.push(token.range);
                }
            }
            SyntaxType::DuplicatePriority => {
                task.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::AmbiguousMarker,
                    format!("second priority marker '{}' ignored", token.text),
                    Some(token.range),
                ));
            }
            SyntaxType::Tag | SyntaxType::Project | SyntaxType::Context => {
                let name = Spanned::new(token.value.unwrap_or_default().to_string(), token.range.clone());
                match token.kind {
                    SyntaxType::Tag => task.tags.push(name),
                    SyntaxType::Project => task.projects.push(name),
                    _ => task.contexts.push(name),
                }
                consumed.push(token.range);
            }
            SyntaxType::Link => {
                let scheme = token.text.split("://").next().unwrap_or_default();
                task.links.push(Link {
                    value: token.text.to_string(),
                    scheme: scheme.to_ascii_lowercase(),
                    range: token.range.clone(),
                });
                consumed.push(token.range);
            }
            SyntaxType::Due => {
                if apply_due(&mut task, &token, now) {
                    consumed.push(token.range);
                }
            }
            SyntaxType::Special => {
                if apply_special(&mut task, &token) {
                    consumed.push(token.range);
                }
            }
        }
    }

    if let Some(pair) = find_overlap(&mut consumed) {
        return overlap_fallback(raw, line_index, options, pair);
    }

    task.title = strip_ranges(raw, &consumed);
    if task.special.completion.is_some()
        || task.special.count.as_ref().is_some_and(Count::is_complete)
    {
        task.done = true;
    }

    for d in &task.diagnostics {
        log::debug!("Line {}: {} {}", line_index, d.kind, d.message);
    }
    task
}

/// Sorts `ranges` by start and returns the first pair that overlaps.
pub(crate) fn find_overlap(ranges: &mut [Span]) -> Option<(Span, Span)> {
    ranges.sort_by_key(|r| r.start);
    ranges
        .windows(2)
        .find(|w| w[0].end > w[1].start)
        .map(|w| (w[0].clone(), w[1].clone()))
}

/// The whole trimmed line as title, no attributes.
pub(crate) fn overlap_fallback(
    raw: &str,
    line_index: usize,
    options: &ParseOptions,
    (first, second): (Span, Span),
) -> Task {
    log::warn!(
        "Line {}: overlapping attributes at {:?} and {:?}, keeping line as plain text",
        line_index,
        first,
        second
    );
    let mut plain = Task::plain(raw, line_index, options.default_priority);
    plain.indent = indent_width(raw);
    plain.diagnostics.push(Diagnostic::new(
        DiagnosticKind::OverlappingRanges,
        "attribute ranges overlap",
        Some(first.start..second.end.max(first.end)),
    ));
    plain
}

/// Returns whether the token was consumed.
fn apply_due(task: &mut Task, token: &SyntaxToken, now: NaiveDateTime) -> bool {
    if task.due.is_some() || task.invalid_due.is_some() {
        task.diagnostics.push(Diagnostic::new(
            DiagnosticKind::AmbiguousMarker,
            "more than one due attribute, first one wins",
            Some(token.range.clone()),
        ));
        return false;
    }
    let value = token.value.unwrap_or_default();
    match DueSpec::parse(value, now) {
        Ok(due) => {
            task.due = Some(due);
            task.due_range = Some(token.range.clone());
            task.due_value_range = token.value_range.clone();
            true
        }
        Err(e) => {
            task.invalid_due = Some(Spanned::new(value.to_string(), token.range.clone()));
            task.diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedAttribute,
                e.to_string(),
                Some(token.range.clone()),
            ));
            false
        }
    }
}

/// Returns whether the token was consumed.
fn apply_special(task: &mut Task, token: &SyntaxToken) -> bool {
    let key = token.key.unwrap_or_default();
    let range = token.range.clone();
    let special = &mut task.special;

    let already_set = match key {
        "cr" => special.creation.is_some(),
        "cm" => special.completion.is_some(),
        "t" | "threshold" => special.threshold.is_some(),
        "h" | "hidden" => special.is_hidden,
        "count" => special.count.is_some(),
        _ => false,
    };
    if already_set {
        task.diagnostics.push(Diagnostic::new(
            DiagnosticKind::AmbiguousMarker,
            format!("duplicate '{}' attribute ignored", key),
            Some(range),
        ));
        return false;
    }

    let result: Result<(), String> = match (key, token.value) {
        ("cr", Some(v)) => parse_timestamp(v)
            .map(|stamp| special.creation = Some(Spanned::new(stamp, range.clone())))
            .map_err(|e| e.to_string()),
        ("cm", None) => {
            special.completion = Some(Spanned::new(None, range.clone()));
            Ok(())
        }
        ("cm", Some(v)) => parse_timestamp(v)
            .map(|stamp| special.completion = Some(Spanned::new(Some(stamp), range.clone())))
            .map_err(|e| e.to_string()),
        ("t" | "threshold", Some(v)) => parse_date(v.trim())
            .map(|date| special.threshold = Some(Spanned::new(date, range.clone())))
            .map_err(|e| e.to_string()),
        ("h" | "hidden", _) => {
            special.is_hidden = true;
            special.hidden_range = Some(range.clone());
            Ok(())
        }
        ("count", Some(v)) => parse_count(v)
            .map(|(current, needed)| {
                special.count = Some(Count {
                    current,
                    needed,
                    range: range.clone(),
                })
            })
            .ok_or_else(|| format!("invalid count '{}'", v)),
        ("cr" | "t" | "threshold" | "count", None) => Err(format!("'{}' needs a value", key)),
        (other, value) => {
            special.other.push(RawAttribute {
                key: other.to_string(),
                value: value.map(str::to_string),
                range: range.clone(),
            });
            Ok(())
        }
    };

    match result {
        Ok(()) => true,
        Err(message) => {
            task.diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedAttribute,
                message,
                Some(range),
            ));
            false
        }
    }
}

/// `C/N` with `N >= 1`.
fn parse_count(value: &str) -> Option<(u32, u32)> {
    let (current, needed) = value.trim().split_once('/')?;
    let current: u32 = current.trim().parse().ok()?;
    let needed: u32 = needed.trim().parse().ok()?;
    (needed >= 1).then_some((current, needed))
}

/// Leading whitespace width in columns.
pub fn indent_width(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Removes `ranges` from `raw` back to front and collapses the leftover
/// whitespace. The ranges must not overlap.
pub fn strip_ranges(raw: &str, ranges: &[Span]) -> String {
    let mut sorted: Vec<&Span> = ranges.iter().collect();
    sorted.sort_by(|a, b| b.start.cmp(&a.start));
    let mut text = raw.to_string();
    for r in sorted {
        if r.end <= text.len() && text.is_char_boundary(r.start) && text.is_char_boundary(r.end) {
            text.replace_range(r.clone(), " ");
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- DOCUMENT ---

/// Threads nesting state through consecutive lines. A line becomes a child
/// of the nearest open line with strictly smaller indentation.
#[derive(Debug, Default)]
pub struct IndentStack {
    open: Vec<Task>,
    roots: Vec<Task>,
}

impl IndentStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut task: Task) {
        let mut last_closed = None;
        while self.open.last().is_some_and(|top| top.indent >= task.indent) {
            last_closed = self.open.last().map(|t| t.indent);
            self.close_top();
        }
        if let Some(closed) = last_closed
            && closed != task.indent
        {
            task.diagnostics.push(Diagnostic::new(
                DiagnosticKind::InconsistentIndentation,
                format!(
                    "indent {} does not match the sibling indent {}",
                    task.indent, closed
                ),
                None,
            ));
            log::debug!("Line {}: inconsistent indentation", task.line_index);
        }
        task.depth = self.open.len();
        self.open.push(task);
    }

    fn close_top(&mut self) {
        if let Some(task) = self.open.pop() {
            match self.open.last_mut() {
                Some(parent) => parent.children.push(task),
                None => self.roots.push(task),
            }
        }
    }

    pub fn finish(mut self) -> Vec<Task> {
        while !self.open.is_empty() {
            self.close_top();
        }
        self.roots
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Top-level tasks, each owning its nested children.
    pub tasks: Vec<Task>,
    pub comment_lines: Vec<usize>,
}

impl Document {
    pub fn all_tasks(&self) -> Vec<&Task> {
        crate::model::item::flatten(&self.tasks)
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed == "#" || trimmed.starts_with("# ")
}

pub fn parse_document<S: AsRef<str>>(
    lines: &[S],
    options: &ParseOptions,
    now: NaiveDateTime,
) -> Document {
    let mut stack = IndentStack::new();
    let mut comment_lines = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_comment(trimmed) {
            comment_lines.push(index);
            continue;
        }
        stack.push(parse_line(line, index, options, now));
    }
    Document {
        tasks: stack.finish(),
        comment_lines,
    }
}

pub fn parse_text(text: &str, options: &ParseOptions, now: NaiveDateTime) -> Document {
    let lines: Vec<&str> = text.lines().collect();
    parse_document(&lines, options, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 12)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn parse(line: &str) -> Task {
        parse_line(line, 0, &ParseOptions::default(), now())
    }

    #[test]
    fn priority_tags_projects_contexts() {
        let task = parse("A walk the #dog +errands @outside");
        assert_eq!(task.priority.letter(), 'A');
        assert_eq!(task.title, "walk the");
        assert_eq!(task.tag_names(), vec!["dog"]);
        assert_eq!(task.project_names(), vec!["errands"]);
        assert_eq!(task.context_names(), vec!["outside"]);
        assert_eq!(task.tags[0].range, 11..15);
    }

    #[test]
    fn missing_priority_uses_default() {
        let options = ParseOptions {
            default_priority: Priority::new('C').unwrap(),
            ..ParseOptions::default()
        };
        let task = parse_line("plain", 0, &options, now());
        assert_eq!(task.priority.letter(), 'C');
        assert_eq!(task.explicit_priority(), None);
    }

    #[test]
    fn done_marker_and_completion_attribute() {
        let task = parse("x buy milk {cm:2023-01-11}");
        assert!(task.done);
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.done_range, Some(0..2));
        assert_eq!(
            task.completion_date(),
            NaiveDate::from_ymd_opt(2023, 1, 11).unwrap().and_hms_opt(0, 0, 0)
        );

        let by_attr = parse("buy milk {cm}");
        assert!(by_attr.done);
        assert_eq!(by_attr.completion_date(), None);
    }

    #[test]
    fn malformed_due_stays_in_title() {
        let task = parse("pay rent {due:someday}");
        assert!(task.due.is_none());
        assert_eq!(task.title, "pay rent {due:someday}");
        assert_eq!(task.diagnostics[0].kind, DiagnosticKind::MalformedAttribute);
        assert_eq!(task.invalid_due.as_ref().map(|d| d.value.as_str()), Some("someday"));
    }

    #[test]
    fn due_value_range_points_at_value() {
        let raw = "pay {due:2023-01-10|e1m} now";
        let task = parse(raw);
        assert_eq!(task.title, "pay now");
        assert_eq!(&raw[task.due_value_range.clone().unwrap()], "2023-01-10|e1m");
        assert_eq!(&raw[task.due_range.clone().unwrap()], "{due:2023-01-10|e1m}");
    }

    #[test]
    fn second_due_is_ambiguous() {
        let task = parse("a {due:2023-01-10} {due:2023-02-10}");
        assert_eq!(task.due.as_ref().map(|d| d.date().to_string()).as_deref(), Some("2023-01-10"));
        assert_eq!(task.title, "a {due:2023-02-10}");
        assert_eq!(task.diagnostics[0].kind, DiagnosticKind::AmbiguousMarker);
    }

    #[test]
    fn special_attributes() {
        let task = parse("stretch {cr:2023-01-01T08:15} {t:2023-01-20} {h} {count:2/5} {foo:bar}");
        assert_eq!(task.title, "stretch");
        assert!(task.creation_date().is_some());
        assert!(task.special.is_hidden);
        assert_eq!(
            task.special.threshold.as_ref().map(|t| t.value),
            NaiveDate::from_ymd_opt(2023, 1, 20)
        );
        let count = task.special.count.as_ref().unwrap();
        assert_eq!((count.current, count.needed), (2, 5));
        assert!(!task.done);
        assert_eq!(task.special.other[0].key, "foo");
        assert_eq!(task.special.other[0].value.as_deref(), Some("bar"));
    }

    #[test]
    fn complete_count_marks_done() {
        assert!(parse("pushups {count:5/5}").done);
        let bad = parse("pushups {count:5/0}");
        assert!(bad.special.count.is_none());
        assert_eq!(bad.title, "pushups {count:5/0}");
    }

    #[test]
    fn stripping_ranges_reproduces_title() {
        for line in [
            "A walk the #dog +errands @outside",
            "x B review https://example.com/a#b {due:2023-01-10} notes",
            "  mixed #a middle +b {unknown} tail @c",
        ] {
            let task = parse(line);
            assert_eq!(strip_ranges(line, &task.attribute_ranges()), task.title);
        }
    }

    #[test]
    fn overlapping_ranges_fall_back_to_plain_line() {
        let mut disjoint = vec![8..12, 0..3, 3..7];
        assert_eq!(find_overlap(&mut disjoint), None);

        let raw = "  #a #ab {due:2023-01-10} text";
        let mut ranges = vec![9..25, 2..8, 5..9];
        let pair = find_overlap(&mut ranges).unwrap();
        assert_eq!(pair, (2..8, 5..9));

        let task = overlap_fallback(raw, 4, &ParseOptions::default(), pair);
        assert_eq!(task.title, "#a #ab {due:2023-01-10} text");
        assert_eq!(task.line_index, 4);
        assert_eq!(task.indent, 2);
        assert!(task.tags.is_empty());
        assert!(task.due.is_none());
        assert_eq!(task.diagnostics.len(), 1);
        assert_eq!(task.diagnostics[0].kind, DiagnosticKind::OverlappingRanges);
        assert_eq!(task.diagnostics[0].range, Some(2..9));
    }

    #[test]
    fn nesting_by_indentation() {
        let doc = parse_document(&["Parent", "\tChild"], &ParseOptions::default(), now());
        assert_eq!(doc.tasks.len(), 1);
        let parent = &doc.tasks[0];
        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].title, "Child");
        assert_eq!(parent.children[0].depth, 1);
    }

    #[test]
    fn inconsistent_indent_attaches_to_nearest_ancestor() {
        let lines = ["root", "        deep", "  shallow"];
        let doc = parse_document(&lines, &ParseOptions::default(), now());
        let root = &doc.tasks[0];
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].title, "shallow");
        assert_eq!(
            root.children[1].diagnostics[0].kind,
            DiagnosticKind::InconsistentIndentation
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let doc = parse_text("# Heading\n\nfirst\n  child\n\n  sibling\n", &ParseOptions::default(), now());
        assert_eq!(doc.comment_lines, vec![0]);
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.tasks[0].children.len(), 2);
        assert_eq!(doc.tasks[0].children[1].line_index, 5);
    }
}
