// File: ./src/edit.rs
// Builds text edits for common task actions. Nothing here touches a document:
// callers apply the returned edits to the line and re-parse it.
use crate::model::due::{DueParseError, apply_offset, format_timestamp, parse_weekday};
use crate::model::{Document, DueSpec, Priority, RecurrenceEngine, Span, Task};
use chrono::{Datelike, Days, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Replace `range` of line `line_index` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub line_index: usize,
    pub range: Span,
    pub replacement: String,
}

impl TextEdit {
    fn replace(task: &Task, range: Span, replacement: impl Into<String>) -> Self {
        Self {
            line_index: task.line_index,
            range,
            replacement: replacement.into(),
        }
    }

    fn insert(task: &Task, at: usize, text: impl Into<String>) -> Self {
        Self::replace(task, at..at, text)
    }

    /// Deletes an attribute together with one neighbouring space.
    fn remove(task: &Task, range: Span) -> Self {
        let raw = task.raw_text.as_str();
        let after_done = task.done_range.as_ref().is_some_and(|d| d.end == range.start);
        let widened = if !after_done && raw[..range.start].ends_with(' ') {
            range.start - 1..range.end
        } else if raw[range.end..].starts_with(' ') {
            range.start..range.end + 1
        } else {
            range
        };
        Self::replace(task, widened, "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOptions {
    pub done_symbol: String,
    pub default_priority: Priority,
    pub add_completion_date: bool,
    pub completion_date_include_time: bool,
    pub add_creation_date: bool,
    pub creation_date_include_time: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            done_symbol: "x".to_string(),
            default_priority: Priority::default(),
            add_completion_date: true,
            completion_date_include_time: false,
            add_creation_date: false,
            creation_date_include_time: false,
        }
    }
}

/// Applies edits made against `raw` (one line). Edits must not overlap.
pub fn apply_edits(raw: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    let mut text = raw.to_string();
    for edit in sorted {
        if edit.range.end <= text.len() {
            text.replace_range(edit.range.clone(), &edit.replacement);
        }
    }
    text
}

/// Offset of the first non-whitespace character.
fn head_offset(task: &Task) -> usize {
    let raw = &task.raw_text;
    raw.len() - raw.trim_start().len()
}

fn append(task: &Task, text: &str) -> TextEdit {
    let end = task.raw_text.trim_end().len();
    TextEdit::replace(task, end..task.raw_text.len(), format!(" {}", text))
}

fn completion_attribute(now: NaiveDateTime, options: &EditOptions) -> String {
    format!(
        "{{cm:{}}}",
        format_timestamp(now, options.completion_date_include_time)
    )
}

/// Undone tasks get the marker (and `{cm:...}` if configured). Tasks with an
/// unfinished counter are incremented instead. Done tasks are reopened.
pub fn toggle_done(task: &Task, now: NaiveDateTime, options: &EditOptions) -> Vec<TextEdit> {
    let mut edits = Vec::new();

    if task.done {
        if let Some(range) = &task.done_range {
            edits.push(TextEdit::replace(task, range.clone(), ""));
        }
        if let Some(cm) = &task.special.completion {
            edits.push(TextEdit::remove(task, cm.range.clone()));
        }
        if let Some(count) = &task.special.count {
            edits.push(TextEdit::replace(
                task,
                count.range.clone(),
                format!("{{count:0/{}}}", count.needed),
            ));
        }
        return edits;
    }

    if let Some(count) = &task.special.count {
        let current = count.current + 1;
        edits.push(TextEdit::replace(
            task,
            count.range.clone(),
            format!("{{count:{}/{}}}", current, count.needed),
        ));
        if current >= count.needed && options.add_completion_date {
            edits.push(append(task, &completion_attribute(now, options)));
        }
        return edits;
    }

    edits.push(TextEdit::insert(
        task,
        head_offset(task),
        format!("{} ", options.done_symbol),
    ));
    if options.add_completion_date {
        edits.push(append(task, &completion_attribute(now, options)));
    }
    edits
}

/// Reopens a done recurring task and moves its due date to the next
/// occurrence after the completion moment (`{cm:...}`, or `now`).
pub fn reset_recurring(task: &Task, now: NaiveDateTime) -> Vec<TextEdit> {
    let (Some(due), Some(value_range)) = (&task.due, &task.due_value_range) else {
        return Vec::new();
    };
    if !task.done || !due.is_recurring() {
        return Vec::new();
    }
    let completed_at = task.completion_date().unwrap_or(now);
    let Some(next) = RecurrenceEngine::advance(due, completed_at) else {
        return Vec::new();
    };
    log::debug!(
        "Line {}: recurring due {} -> {}",
        task.line_index,
        due,
        next
    );

    let mut edits = vec![TextEdit::replace(task, value_range.clone(), next.to_string())];
    if let Some(range) = &task.done_range {
        edits.push(TextEdit::replace(task, range.clone(), ""));
    }
    if let Some(cm) = &task.special.completion {
        edits.push(TextEdit::remove(task, cm.range.clone()));
    }
    if let Some(count) = &task.special.count {
        edits.push(TextEdit::replace(
            task,
            count.range.clone(),
            format!("{{count:0/{}}}", count.needed),
        ));
    }
    edits
}

/// Every done recurring task in `doc`, reset once per day. Nothing happens when
/// `last_visit` already falls on today's date.
pub fn reset_all_recurring(
    doc: &Document,
    last_visit: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Vec<TextEdit> {
    if last_visit.is_some_and(|visit| visit.date() >= now.date()) {
        return Vec::new();
    }
    let edits: Vec<TextEdit> = doc
        .all_tasks()
        .into_iter()
        .flat_map(|task| reset_recurring(task, now))
        .collect();
    log::debug!("Reset recurring tasks: {} edits", edits.len());
    edits
}

/// Comments a line out with `# ` after its indentation, or uncomments it.
pub fn toggle_comment(raw: &str, line_index: usize) -> TextEdit {
    let at = raw.len() - raw.trim_start().len();
    let body = &raw[at..];
    let (range, replacement) = if body.starts_with("# ") {
        (at..at + 2, "")
    } else if body == "#" {
        (at..at + 1, "")
    } else {
        (at..at, "# ")
    };
    TextEdit {
        line_index,
        range,
        replacement: replacement.to_string(),
    }
}

/// A new line at the same indentation carrying the task's tags, projects and
/// contexts.
pub fn similar_task_line(task: &Task) -> String {
    let indent = &task.raw_text[..task.raw_text.len() - task.raw_text.trim_start().len()];
    let names: Vec<String> = task
        .tag_names()
        .into_iter()
        .map(|t| format!("#{}", t))
        .chain(task.project_names().into_iter().map(|p| format!("+{}", p)))
        .chain(task.context_names().into_iter().map(|c| format!("@{}", c)))
        .collect();
    format!("{}{}", indent, names.join(" "))
}

/// Replaces the due value in place, or appends a new due attribute.
pub fn set_due(task: &Task, value: &str) -> Vec<TextEdit> {
    if let Some(range) = &task.due_value_range {
        return vec![TextEdit::replace(task, range.clone(), value)];
    }
    if let Some(invalid) = &task.invalid_due {
        return vec![TextEdit::replace(
            task,
            invalid.range.clone(),
            format!("{{due:{}}}", value),
        )];
    }
    vec![append(task, &format!("{{due:{}}}", value))]
}

pub fn remove_due(task: &Task) -> Vec<TextEdit> {
    task.due_range
        .clone()
        .or_else(|| task.invalid_due.as_ref().map(|d| d.range.clone()))
        .map(|range| vec![TextEdit::remove(task, range)])
        .unwrap_or_default()
}

/// Positive `delta` raises priority. A task without a marker starts from the
/// configured default.
pub fn shift_priority(task: &Task, delta: i8, options: &EditOptions) -> Vec<TextEdit> {
    match &task.priority_range {
        Some(range) => {
            let next = task.priority.shifted(delta);
            if next == task.priority {
                return Vec::new();
            }
            vec![TextEdit::replace(task, range.clone(), next.to_string())]
        }
        None => {
            let next = options.default_priority.shifted(delta);
            let at = task
                .done_range
                .as_ref()
                .map(|r| r.end)
                .unwrap_or_else(|| head_offset(task));
            vec![TextEdit::insert(task, at, format!("{} ", next))]
        }
    }
}

pub fn hide(task: &Task) -> Vec<TextEdit> {
    if task.special.is_hidden {
        return Vec::new();
    }
    vec![append(task, "{h}")]
}

/// Resolves the quick input of a "set due date" prompt into a value to store:
/// `+N`/`-N` days, `+Nd|w|m|y`, a weekday name (its next occurrence after
/// today), or anything the due grammar accepts as is.
pub fn due_helper(input: &str, now: NaiveDateTime) -> Result<String, DueParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DueParseError::Empty);
    }
    let today = now.date();
    let bad_offset = || DueParseError::BadOffset(input.to_string());

    if let Some(days) = input.strip_prefix('-') {
        let n: u64 = days
            .strip_suffix(['d', 'D'])
            .unwrap_or(days)
            .parse()
            .map_err(|_| bad_offset())?;
        let date = today.checked_sub_days(Days::new(n)).ok_or_else(bad_offset)?;
        return Ok(date.format("%Y-%m-%d").to_string());
    }

    if let Some(offset) = input.strip_prefix('+') {
        let date = if offset.chars().all(|c| c.is_ascii_digit()) {
            let n: u64 = offset.parse().map_err(|_| bad_offset())?;
            today.checked_add_days(Days::new(n))
        } else {
            apply_offset(today, offset)
        };
        return date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(bad_offset);
    }

    if let Some(day) = parse_weekday(input) {
        let date = today
            .iter_days()
            .skip(1)
            .take(7)
            .find(|d| d.weekday() == day)
            .ok_or_else(|| DueParseError::BadRecurrence(input.to_string()))?;
        return Ok(date.format("%Y-%m-%d").to_string());
    }

    DueSpec::parse(input, now).map(|spec| spec.to_string())
}

/// A fresh task line, stamped with `{cr:...}` when configured.
pub fn new_task_line(title: &str, now: NaiveDateTime, options: &EditOptions) -> String {
    let title = title.trim();
    if options.add_creation_date {
        format!(
            "{} {{cr:{}}}",
            title,
            format_timestamp(now, options.creation_date_include_time)
        )
    } else {
        title.to_string()
    }
}
