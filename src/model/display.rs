// File: ./src/model/display.rs
use crate::model::due::DueState;
use crate::model::item::Task;
use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

pub trait TaskDisplay {
    fn format_task(&self) -> String;
    fn checkbox_symbol(&self) -> &'static str;
    fn due_label(&self, now: NaiveDateTime) -> String;
    fn list_line(&self, now: NaiveDateTime, title_width: usize) -> String;
}

impl TaskDisplay for Task {
    /// Title, plus the counter when the task has one.
    fn format_task(&self) -> String {
        match &self.special.count {
            Some(count) => format!("{} {}/{}", self.title, count.current, count.needed),
            None => self.title.clone(),
        }
    }

    fn checkbox_symbol(&self) -> &'static str {
        if self.done {
            "[✔]"
        } else if self.special.count.as_ref().is_some_and(|c| c.current > 0) {
            "[‖]"
        } else {
            "[ ]"
        }
    }

    fn due_label(&self, now: NaiveDateTime) -> String {
        match (self.due_state(now), &self.due) {
            (Some(DueState::Invalid), _) => "invalid due".to_string(),
            (Some(state), Some(due)) => {
                let days = due.days_until(now);
                let mut label = match (state, days) {
                    (DueState::Overdue, 0) => "overdue".to_string(),
                    (DueState::Overdue, d) => format!("{}d overdue", -d),
                    (DueState::Due, _) => "due today".to_string(),
                    (_, 1) => "tomorrow".to_string(),
                    (_, d) => format!("in {}d", d),
                };
                if let Some(t) = due.time() {
                    label.push_str(&format!(" {}", t.format("%H:%M")));
                }
                if due.is_recurring() {
                    label.push_str(" ↻");
                }
                label
            }
            _ => String::new(),
        }
    }

    /// One aligned row for terminal listings, indented by depth.
    fn list_line(&self, now: NaiveDateTime, title_width: usize) -> String {
        let indent = "  ".repeat(self.depth);
        let priority = self
            .explicit_priority()
            .map(|p| format!("({})", p))
            .unwrap_or_else(|| "   ".to_string());
        let title = format!("{}{}", indent, self.format_task());
        let pad = title_width.saturating_sub(title.width());
        let mut line = format!(
            "{} {} {}{}",
            self.checkbox_symbol(),
            priority,
            title,
            " ".repeat(pad)
        );
        let due = self.due_label(now);
        if !due.is_empty() {
            line.push_str("  ");
            line.push_str(&due);
        }
        for tag in self.tag_names() {
            line.push_str(&format!(" #{}", tag));
        }
        line.trim_end().to_string()
    }
}

/// Widest `format_task` among `tasks`, including depth indentation.
pub fn title_column_width<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> usize {
    tasks
        .into_iter()
        .map(|t| t.depth * 2 + t.format_task().width())
        .max()
        .unwrap_or(0)
}
