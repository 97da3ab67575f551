// File: ./src/model/sort.rs
use crate::model::due::DueState;
use crate::model::item::Task;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use strum::{EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, EnumIter, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SortProperty {
    Priority,
    DueDate,
    CreationDate,
    CompletionDate,
    Title,
}

/// Present values first, in ascending order; missing values last.
fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Task {
    /// Due state rank, then due instant, then explicit priority, then line order.
    pub fn compare_default(&self, other: &Self, now: NaiveDateTime) -> Ordering {
        let r1 = DueState::rank(self.due_state(now));
        let r2 = DueState::rank(other.due_state(now));

        r1.cmp(&r2)
            .then_with(|| {
                none_last(
                    self.due.as_ref().map(|d| d.comparison_time()),
                    other.due.as_ref().map(|d| d.comparison_time()),
                )
            })
            .then_with(|| none_last(self.explicit_priority(), other.explicit_priority()))
            .then(self.line_index.cmp(&other.line_index))
    }

    pub fn compare_by(&self, other: &Self, property: SortProperty) -> Ordering {
        let primary = match property {
            SortProperty::Priority => {
                none_last(self.explicit_priority(), other.explicit_priority())
            }
            SortProperty::DueDate => none_last(
                self.due.as_ref().map(|d| d.comparison_time()),
                other.due.as_ref().map(|d| d.comparison_time()),
            ),
            SortProperty::CreationDate => none_last(self.creation_date(), other.creation_date()),
            SortProperty::CompletionDate => {
                none_last(self.completion_date(), other.completion_date())
            }
            SortProperty::Title => self.title.to_lowercase().cmp(&other.title.to_lowercase()),
        };
        primary.then(self.line_index.cmp(&other.line_index))
    }
}

/// Stable; sorting an already sorted sequence returns it unchanged.
pub fn sort_default<T: Borrow<Task>>(mut tasks: Vec<T>, now: NaiveDateTime) -> Vec<T> {
    tasks.sort_by(|a, b| a.borrow().compare_default(b.borrow(), now));
    tasks
}

pub fn sort_by<T: Borrow<Task>>(mut tasks: Vec<T>, property: SortProperty) -> Vec<T> {
    tasks.sort_by(|a, b| a.borrow().compare_by(b.borrow(), property));
    tasks
}

/// Reorders top-level tasks, each one carrying its nested lines along, and
/// returns the resulting text.
pub fn sort_top_level(tasks: &[Task], property: Option<SortProperty>, now: NaiveDateTime) -> String {
    let refs: Vec<&Task> = tasks.iter().collect();
    let sorted = match property {
        Some(p) => sort_by(refs, p),
        None => sort_default(refs, now),
    };
    sorted
        .iter()
        .map(|t| t.raw_text_with_children())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parser::{ParseOptions, parse_document, parse_text};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 12)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn titles<T: Borrow<Task>>(tasks: &[T]) -> Vec<&str> {
        tasks.iter().map(|t| t.borrow().title.as_str()).collect()
    }

    #[test]
    fn default_order_buckets_then_dates_then_priority() {
        let lines = [
            "none",
            "B later {due:2023-03-01}",
            "A soon {due:2023-01-20}",
            "bad {due:nope}",
            "old {due:2023-01-01}",
            "C today {due:2023-01-12}",
            "A today {due:2023-01-12}",
            "older {due:2022-12-01}",
        ];
        let doc = parse_document(&lines, &ParseOptions::default(), now());
        let sorted = sort_default(doc.all_tasks(), now());
        assert_eq!(
            titles(&sorted),
            vec![
                "older",
                "old",
                "today",
                "today",
                "soon",
                "later",
                "bad {due:nope}",
                "none"
            ]
        );
        assert_eq!(sorted[2].priority.letter(), 'A');
    }

    #[test]
    fn default_sort_is_idempotent() {
        let doc = parse_text(
            "b {due:2023-01-15}\na\nB c\nA d {due:2023-01-15}",
            &ParseOptions::default(),
            now(),
        );
        let once = sort_default(doc.all_tasks(), now());
        let twice = sort_default(once.clone(), now());
        assert_eq!(titles(&once), titles(&twice));
    }

    #[test]
    fn sort_by_puts_missing_last() {
        let doc = parse_text(
            "one {cr:2023-01-05}\ntwo\nthree {cr:2023-01-01}",
            &ParseOptions::default(),
            now(),
        );
        let sorted = sort_by(doc.all_tasks(), SortProperty::CreationDate);
        assert_eq!(titles(&sorted), vec!["three", "one", "two"]);

        let by_title = sort_by(doc.all_tasks(), SortProperty::Title);
        assert_eq!(titles(&by_title), vec!["one", "three", "two"]);
    }

    #[test]
    fn equal_keys_keep_line_order() {
        let doc = parse_text("C x\nC y\nC z", &ParseOptions::default(), now());
        let sorted = sort_by(doc.all_tasks(), SortProperty::Priority);
        assert_eq!(titles(&sorted), vec!["x", "y", "z"]);
    }

    #[test]
    fn top_level_sort_moves_children_along() {
        let text = "B second\n  child of second\nA first";
        let doc = parse_text(text, &ParseOptions::default(), now());
        let out = sort_top_level(&doc.tasks, Some(SortProperty::Priority), now());
        assert_eq!(out, "A first\nB second\n  child of second");
    }

    #[test]
    fn property_names_parse() {
        assert_eq!(SortProperty::from_str("due-date").unwrap(), SortProperty::DueDate);
        assert_eq!(SortProperty::from_str("Priority").unwrap(), SortProperty::Priority);
        assert_eq!(SortProperty::CompletionDate.to_string(), "completion-date");
    }
}
