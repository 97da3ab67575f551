// File: ./src/model/group.rs
// Tag/project/context views over a parsed document.
use crate::model::item::{Task, flatten};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortTags {
    #[default]
    Alphabetic,
    Frequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GroupKind {
    #[strum(serialize = "tags", serialize = "tag")]
    Tag,
    #[strum(serialize = "projects", serialize = "project")]
    Project,
    #[strum(serialize = "contexts", serialize = "context")]
    Context,
}

impl GroupKind {
    fn names(self, task: &Task) -> Vec<&str> {
        match self {
            GroupKind::Tag => task.tag_names(),
            GroupKind::Project => task.project_names(),
            GroupKind::Context => task.context_names(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub line_indices: Vec<usize>,
}

/// Drops hidden tasks and tasks whose threshold has not been reached.
/// A dropped task takes its children with it.
pub fn visible_tasks(tasks: &[Task], now: NaiveDateTime) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.is_visible(now))
        .map(|t| {
            let mut kept = t.clone();
            kept.children = visible_tasks(&t.children, now);
            kept
        })
        .collect()
}

pub fn group_by(tasks: &[Task], kind: GroupKind, order: SortTags) -> Vec<Group> {
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for task in flatten(tasks) {
        for name in kind.names(task) {
            by_name.entry(name).or_default().push(task.line_index);
        }
    }

    let mut groups: Vec<Group> = by_name
        .into_iter()
        .map(|(name, line_indices)| Group {
            name: name.to_string(),
            line_indices,
        })
        .collect();

    match order {
        SortTags::Alphabetic => groups.sort_by(|a, b| a.name.cmp(&b.name)),
        SortTags::Frequency => groups.sort_by(|a, b| {
            b.line_indices
                .len()
                .cmp(&a.line_indices.len())
                .then_with(|| a.name.cmp(&b.name))
        }),
    }
    groups
}
