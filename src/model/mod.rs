// File: ./src/model/mod.rs
pub mod display;
pub mod due;
pub mod group;
pub mod item;
pub mod matcher;
pub mod parser;
pub mod recurrence;
pub mod scanner;
pub mod sort;

pub use due::{DueKind, DueParseError, DueSpec, DueState, RecurrencePattern, classify_value};
pub use group::{Group, GroupKind, SortTags, group_by, visible_tasks};
pub use item::{
    Count, Diagnostic, DiagnosticKind, Link, Priority, RawAttribute, Span, Spanned,
    SpecialAttributes, Task, flatten,
};
pub use matcher::{Query, evaluate, filter_tasks};
pub use parser::{Document, IndentStack, ParseOptions, parse_document, parse_line, parse_text};
pub use recurrence::RecurrenceEngine;
pub use sort::{SortProperty, sort_by, sort_default, sort_top_level};
