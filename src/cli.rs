// File: ./src/cli.rs
//! Command-line front end: argument parsing, file reading and printing.
use crate::config::Config;
use crate::context::StandardContext;
use crate::model::display::{TaskDisplay, title_column_width};
use crate::model::{
    Document, DueState, GroupKind, Query, SortProperty, Task, filter_tasks, flatten, group_by,
    parse_text, sort_by, sort_default, visible_tasks,
};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use strum::IntoEnumIterator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List {
        file: PathBuf,
        filter: Option<String>,
        sort: Option<SortProperty>,
        json: bool,
        all: bool,
    },
    Next {
        file: PathBuf,
    },
    Groups {
        file: PathBuf,
        kind: GroupKind,
    },
    Check {
        file: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub root: Option<PathBuf>,
    /// Number of `-v` flags.
    pub verbosity: u8,
}

/// `args` excludes the binary name.
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut root = None;
    let mut verbosity = 0u8;
    let mut filter = None;
    let mut sort = None;
    let mut json = false;
    let mut all = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => {
                return Ok(CliArgs {
                    command: Command::Help,
                    root,
                    verbosity,
                });
            }
            "-v" => verbosity = verbosity.saturating_add(1),
            "-vv" => verbosity = verbosity.saturating_add(2),
            "-r" | "--root" => {
                let value = iter.next().context("--root needs a directory")?;
                root = Some(PathBuf::from(value));
            }
            "-f" | "--filter" => {
                filter = Some(iter.next().context("--filter needs a query")?.clone());
            }
            "-s" | "--sort" => {
                let value = iter.next().context("--sort needs a property")?;
                sort = Some(SortProperty::from_str(value).map_err(|_| {
                    anyhow::anyhow!(
                        "Unknown sort property '{}' (expected one of: {})",
                        value,
                        sort_property_names()
                    )
                })?);
            }
            "--json" => json = true,
            "-a" | "--all" => all = true,
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(anyhow::anyhow!("Unknown option '{}'", other));
            }
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        [] => Command::Help,
        [name, file] => {
            let file = PathBuf::from(*file);
            match *name {
                "list" => Command::List {
                    file,
                    filter,
                    sort,
                    json,
                    all,
                },
                "next" => Command::Next { file },
                "check" => Command::Check { file },
                group => Command::Groups {
                    file,
                    kind: GroupKind::from_str(group)
                        .map_err(|_| anyhow::anyhow!("Unknown command '{}'", group))?,
                },
            }
        }
        [name] => return Err(anyhow::anyhow!("'{}' needs a todo file", name)),
        _ => return Err(anyhow::anyhow!("Too many arguments")),
    };

    Ok(CliArgs {
        command,
        root,
        verbosity,
    })
}

/// Loads config and the todo file, then prints the command's output.
/// Returns `false` when the command should exit with a failure status.
pub fn run(args: &CliArgs, now: NaiveDateTime, out: &mut dyn Write) -> Result<bool> {
    let file = match &args.command {
        Command::Help => {
            print_help(out)?;
            return Ok(true);
        }
        Command::List { file, .. }
        | Command::Next { file }
        | Command::Groups { file, .. }
        | Command::Check { file } => file,
    };

    let ctx = StandardContext::new(args.root.clone());
    let config = Config::load_or_default(&ctx)?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read todo file '{}'", file.display()))?;
    let doc = parse_text(&text, &config.parse_options(), now);
    log::info!(
        "Parsed {} tasks from {}",
        doc.all_tasks().len(),
        file.display()
    );

    execute(&args.command, &config, &doc, now, out)
}

/// Renders a command over an already parsed document.
pub fn execute(
    command: &Command,
    config: &Config,
    doc: &Document,
    now: NaiveDateTime,
    out: &mut dyn Write,
) -> Result<bool> {
    match command {
        Command::Help => print_help(out)?,
        Command::List {
            filter,
            sort,
            json,
            all,
            ..
        } => {
            let tasks = if *all {
                doc.tasks.clone()
            } else {
                visible_tasks(&doc.tasks, now)
            };
            let query_text = filter
                .as_deref()
                .map(|f| config.saved_filter(f).map_or(f, |saved| saved.filter.as_str()))
                .unwrap_or_default();
            let query = Query::parse(query_text);

            let selected = if query.is_empty() && sort.is_none() {
                flatten(&tasks)
            } else {
                let matched = filter_tasks(&tasks, &query, now);
                match sort {
                    Some(p) => sort_by(matched, *p),
                    None => sort_default(matched, now),
                }
            };

            if *json {
                let rows: Vec<TaskRow> = selected.iter().map(|t| TaskRow::new(t, now)).collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
            } else {
                print_tasks(&selected, now, out)?;
            }
        }
        Command::Next { .. } => {
            let visible = visible_tasks(&doc.tasks, now);
            let pending: Vec<&Task> = flatten(&visible).into_iter().filter(|t| !t.done).collect();
            let mut next = sort_default(pending, now);
            next.truncate(config.next_tasks_count);
            print_tasks(&next, now, out)?;
        }
        Command::Groups { kind, .. } => {
            let visible = visible_tasks(&doc.tasks, now);
            for group in group_by(&visible, *kind, config.sort_tags_view) {
                writeln!(out, "{} ({})", group.name, group.line_indices.len())?;
            }
        }
        Command::Check { .. } => {
            let mut clean = true;
            for task in doc.all_tasks() {
                for d in &task.diagnostics {
                    clean = false;
                    writeln!(out, "line {}: {}: {}", task.line_index + 1, d.kind, d.message)?;
                }
            }
            return Ok(clean);
        }
    }
    Ok(true)
}

fn print_tasks(tasks: &[&Task], now: NaiveDateTime, out: &mut dyn Write) -> Result<()> {
    let width = title_column_width(tasks.iter().copied());
    for task in tasks {
        writeln!(out, "{}", task.list_line(now, width))?;
    }
    Ok(())
}

/// Flat JSON view of a task for `list --json`.
#[derive(Debug, Serialize)]
struct TaskRow<'a> {
    line: usize,
    title: &'a str,
    done: bool,
    priority: Option<char>,
    due: Option<String>,
    due_state: Option<DueState>,
    tags: Vec<&'a str>,
    projects: Vec<&'a str>,
    contexts: Vec<&'a str>,
    depth: usize,
}

impl<'a> TaskRow<'a> {
    fn new(task: &'a Task, now: NaiveDateTime) -> Self {
        Self {
            line: task.line_index + 1,
            title: &task.title,
            done: task.done,
            priority: task.explicit_priority().map(|p| p.letter()),
            due: task
                .due
                .as_ref()
                .map(|d| d.to_string())
                .or_else(|| task.invalid_due.as_ref().map(|d| d.value.clone())),
            due_state: task.due_state(now),
            tags: task.tag_names(),
            projects: task.project_names(),
            contexts: task.context_names(),
            depth: task.depth,
        }
    }
}

fn sort_property_names() -> String {
    SortProperty::iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn group_command_names() -> String {
    GroupKind::iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

pub fn print_help(out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "todomd v{} - query plain-text todo files",
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;
    writeln!(out, "USAGE:")?;
    writeln!(out, "    todomd list <file> [--filter <query>] [--sort <property>] [--json] [--all]")?;
    writeln!(out, "    todomd next <file>")?;
    writeln!(out, "    todomd {} <file>", group_command_names())?;
    writeln!(out, "    todomd check <file>")?;
    writeln!(out)?;
    writeln!(out, "OPTIONS:")?;
    writeln!(out, "    -f, --filter <query>  Filter query, or the title of a saved filter.")?;
    writeln!(out, "    -s, --sort <prop>     {}.", sort_property_names())?;
    writeln!(out, "    -a, --all             Include hidden tasks and future thresholds.")?;
    writeln!(out, "        --json            Print JSON instead of a table.")?;
    writeln!(out, "    -r, --root <path>     Use a different directory for the config.")?;
    writeln!(out, "    -v, -vv               More logging on stderr.")?;
    writeln!(out, "    -h, --help            Show this help message.")?;
    writeln!(out)?;
    writeln!(out, "LINE SYNTAX:")?;
    writeln!(out, "    x                     Done marker (first word)")?;
    writeln!(out, "    A-Z                   Priority (first word after the marker)")?;
    writeln!(out, "    #tag +project @ctx    Tags, projects, contexts")?;
    writeln!(out, "    {{due:2025-01-16}}      Due date, also T14:30, |e3d, |mon,fri, +2d, fri")?;
    writeln!(out, "    {{cr:..}} {{cm:..}}       Creation and completion dates")?;
    writeln!(out, "    {{t:..}} {{h}}            Threshold date, hidden")?;
    writeln!(out, "    {{count:2/5}}           Counter instead of a done marker")?;
    writeln!(out)?;
    writeln!(out, "FILTER SYNTAX:")?;
    writeln!(out, "    word \"a phrase\"       Title contains (case-insensitive)")?;
    writeln!(out, "    #tag +project @ctx    Exact membership")?;
    writeln!(out, "    DUE OVERDUE NOTDUE    Due state; also INVALID and DONE")?;
    writeln!(out, "    $A                    Priority")?;
    writeln!(out, "    !term  a | b  (..)    Not, or, grouping; spaces mean and")?;
    Ok(())
}
