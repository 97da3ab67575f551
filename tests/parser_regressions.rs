// File: tests/parser_regressions.rs
use chrono::{NaiveDate, NaiveDateTime};
use todomd::model::parser::strip_ranges;
use todomd::model::{DiagnosticKind, DueKind, ParseOptions, Task, parse_document, parse_line};

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
fn test_walk_the_dog() {
    let t = parse("A walk the #dog +errands @outside");
    assert_eq!(t.priority.letter(), 'A');
    assert_eq!(t.title, "walk the");
    assert_eq!(t.tag_names(), vec!["dog"]);
    assert_eq!(t.project_names(), vec!["errands"]);
    assert_eq!(t.context_names(), vec!["outside"]);
}

#[test]
fn test_parent_child_nesting() {
    let doc = parse_document(&["Parent", "\tChild"], &ParseOptions::default(), now());
    assert_eq!(doc.tasks.len(), 1);
    assert_eq!(doc.tasks[0].title, "Parent");
    assert_eq!(doc.tasks[0].depth, 0);
    assert_eq!(doc.tasks[0].children.len(), 1);
    assert_eq!(doc.tasks[0].children[0].title, "Child");
    assert_eq!(doc.tasks[0].children[0].depth, 1);
}

#[test]
fn test_count_controls_done() {
    let t = parse("read chapters {count:2/5}");
    let count = t.special.count.as_ref().unwrap();
    assert_eq!((count.current, count.needed), (2, 5));
    assert!(!t.done);
    assert!(parse("read chapters {count:5/5}").done);
}

#[test]
fn test_relative_due_resolves_at_parse_time() {
    let june = NaiveDate::from_ymd_opt(2023, 6, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let t = parse_line("pay {due:+2d}", 0, &ParseOptions::default(), june);
    let due = t.due.unwrap();
    assert_eq!(due.kind(), DueKind::Plain);
    assert_eq!(due.date(), NaiveDate::from_ymd_opt(2023, 6, 3).unwrap());
}

#[test]
fn test_parse_is_deterministic() {
    let line = "x B call #mom +family @phone https://a.b/c {due:2023-01-10|e1w} {cm:2023-01-11}";
    assert_eq!(parse(line), parse(line));
}

#[test]
fn test_ranges_point_at_their_source() {
    let line = "  C fix #bug in +core for @work see http://x.y/#z {due:2023-02-01T10:00}";
    let t = parse(line);
    assert_eq!(&line[t.priority_range.clone().unwrap()], "C");
    assert_eq!(&line[t.tags[0].range.clone()], "#bug");
    assert_eq!(&line[t.projects[0].range.clone()], "+core");
    assert_eq!(&line[t.contexts[0].range.clone()], "@work");
    assert_eq!(&line[t.links[0].range.clone()], "http://x.y/#z");
    assert_eq!(t.links[0].scheme, "http");
    assert_eq!(&line[t.due_range.clone().unwrap()], "{due:2023-02-01T10:00}");
    assert!(t.tags.len() == 1, "no tag inside the link");

    // Ranges never overlap.
    let ranges = t.attribute_ranges();
    assert!(ranges.windows(2).all(|w| w[0].end <= w[1].start));
}

#[test]
fn test_removing_ranges_gives_title() {
    for line in [
        "A walk the #dog +errands @outside",
        "x buy milk {cm:2023-01-11} #shop",
        "plain words only",
        "B  spaced   out  #t   words ",
        "weird {due:nope} stays",
        "héllo wörld #ümlaut @café",
        "A B second letter stays",
    ] {
        let t = parse(line);
        assert_eq!(strip_ranges(line, &t.attribute_ranges()), t.title, "line: {line}");
    }
}

#[test]
fn test_duplicate_tags_render_once() {
    let t = parse("a #x b #x c #y");
    assert_eq!(t.tag_names(), vec!["x", "y"]);
    assert_eq!(t.tags.len(), 3);
    assert_eq!(t.title, "a b c");
}

#[test]
fn test_duplicate_priority_is_recorded() {
    let t = parse("A B second letter stays");
    assert_eq!(t.priority.letter(), 'A');
    assert_eq!(t.title, "B second letter stays");
    assert_eq!(t.diagnostics[0].kind, DiagnosticKind::AmbiguousMarker);
}

#[test]
fn test_lowercase_and_midline_letters_are_not_priorities() {
    assert_eq!(parse("a task").explicit_priority(), None);
    assert_eq!(parse("task A").explicit_priority(), None);
    assert_eq!(parse("Apple pie").explicit_priority(), None);
}

#[test]
fn test_custom_done_symbol() {
    let options = ParseOptions {
        done_symbol: "✓".to_string(),
        ..ParseOptions::default()
    };
    let t = parse_line("✓ shipped", 0, &options, now());
    assert!(t.done);
    assert_eq!(t.title, "shipped");
    assert!(!parse_line("x shipped", 0, &options, now()).done);
}

#[test]
fn test_bad_line_does_not_break_document() {
    let lines = ["first {due:2023-99-99}", "second #ok", "{count:x/y} third"];
    let doc = parse_document(&lines, &ParseOptions::default(), now());
    assert_eq!(doc.tasks.len(), 3);
    assert!(doc.tasks[0].due.is_none());
    assert_eq!(doc.tasks[1].tag_names(), vec!["ok"]);
    assert_eq!(doc.tasks[2].title, "{count:x/y} third");
    assert_eq!(
        doc.tasks[2].diagnostics[0].kind,
        DiagnosticKind::MalformedAttribute
    );
}

#[test]
fn test_deep_nesting_and_dedent() {
    let lines = [
        "a",
        "    b",
        "        c",
        "    d",
        "e",
    ];
    let doc = parse_document(&lines, &ParseOptions::default(), now());
    assert_eq!(doc.tasks.len(), 2);
    let a = &doc.tasks[0];
    assert_eq!(a.children.len(), 2);
    assert_eq!(a.children[0].children[0].title, "c");
    assert_eq!(a.children[0].children[0].depth, 2);
    assert_eq!(a.children[1].title, "d");
    assert!(a.children[1].diagnostics.is_empty());
    assert_eq!(doc.tasks[1].title, "e");
    assert_eq!(a.raw_text_with_children(), "a\n    b\n        c\n    d");
}
