// File: tests/search_operators.rs
use chrono::{NaiveDate, NaiveDateTime};
use todomd::model::{ParseOptions, Query, Task, evaluate, filter_tasks, parse_line, parse_text};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 12)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn make_task(line: &str) -> Task {
    parse_line(line, 0, &ParseOptions::default(), now())
}

#[test]
fn test_empty_query_matches_all() {
    for line in ["", "x done", "A #t +p @c {due:2023-01-01}", "{due:nope}"] {
        assert!(evaluate(&make_task(line), "", now()));
    }
}

#[test]
fn test_negation_complements() {
    let queries = ["#x", "+p", "@c", "DUE", "OVERDUE", "NOTDUE", "word", "DONE", "$A"];
    let lines = [
        "A word #x +p @c {due:2023-01-12}",
        "x other {due:2023-01-01}",
        "B later {due:2023-02-01} #y",
        "plain",
    ];
    for line in lines {
        let t = make_task(line);
        for q in queries {
            let negated = format!("!{}", q);
            assert_eq!(
                evaluate(&t, &negated, now()),
                !evaluate(&t, q, now()),
                "{q} on {line}"
            );
        }
    }
}

#[test]
fn test_implicit_and() {
    let t = make_task("call mom #family @phone");
    assert!(evaluate(&t, "#family @phone", now()));
    assert!(evaluate(&t, "CALL mom", now()));
    assert!(!evaluate(&t, "#family @office", now()));
}

#[test]
fn test_or_and_grouping() {
    let home = make_task("clean #home");
    let work = make_task("report #work");
    let other = make_task("relax");

    let query = Query::parse("#home | #work");
    assert!(query.matches(&home, now()));
    assert!(query.matches(&work, now()));
    assert!(!query.matches(&other, now()));

    // OR binds looser than AND.
    assert!(evaluate(&home, "report #work | clean", now()));
    assert!(!evaluate(&home, "(report | relax) #home", now()));
    assert!(evaluate(&home, "!(#work | relax)", now()));
}

#[test]
fn test_due_state_terms_use_now() {
    let t = make_task("meet {due:2023-01-12T15:00}");
    let before = NaiveDate::from_ymd_opt(2023, 1, 12)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap();
    let after = NaiveDate::from_ymd_opt(2023, 1, 12)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap();
    assert!(evaluate(&t, "DUE", before));
    assert!(evaluate(&t, "OVERDUE", after));
    assert!(!evaluate(&make_task("no date"), "NOTDUE", now()));
}

#[test]
fn test_quoted_phrase() {
    let t = make_task("Buy the big red ball #toys");
    assert!(evaluate(&t, "\"big red\"", now()));
    assert!(!evaluate(&t, "\"red big\"", now()));
    assert!(evaluate(&t, "red big", now()));
}

#[test]
fn test_filter_tasks_over_tree() {
    let doc = parse_text(
        "project +alpha\n  step one +alpha #next\n  step two\nunrelated",
        &ParseOptions::default(),
        now(),
    );
    let hits = filter_tasks(&doc.tasks, &Query::parse("+alpha"), now());
    let titles: Vec<&str> = hits.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["project", "step one"]);

    let hits = filter_tasks(&doc.tasks, &Query::parse("step !#next"), now());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "step two");
}

#[test]
fn test_stray_closing_paren_does_not_drop_terms() {
    let t = make_task("walk the dog");
    assert!(!evaluate(&t, "walk ) zzz", now()));
    assert!(!evaluate(&t, "(walk | run)) #cat", now()));
    assert!(evaluate(&t, "(walk | run)) dog", now()));
}
