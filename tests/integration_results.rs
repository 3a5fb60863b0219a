use tempfile::tempdir;
use typemaster::config::{Settings, TestMode};
use typemaster::results::{LocalResultSink, ResultSink, ResultsDb};
use typemaster::session::{Session, TestResult};
use typemaster::text::TestText;

fn complete_run(prompt: &str, miss_first: bool) -> TestResult {
    let config = Settings {
        test_mode: TestMode::Words,
        test_value: prompt.split_whitespace().count().max(1),
        ..Settings::default()
    };
    let mut session = Session::new(TestText::new(prompt).unwrap(), config);
    for (i, c) in prompt.chars().enumerate() {
        if i == 0 && miss_first {
            session.handle_char(if c == 'z' { 'a' } else { 'z' });
            session.handle_backspace();
        }
        session.handle_char(c);
    }
    session.result().unwrap().clone()
}

#[test]
fn full_pipeline_from_keystrokes_to_stored_row() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("results.db");
    let mut sink = LocalResultSink::with_paths(&db_path, dir.path().join("log.csv"));

    let outcome = sink.submit(&complete_run("hello world", true));
    assert!(outcome.accepted);
    assert!(outcome.is_personal_best);
    assert_eq!(outcome.rank, Some(1));

    let db = sink.db().unwrap();
    assert_eq!(db.tests_completed().unwrap(), 1);
    // The corrected first-character miss made it into the lifetime heatmap.
    assert_eq!(db.error_heatmap(1).unwrap(), vec![('h', 1)]);
}

#[test]
fn reopened_database_keeps_history() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("results.db");

    {
        let mut sink = LocalResultSink::with_paths(&db_path, dir.path().join("log.csv"));
        sink.submit(&complete_run("abc def", false));
        sink.submit(&complete_run("abc def", true));
    }

    let db = ResultsDb::open(&db_path).unwrap();
    assert_eq!(db.tests_completed().unwrap(), 2);
    assert!(db.personal_best().unwrap().is_some());
}

#[test]
fn achievements_never_repeat_across_sessions() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("results.db");
    let log_path = dir.path().join("log.csv");

    let first = {
        let mut sink = LocalResultSink::with_paths(&db_path, &log_path);
        sink.submit(&complete_run("hello world", false))
    };
    assert!(!first.new_achievements.is_empty());

    // A fresh sink over the same store must not re-award anything the first
    // run already earned.
    let mut sink = LocalResultSink::with_paths(&db_path, &log_path);
    let second = sink.submit(&complete_run("hello world", false));
    for achievement in &second.new_achievements {
        assert!(!first.new_achievements.contains(achievement));
    }
}

#[test]
fn csv_log_lines_match_submissions() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("log.csv");
    let mut sink = LocalResultSink::with_paths(dir.path().join("results.db"), &log_path);

    for _ in 0..3 {
        sink.submit(&complete_run("abc", false));
    }

    let log = std::fs::read_to_string(&log_path).unwrap();
    // One header plus one row per run.
    assert_eq!(log.lines().count(), 4);
}
