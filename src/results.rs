use crate::session::TestResult;
use chrono::Local;
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// A newly earned award, surfaced once on the results screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Achievement {
    pub name: &'static str,
    pub description: &'static str,
}

/// What the sink reports back after a submission. On any persistence failure
/// this is the rejected default; the completed-test UI state is authoritative
/// either way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubmitOutcome {
    pub accepted: bool,
    /// 1-based position of this run's WPM among all stored runs.
    pub rank: Option<u64>,
    pub new_achievements: Vec<Achievement>,
    pub is_personal_best: bool,
}

/// Persists a completed test. Best-effort and at-most-once: a failed
/// submission is absorbed, never retried, and never blocks the caller.
pub trait ResultSink {
    fn submit(&mut self, result: &TestResult) -> SubmitOutcome;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Requirement {
    Wpm,
    Accuracy,
    TestsCompleted,
}

struct AchievementRule {
    name: &'static str,
    description: &'static str,
    requirement: Requirement,
    threshold: f64,
}

// Threshold table, awarded at most once each.
const ACHIEVEMENT_RULES: &[AchievementRule] = &[
    AchievementRule {
        name: "Speedster",
        description: "Reach 40 WPM in a single test",
        requirement: Requirement::Wpm,
        threshold: 40.0,
    },
    AchievementRule {
        name: "Racer",
        description: "Reach 60 WPM in a single test",
        requirement: Requirement::Wpm,
        threshold: 60.0,
    },
    AchievementRule {
        name: "Speed Demon",
        description: "Reach 80 WPM in a single test",
        requirement: Requirement::Wpm,
        threshold: 80.0,
    },
    AchievementRule {
        name: "Centurion",
        description: "Reach 100 WPM in a single test",
        requirement: Requirement::Wpm,
        threshold: 100.0,
    },
    AchievementRule {
        name: "Perfectionist",
        description: "Finish a test at 98% accuracy or better",
        requirement: Requirement::Accuracy,
        threshold: 98.0,
    },
    AchievementRule {
        name: "Dedicated",
        description: "Complete 10 tests",
        requirement: Requirement::TestsCompleted,
        threshold: 10.0,
    },
    AchievementRule {
        name: "Veteran",
        description: "Complete 100 tests",
        requirement: Requirement::TestsCompleted,
        threshold: 100.0,
    },
];

/// SQLite store for finished runs, lifetime per-character miss counts, and
/// awarded achievements.
#[derive(Debug)]
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("failed to create state directory: {e}")),
                )
            })?;
        }
        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wpm INTEGER NOT NULL,
                raw_wpm INTEGER NOT NULL,
                net_wpm INTEGER NOT NULL,
                cpm INTEGER NOT NULL,
                accuracy REAL NOT NULL,
                correct_chars INTEGER NOT NULL,
                incorrect_chars INTEGER NOT NULL,
                total_chars INTEGER NOT NULL,
                total_errors INTEGER NOT NULL,
                elapsed_secs INTEGER NOT NULL,
                test_mode TEXT NOT NULL,
                test_value INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                text_type TEXT NOT NULL,
                consistency REAL NOT NULL,
                history TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_wpm ON results(wpm)",
            [],
        )?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS char_errors (
                character TEXT PRIMARY KEY,
                misses INTEGER NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS awarded_achievements (
                name TEXT PRIMARY KEY,
                awarded_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn })
    }

    /// State file under $HOME/.local/state/typemaster, with a
    /// platform-specific fallback.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("typemaster")
                    .join("results.db"),
            )
        } else {
            ProjectDirs::from("", "", "typemaster")
                .map(|pd| pd.data_local_dir().join("results.db"))
        }
    }

    fn record_result(&self, result: &TestResult) -> rusqlite::Result<()> {
        let history_json = serde_json::to_string(&result.history).unwrap_or_default();
        self.conn.execute(
            r#"
            INSERT INTO results
            (wpm, raw_wpm, net_wpm, cpm, accuracy, correct_chars, incorrect_chars,
             total_chars, total_errors, elapsed_secs, test_mode, test_value,
             difficulty, text_type, consistency, history, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                result.metrics.wpm,
                result.metrics.raw_wpm,
                result.metrics.net_wpm,
                result.metrics.cpm,
                result.metrics.accuracy,
                result.metrics.correct_chars,
                result.metrics.incorrect_chars,
                result.metrics.total_chars,
                result.metrics.total_errors,
                result.metrics.elapsed_secs,
                result.test_mode.to_string(),
                result.test_value,
                result.difficulty.to_string(),
                result.text_type.to_string(),
                result.consistency,
                history_json,
                result.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn record_error_counts(&mut self, error_frequency: &HashMap<char, u32>) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        for (character, misses) in error_frequency {
            tx.execute(
                r#"
                INSERT INTO char_errors (character, misses) VALUES (?1, ?2)
                ON CONFLICT(character) DO UPDATE SET misses = misses + ?2
                "#,
                params![character.to_string(), misses],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn personal_best(&self) -> rusqlite::Result<Option<u32>> {
        self.conn
            .query_row("SELECT MAX(wpm) FROM results", [], |row| row.get(0))
    }

    /// 1-based rank of a WPM figure among all stored runs.
    pub fn rank_for(&self, wpm: u32) -> rusqlite::Result<u64> {
        let better: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE wpm > ?1",
            params![wpm],
            |row| row.get(0),
        )?;
        Ok(better + 1)
    }

    pub fn tests_completed(&self) -> rusqlite::Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))
    }

    /// Lifetime miss counts, heaviest first, for the error heatmap.
    pub fn error_heatmap(&self, limit: usize) -> rusqlite::Result<Vec<(char, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT character, misses FROM char_errors ORDER BY misses DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as u64], |row| {
            let s: String = row.get(0)?;
            let misses: u64 = row.get(1)?;
            Ok((s.chars().next().unwrap_or('?'), misses))
        })?;
        rows.collect()
    }

    fn has_achievement(&self, name: &str) -> rusqlite::Result<bool> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM awarded_achievements WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn award(&self, name: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO awarded_achievements (name, awarded_at) VALUES (?1, ?2)",
            params![name, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn check_achievements(&self, result: &TestResult) -> rusqlite::Result<Vec<Achievement>> {
        let tests = self.tests_completed()?;
        let mut earned = Vec::new();
        for rule in ACHIEVEMENT_RULES {
            if self.has_achievement(rule.name)? {
                continue;
            }
            let value = match rule.requirement {
                Requirement::Wpm => result.metrics.wpm as f64,
                Requirement::Accuracy => result.metrics.accuracy,
                Requirement::TestsCompleted => tests as f64,
            };
            if value >= rule.threshold {
                self.award(rule.name)?;
                earned.push(Achievement {
                    name: rule.name,
                    description: rule.description,
                });
            }
        }
        Ok(earned)
    }
}

/// The local stand-in for the remote result service: SQLite store plus a
/// flat CSV run log.
pub struct LocalResultSink {
    db: Option<ResultsDb>,
    log_path: Option<PathBuf>,
}

impl LocalResultSink {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let db = ResultsDb::default_path().and_then(|p| ResultsDb::open(p).ok());
        let log_path = ProjectDirs::from("", "", "typemaster")
            .map(|pd| pd.config_dir().join("log.csv"));
        Self { db, log_path }
    }

    pub fn with_paths<P: AsRef<Path>, Q: AsRef<Path>>(db_path: P, log_path: Q) -> Self {
        Self {
            db: ResultsDb::open(db_path).ok(),
            log_path: Some(log_path.as_ref().to_path_buf()),
        }
    }

    pub fn db(&self) -> Option<&ResultsDb> {
        self.db.as_ref()
    }

    fn append_log(&self, result: &TestResult) -> io::Result<()> {
        let Some(log_path) = &self.log_path else {
            return Ok(());
        };
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = !log_path.exists();
        let file = OpenOptions::new().create(true).append(true).open(log_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record([
                "date",
                "mode",
                "value",
                "difficulty",
                "text_type",
                "elapsed_secs",
                "wpm",
                "raw_wpm",
                "cpm",
                "accuracy",
                "errors",
                "consistency",
            ])?;
        }
        writer.write_record([
            result.completed_at.format("%c").to_string(),
            result.test_mode.to_string(),
            result.test_value.to_string(),
            result.difficulty.to_string(),
            result.text_type.to_string(),
            result.metrics.elapsed_secs.to_string(),
            result.metrics.wpm.to_string(),
            result.metrics.raw_wpm.to_string(),
            result.metrics.cpm.to_string(),
            format!("{:.1}", result.metrics.accuracy),
            result.metrics.total_errors.to_string(),
            format!("{:.2}", result.consistency),
        ])?;
        writer.flush()?;
        Ok(())
    }

    fn submit_inner(db: &mut ResultsDb, result: &TestResult) -> rusqlite::Result<SubmitOutcome> {
        let previous_best = db.personal_best()?;
        db.record_result(result)?;
        db.record_error_counts(&result.error_frequency)?;

        let rank = db.rank_for(result.metrics.wpm)?;
        let new_achievements = db.check_achievements(result)?;
        let is_personal_best = previous_best.map_or(true, |best| result.metrics.wpm >= best);

        Ok(SubmitOutcome {
            accepted: true,
            rank: Some(rank),
            new_achievements,
            is_personal_best,
        })
    }
}

impl ResultSink for LocalResultSink {
    fn submit(&mut self, result: &TestResult) -> SubmitOutcome {
        // The run log is independent of the database outcome.
        let _ = self.append_log(result);

        match self.db.as_mut() {
            Some(db) => Self::submit_inner(db, result).unwrap_or_default(),
            None => SubmitOutcome::default(),
        }
    }
}
