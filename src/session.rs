use crate::config::{Difficulty, Settings, TestMode, TextType};
use crate::engine::{CharState, Keystroke, TypingEngine};
use crate::metrics::{self, MetricsSnapshot};
use crate::text::TestText;
use crate::timer::{Timer, TimerMode};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Test lifecycle. `Complete` is terminal; only `restart` leaves it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Complete,
}

/// One metrics-history sample, taken once per whole second elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub second: u64,
    pub wpm: u32,
    pub accuracy: f64,
    pub characters_typed: usize,
    pub errors_at_second: usize,
}

/// The final payload of a completed test. Built exactly once, immutable,
/// handed to the result sink.
#[derive(Clone, Debug, Serialize)]
pub struct TestResult {
    pub metrics: MetricsSnapshot,
    pub test_mode: TestMode,
    pub test_value: usize,
    pub difficulty: Difficulty,
    pub text_type: TextType,
    pub history: Vec<HistorySample>,
    pub error_frequency: HashMap<char, u32>,
    /// Standard deviation of the per-second WPM series; 0.0 for very short
    /// tests with no samples.
    pub consistency: f64,
    pub completed_at: DateTime<Local>,
}

/// Outbound-only presentation contract. The session pushes state deltas
/// through this and never reads anything back, which keeps the core
/// independently testable. All methods default to no-ops.
pub trait Presenter {
    fn char_state(&mut self, _index: usize, _state: Option<CharState>) {}
    fn cursor_moved(&mut self, _index: usize) {}
    fn metrics(&mut self, _snapshot: &MetricsSnapshot) {}
    fn progress(&mut self, _percentage: f64) {}
    fn completed(&mut self, _result: &TestResult) {}
}

/// Presenter for immediate-mode UIs that redraw from session state each
/// frame and need no delta stream.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

/// Wires the timer and the typing engine together, manages the test
/// lifecycle, samples the per-second metrics history, and produces the final
/// `TestResult`. One instance per test; discarded or restarted, never shared
/// across tests.
pub struct Session {
    config: Settings,
    engine: TypingEngine,
    timer: Timer,
    history: Vec<HistorySample>,
    phase: Phase,
    presenter: Box<dyn Presenter>,
    result: Option<TestResult>,
}

impl Session {
    pub fn new(text: TestText, config: Settings) -> Self {
        let timer = Self::timer_for(&config);
        Self {
            engine: TypingEngine::new(text),
            timer,
            history: Vec::new(),
            phase: Phase::Idle,
            presenter: Box::new(NullPresenter),
            result: None,
            config,
        }
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    fn timer_for(config: &Settings) -> Timer {
        match config.test_mode {
            TestMode::Time => Timer::new(config.test_value as f64, TimerMode::Countdown),
            TestMode::Words => Timer::new(0.0, TimerMode::Countup),
        }
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn engine(&self) -> &TypingEngine {
        &self.engine
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn history(&self) -> &[HistorySample] {
        &self.history
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    /// Live metrics from the current counts and clock.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counts = self.engine.counts();
        metrics::calculate(
            counts.correct_chars,
            counts.incorrect_chars,
            counts.total_chars,
            self.timer.elapsed_secs(),
            counts.total_errors,
        )
    }

    pub fn progress(&self) -> f64 {
        let counts = self.engine.counts();
        metrics::calculate_progress(
            self.config.test_mode,
            self.config.test_value as f64,
            self.timer.elapsed_secs(),
            counts.cursor,
            counts.text_len,
        )
    }

    /// Feed one raw input event. Multi-character events (IME, paste) are
    /// reduced to their last character; the rest are dropped. Documented
    /// policy, chosen over sequential replay because it matches how the
    /// original client read its input field.
    pub fn handle_text(&mut self, input: &str) {
        if let Some(c) = input.chars().last() {
            self.handle_char(c);
        }
    }

    pub fn handle_char(&mut self, typed: char) {
        if self.phase == Phase::Complete {
            return;
        }
        if self.phase == Phase::Idle {
            self.phase = Phase::Running;
            self.timer.start();
        }

        let stroke = self.engine.handle_input(typed);
        let (index, correct, finished) = match stroke {
            Keystroke::Advanced { index, correct } => (index, correct, false),
            Keystroke::Finished { index, correct } => (index, correct, true),
            Keystroke::Ignored => return,
        };

        let state = if correct {
            CharState::Correct
        } else {
            CharState::Incorrect
        };
        self.presenter.char_state(index, Some(state));
        self.presenter.cursor_moved(self.engine.cursor());
        let snapshot = self.snapshot();
        self.presenter.metrics(&snapshot);
        if self.config.test_mode == TestMode::Words {
            let progress = self.progress();
            self.presenter.progress(progress);
        }

        if finished {
            self.complete();
        }
    }

    pub fn handle_backspace(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        if !self.engine.handle_backspace() {
            return;
        }

        let cursor = self.engine.cursor();
        self.presenter.char_state(cursor, None);
        self.presenter.cursor_moved(cursor);
        let snapshot = self.snapshot();
        self.presenter.metrics(&snapshot);
    }

    /// Advance the clock one runtime tick. Samples the metrics history at
    /// every whole-second boundary and finishes the test when a countdown
    /// expires. Returns true on the tick that completed the test.
    pub fn on_tick(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }

        let update = self.timer.tick();

        // Catch up one sample per elapsed whole second; the 100ms cadence
        // normally means at most one iteration.
        while (self.history.len() as u64) < update.elapsed_secs.floor() as u64 {
            let second = self.history.len() as u64 + 1;
            let counts = self.engine.counts();
            let snapshot = metrics::calculate(
                counts.correct_chars,
                counts.incorrect_chars,
                counts.total_chars,
                update.elapsed_secs,
                counts.total_errors,
            );
            self.history.push(HistorySample {
                second,
                wpm: snapshot.wpm,
                accuracy: snapshot.accuracy,
                characters_typed: counts.total_chars,
                errors_at_second: counts.total_errors,
            });
        }

        let progress = self.progress();
        self.presenter.progress(progress);

        if update.just_finished {
            self.complete();
            return true;
        }
        false
    }

    /// Terminal transition. Stops the clock, freezes the metrics, and builds
    /// the result payload exactly once.
    fn complete(&mut self) {
        self.phase = Phase::Complete;
        self.timer.stop();

        if self.result.is_some() {
            return;
        }

        let snapshot = self.snapshot();
        let wpm_series: Vec<f64> = self.history.iter().map(|s| s.wpm as f64).collect();
        let result = TestResult {
            metrics: snapshot,
            test_mode: self.config.test_mode,
            test_value: self.config.test_value,
            difficulty: self.config.difficulty,
            text_type: self.config.text_type,
            history: self.history.clone(),
            error_frequency: self.engine.error_frequency().clone(),
            consistency: metrics::consistency(&wpm_series).unwrap_or(0.0),
            completed_at: Local::now(),
        };
        self.presenter.completed(&result);
        self.result = Some(result);
    }

    /// Throw away the finished (or abandoned) test and arm a fresh one
    /// against a new prompt. Also the path that guarantees no stale timer
    /// keeps ticking into the next test.
    pub fn restart(&mut self, text: TestText, config: Settings) {
        self.timer = Self::timer_for(&config);
        self.config = config;
        self.engine.reset(text);
        self.history.clear();
        self.phase = Phase::Idle;
        self.result = None;
    }
}
