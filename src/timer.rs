use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerMode {
    /// Counts down from the configured duration and finishes on its own.
    Countdown,
    /// Counts up indefinitely; the caller decides when the test is over.
    Countup,
}

/// What one tick observed. `just_finished` is reported exactly once per
/// started countdown, on the tick where the remaining time reaches zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimerUpdate {
    pub elapsed_secs: f64,
    /// Only meaningful in countdown mode.
    pub remaining_secs: Option<f64>,
    pub just_finished: bool,
}

/// Wall-clock tracker driven by the runtime's periodic tick. The tick cadence
/// (100 ms) is finer than one second so whole-second sampling of the metrics
/// history never skips a boundary.
#[derive(Debug)]
pub struct Timer {
    mode: TimerMode,
    duration_secs: f64,
    started_at: Option<Instant>,
    stopped_elapsed: f64,
    running: bool,
    finished: bool,
}

impl Timer {
    pub fn new(duration_secs: f64, mode: TimerMode) -> Self {
        Self {
            mode,
            duration_secs,
            started_at: None,
            stopped_elapsed: 0.0,
            running: false,
            finished: false,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Record the start instant. Idempotent while running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.started_at = Some(Instant::now());
        self.running = true;
        self.finished = false;
    }

    /// Derived elapsed seconds; while stopped this is the value captured at
    /// the last stop.
    pub fn elapsed_secs(&self) -> f64 {
        if self.running {
            self.started_at
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0)
        } else {
            self.stopped_elapsed
        }
    }

    /// Remaining seconds in countdown mode, clamped at zero.
    pub fn remaining_secs(&self) -> Option<f64> {
        match self.mode {
            TimerMode::Countdown => Some((self.duration_secs - self.elapsed_secs()).max(0.0)),
            TimerMode::Countup => None,
        }
    }

    /// Recompute elapsed/remaining from the wall clock. In countdown mode the
    /// expiring tick stops the timer and flags `just_finished`.
    pub fn tick(&mut self) -> TimerUpdate {
        let elapsed = self.elapsed_secs();
        let remaining = self.remaining_secs();

        let mut just_finished = false;
        if self.running && !self.finished {
            if let Some(r) = remaining {
                if r <= 0.0 {
                    self.finished = true;
                    just_finished = true;
                    self.stop();
                }
            }
        }

        TimerUpdate {
            elapsed_secs: elapsed,
            remaining_secs: remaining,
            just_finished,
        }
    }

    /// Halt and freeze the elapsed reading. Idempotent.
    pub fn stop(&mut self) {
        if self.running {
            self.stopped_elapsed = self
                .started_at
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0);
            self.running = false;
        }
    }

    pub fn reset(&mut self) {
        self.stop();
        self.started_at = None;
        self.stopped_elapsed = 0.0;
        self.finished = false;
    }
}
