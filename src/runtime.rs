use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Tick cadence for the event loop. Finer than one second so the session's
/// whole-second history sampling never misses a boundary, and fine enough
/// that a countdown ends within 100ms of its target.
pub const TICK_RATE_MS: u64 = 100;

/// Everything the main loop reacts to: keystrokes, terminal resizes, and the
/// periodic clock tick synthesized on input timeout.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events. Abstracted so tests can drive the loop without
/// a real terminal.
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production source: a reader thread pumps crossterm events into a channel.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-backed source for unit tests.
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Multiplexes one event source with the tick clock: waiting out the tick
/// interval with no input yields a `Tick`. This is the single logical stream
/// of the whole app; typing state is only ever mutated from it.
pub struct Runner<E: EventSource> {
    event_source: E,
    tick_interval: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(event_source: E) -> Self {
        Self {
            event_source,
            tick_interval: Duration::from_millis(TICK_RATE_MS),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Next event, or `Tick` when the interval expires first.
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.tick_interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::mpsc;

    #[test]
    fn step_synthesizes_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner =
            Runner::new(TestEventSource::new(rx)).with_tick_interval(Duration::from_millis(1));
        assert_matches!(runner.step(), AppEvent::Tick);
    }

    #[test]
    fn step_passes_events_through() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Resize).unwrap();
        let runner =
            Runner::new(TestEventSource::new(rx)).with_tick_interval(Duration::from_millis(10));
        assert_matches!(runner.step(), AppEvent::Resize);
    }

    #[test]
    fn disconnected_source_degrades_to_ticks() {
        let (tx, rx) = mpsc::channel::<AppEvent>();
        drop(tx);
        let runner =
            Runner::new(TestEventSource::new(rx)).with_tick_interval(Duration::from_millis(1));
        assert_matches!(runner.step(), AppEvent::Tick);
    }
}
