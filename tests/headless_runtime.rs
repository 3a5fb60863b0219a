// Drives the event loop headlessly: typed keys flow through the runner's
// event stream into a session, ticks come from the timeout path.

use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use typemaster::config::{Settings, TestMode};
use typemaster::runtime::{AppEvent, Runner, TestEventSource};
use typemaster::session::{Phase, Session};
use typemaster::text::TestText;

#[test]
fn keystrokes_through_the_runner_complete_a_test() {
    let (tx, rx) = mpsc::channel();
    let runner =
        Runner::new(TestEventSource::new(rx)).with_tick_interval(Duration::from_millis(5));

    let config = Settings {
        test_mode: TestMode::Words,
        test_value: 1,
        ..Settings::default()
    };
    let mut session = Session::new(TestText::new("hi").unwrap(), config);

    for c in ['h', 'i'] {
        tx.send(AppEvent::Key(KeyEvent::from(KeyCode::Char(c))))
            .unwrap();
    }
    drop(tx);

    // A drained-and-disconnected source degrades to ticks, so the loop keeps
    // a bounded number of steps.
    for _ in 0..20 {
        match runner.step() {
            AppEvent::Key(key) => {
                if let KeyCode::Char(c) = key.code {
                    session.handle_char(c);
                }
            }
            AppEvent::Tick => {
                session.on_tick();
            }
            AppEvent::Resize => {}
        }
        if session.phase() == Phase::Complete {
            break;
        }
    }

    assert_eq!(session.phase(), Phase::Complete);
    assert_eq!(session.result().unwrap().metrics.accuracy, 100.0);
}
