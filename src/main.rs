pub mod config;
pub mod engine;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod session;
pub mod text;
pub mod timer;
pub mod ui;

use crate::config::{Difficulty, FileSettingsStore, Settings, SettingsStore, TestMode, TextType};
use crate::results::{LocalResultSink, ResultSink, SubmitOutcome};
use crate::runtime::{AppEvent, CrosstermEventSource, EventSource, Runner};
use crate::session::{Phase, Session};
use crate::text::{estimate_word_count, BuiltinTextProvider, TestText, TextProvider};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
};

/// terminal typing speed test with live metrics and local leaderboards
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing speed test: per-character correctness, live WPM/accuracy, \
                  error heatmaps, and locally persisted results with achievements."
)]
pub struct Cli {
    /// test mode: run against the clock or through a word count
    #[clap(short = 'm', long, value_enum)]
    mode: Option<TestMode>,

    /// seconds (time mode) or number of words (words mode)
    #[clap(short = 'v', long)]
    value: Option<usize>,

    /// difficulty tier of the generated text
    #[clap(short, long, value_enum)]
    difficulty: Option<Difficulty>,

    /// shape of the prompt: words, sentences, paragraphs, or code
    #[clap(short = 't', long, value_enum)]
    text_type: Option<TextType>,

    /// custom prompt to type instead of generated text
    #[clap(short, long)]
    prompt: Option<String>,

    /// reserved for stricter backspace rules; currently has no effect
    #[clap(long)]
    strict: bool,
}

impl Cli {
    /// Saved settings overlaid with whatever was given on the command line.
    fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(mode) = self.mode {
            settings.test_mode = mode;
        }
        if let Some(value) = self.value {
            settings.test_value = value;
        }
        if let Some(difficulty) = self.difficulty {
            settings.difficulty = difficulty;
        }
        if let Some(text_type) = self.text_type {
            settings.text_type = text_type;
        }
        if self.strict {
            settings.strict_mode = true;
        }
        settings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Typing,
    Results,
}

pub struct App {
    pub session: Session,
    pub screen: Screen,
    pub outcome: Option<SubmitOutcome>,
    pub settings: Settings,
    provider: BuiltinTextProvider,
    custom_prompt: Option<String>,
}

impl App {
    pub fn new(settings: Settings, custom_prompt: Option<String>) -> Result<Self, Box<dyn Error>> {
        let provider = BuiltinTextProvider::new();
        let text = Self::load_text(&provider, &settings, custom_prompt.as_deref())?;
        Ok(Self {
            session: Session::new(text, settings.clone()),
            screen: Screen::Typing,
            outcome: None,
            settings,
            provider,
            custom_prompt,
        })
    }

    fn load_text(
        provider: &BuiltinTextProvider,
        settings: &Settings,
        custom_prompt: Option<&str>,
    ) -> Result<TestText, Box<dyn Error>> {
        match custom_prompt {
            Some(prompt) => Ok(TestText::new(prompt)?),
            None => Ok(provider.fetch_text(
                settings.difficulty,
                settings.text_type,
                estimate_word_count(settings.test_mode, settings.test_value),
            )),
        }
    }

    /// Arm a fresh test. Any still-ticking timer dies with the old session
    /// state here.
    pub fn restart(&mut self) {
        let text = Self::load_text(&self.provider, &self.settings, self.custom_prompt.as_deref())
            .expect("restart prompt comes from a validated source");
        self.session.restart(text, self.settings.clone());
        self.screen = Screen::Typing;
        self.outcome = None;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileSettingsStore::new();
    let settings = cli.apply_to(store.load());
    let _ = store.save(&settings);

    let mut app = match App::new(settings, cli.prompt.clone()) {
        Ok(app) => app,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };
    let mut sink = LocalResultSink::new();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new());
    let run = run_app(&mut terminal, &mut app, &runner, &mut sink);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run
}

fn run_app<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
    sink: &mut dyn ResultSink,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            AppEvent::Tick => {
                app.session.on_tick();
            }
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if is_quit(&key, app.screen) {
                    break;
                }
                handle_key(app, key);
            }
        }

        // One submission per completed test, regardless of which event
        // finished it.
        if app.session.phase() == Phase::Complete && app.screen == Screen::Typing {
            let result = app
                .session
                .result()
                .expect("complete session carries a result");
            app.outcome = Some(sink.submit(result));
            app.screen = Screen::Results;
        }
    }
    Ok(())
}

fn is_quit(key: &KeyEvent, screen: Screen) -> bool {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
        KeyCode::Esc => screen == Screen::Results,
        _ => false,
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Typing => match key.code {
            KeyCode::Tab | KeyCode::Esc => app.restart(),
            KeyCode::Backspace => app.session.handle_backspace(),
            KeyCode::Enter => app.session.handle_char('\n'),
            KeyCode::Char(c) => app.session.handle_char(c),
            _ => {}
        },
        Screen::Results => match key.code {
            KeyCode::Tab | KeyCode::Char('n') | KeyCode::Char('r') => app.restart(),
            _ => {}
        },
    }
}
