pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        KeyEvent, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use redlight::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    input::{map_key, Action, HoldTracker},
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
    Game, Phase,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    time::Duration,
};

/// red light, green light in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Race across the track to the finish line before time runs out. Move while the light is green; freeze when it turns red or you're out."
)]
pub struct Cli {
    /// number of seconds to reach the finish line
    #[clap(short = 't', long)]
    time_limit: Option<u32>,

    /// number of seconds counted down before each round
    #[clap(short = 'c', long)]
    countdown: Option<u32>,

    /// player speed in track units per second
    #[clap(long)]
    speed: Option<f64>,

    /// seed for the light schedule, for reproducible rounds
    #[clap(long)]
    seed: Option<u64>,

    /// milliseconds between simulation ticks
    #[clap(long)]
    tick_rate_ms: Option<u64>,

    /// milliseconds a key counts as held without auto-repeat (terminals without key release events)
    #[clap(long)]
    hold_timeout_ms: Option<u64>,

    /// milliseconds between moving on red and being eliminated
    #[clap(long)]
    grace_ms: Option<u64>,

    /// write logs here instead of the default state directory
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save: bool,
}

impl Cli {
    /// Overlay command line flags on the stored configuration
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(v) = self.time_limit {
            cfg.time_limit_secs = v;
        }
        if let Some(v) = self.countdown {
            cfg.countdown_secs = v;
        }
        if let Some(v) = self.speed {
            cfg.speed = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = Some(v);
        }
        if let Some(v) = self.tick_rate_ms {
            cfg.tick_rate_ms = v;
        }
        if let Some(v) = self.hold_timeout_ms {
            cfg.hold_timeout_ms = v;
        }
        if let Some(v) = self.grace_ms {
            cfg.grace_ms = v;
        }
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub game: Game,
    pub holds: HoldTracker,
}

impl App {
    /// `exact_releases` when the terminal reports key release events
    pub fn new(config: &Config, exact_releases: bool) -> Self {
        let release_after = if exact_releases {
            None
        } else {
            Some(Duration::from_millis(config.hold_timeout_ms))
        };
        Self {
            game: Game::new(config.rules()),
            holds: HoldTracker::new(release_after),
        }
    }

    pub fn on_tick(&mut self, dt: Duration) {
        for change in self.holds.tick(dt) {
            self.game.report_input_direction(change.direction, change.pressed);
        }
        self.game.advance(dt);
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        let Some(action) = map_key(&key) else {
            return Flow::Continue;
        };
        if let Action::Move(direction) = action {
            if let Some(change) = self.holds.on_key(direction, key.kind) {
                self.game.report_input_direction(change.direction, change.pressed);
            }
            return Flow::Continue;
        }
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }
        match action {
            Action::Start => {
                if matches!(
                    self.game.phase(),
                    Phase::Waiting | Phase::Won | Phase::Eliminated
                ) {
                    self.holds.release_all();
                    self.game.start();
                }
            }
            Action::Reset => {
                self.holds.release_all();
                self.game.reset();
            }
            Action::Quit => return Flow::Quit,
            Action::Move(_) => {}
        }
        Flow::Continue
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Logging is best effort: on failure warn once on stderr, before the
/// terminal switches to raw mode, and play without it.
fn init_logging(path: Option<PathBuf>) {
    let Some(path) = path.or_else(AppDirs::log_path) else {
        eprintln!("warning: no log directory available, logging disabled");
        return;
    };
    let file = match open_log_file(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "warning: cannot open log file {}: {e}, logging disabled",
                path.display()
            );
            return;
        }
    };
    // stderr belongs to the terminal UI, so logs only ever go to a file
    let env = env_logger::Env::default().default_filter_or("info");
    if let Err(e) = env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
    {
        eprintln!("warning: logger already installed: {e}");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(cli.log_file.clone());

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if let Err(e) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e).exit();
    }
    if cli.save {
        store.save(&config)?;
        log::info!("saved settings to {}", store.path().display());
    }
    log::info!("starting with {:?}", config);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    let exact_releases = supports_keyboard_enhancement().unwrap_or(false);
    if exact_releases {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, exact_releases);
    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let result = start_tui(&mut terminal, &mut app, tick_rate);

    disable_raw_mode()?;
    if exact_releases {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        log::error!("game loop failed: {e}");
    }
    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(tick_rate));

    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            GameEvent::Tick(dt) => {
                app.on_tick(dt);
                terminal.draw(|f| ui(app, f))?;
            }
            GameEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            GameEvent::Key(key) => {
                if app.on_key(key) == Flow::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
