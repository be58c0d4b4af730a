mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use codereel::{
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    engine::TypingEngine,
    input::{action_for_key, adjust_delay, KeyAction},
    logging::init_file_logging,
    playback::PlaybackController,
    runtime::{CrosstermEventSource, FixedTicker, ReelEvent, Runner},
    sink::SharedScreen,
    snippet::SnippetDeck,
    sound::{Switchable, TerminalBell},
};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    rc::Rc,
    time::Duration,
};
use tracing::{info, level_filters::LevelFilter, warn};

/// Longest the UI goes without redrawing
const TICK_RATE_MS: u64 = 100;

/// terminal code showcase with naturalistic typing
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Types out a rotating set of code snippets character by character, with natural timing, the occasional corrected typo, and keyboard navigation."
)]
pub struct Cli {
    /// base delay per character in milliseconds
    #[clap(short = 's', long)]
    speed: Option<u64>,

    /// json file with an array of snippets ({id, title, language, code}) to play instead of the bundled set
    #[clap(short = 'f', long)]
    snippets: Option<PathBuf>,

    /// disable sound cues for this run
    #[clap(long)]
    no_sound: bool,

    /// stay on each snippet after it finishes instead of rotating
    #[clap(long)]
    no_rotate: bool,

    /// seed for typing randomness, for reproducible runs
    #[clap(long)]
    seed: Option<u64>,

    /// print the snippet list and exit
    #[clap(long)]
    list: bool,

    /// log level for the log file (off, error, warn, info, debug, trace)
    #[clap(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,
}

impl Cli {
    /// Overlay command line options on the stored preferences
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(speed) = self.speed {
            cfg.base_delay_ms = speed;
        }
        if self.no_rotate {
            cfg.auto_rotate = false;
        }
        if self.no_sound {
            cfg.sound_enabled = false;
        }
    }
}

pub struct App {
    pub controller: PlaybackController,
    pub screen: SharedScreen,
    pub sound: Rc<Switchable<TerminalBell>>,
    clock: SystemClock,
    store: FileConfigStore,
    stored: Config,
}

impl App {
    pub fn new(cli: &Cli, deck: SnippetDeck, store: FileConfigStore) -> Self {
        let stored = store.load();
        let mut effective = stored.clone();
        cli.apply_to(&mut effective);

        let clock = SystemClock::new();
        let screen = SharedScreen::new();
        let sound = Rc::new(Switchable::new(TerminalBell, effective.sound_enabled));
        let rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let engine = TypingEngine::new(effective.typing(), screen.clone(), sound.clone(), rng);
        let controller = PlaybackController::new(
            deck,
            engine,
            Rc::new(clock),
            sound.clone(),
            effective.playback(),
        );

        Self {
            controller,
            screen,
            sound,
            clock,
            store,
            stored,
        }
    }

    /// Returns false when the app should exit
    fn apply(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::Playback(intent) => self.controller.handle(intent),
            KeyAction::Faster | KeyAction::Slower => {
                let current = self.controller.base_delay_ms();
                let next = adjust_delay(current, action == KeyAction::Faster);
                self.controller.set_speed(next);
            }
            KeyAction::ToggleSound => {
                let enabled = self.sound.toggle();
                self.stored.sound_enabled = enabled;
                if let Err(err) = self.store.save(&self.stored) {
                    warn!(path = %self.store.path().display(), %err, "could not save preferences");
                }
            }
            KeyAction::Quit => return false,
        }
        true
    }
}

fn print_deck(deck: &SnippetDeck) {
    for (i, snippet) in deck.iter().enumerate() {
        println!(
            "{:>2}  {:<20} {:<12} {}",
            i + 1,
            snippet.id,
            snippet.language,
            snippet.title
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let deck = match &cli.snippets {
        Some(path) => SnippetDeck::from_path(path)?,
        None => SnippetDeck::bundled()?,
    };

    if cli.list {
        print_deck(&deck);
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let _log_guard = match AppDirs::log_dir() {
        Some(dir) => Some(init_file_logging(&dir, cli.log_level)?),
        None => None,
    };
    info!(snippets = deck.len(), "codereel starting");

    let mut app = App::new(&cli, deck, FileConfigStore::new());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    app.controller.start()?;

    loop {
        app.controller.tick();
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let now = app.clock.now();
        let due_in = app
            .controller
            .next_deadline()
            .map(|at| at.saturating_sub(now));

        match runner.step(due_in) {
            ReelEvent::Key(key) => {
                if let Some(action) = action_for_key(key) {
                    if !app.apply(action) {
                        break;
                    }
                }
            }
            ReelEvent::Focus(focused) => app.controller.set_focused(focused),
            ReelEvent::Resize | ReelEvent::Tick => {}
        }
    }

    info!("codereel exiting");
    Ok(())
}
