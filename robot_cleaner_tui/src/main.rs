mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use robot_cleaner_core::{
    Position,
    agent::{RunReport, Robot},
    cancel::CancellationToken,
    config::SimulationConfig,
    controller::Controller,
    environment::{CellType, Environment, load_environment_from_string},
    strategy::StrategyKind,
};
use std::{
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Robot vacuum cleaner simulation", long_about = None)]
pub struct Args {
    /// TOML file with simulation settings
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Map file to load instead of generating a random map
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    #[arg(long)]
    obstacle_ratio: Option<f64>,

    #[arg(long)]
    dirt_ratio: Option<f64>,

    /// Seed for map generation and the random-path strategy
    #[arg(long)]
    seed: Option<u64>,

    /// complete-coverage, s-pattern, random-path or nearest-dirt
    #[arg(short, long)]
    strategy: Option<StrategyKind>,

    /// Pause after each rendered step
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Run the strategy once without a UI and print the result
    #[arg(long)]
    headless: bool,

    /// Write logs here while the TUI is running
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

/// What the renderer ships from the worker thread to the UI.
struct Snapshot {
    environment: Environment,
    robot: Position,
}

/// Single-slot mailbox between the worker and the UI. Publishing overwrites any frame the UI has
/// not picked up yet.
#[derive(Clone, Default)]
struct LatestFrame(Arc<Mutex<Option<Snapshot>>>);

impl LatestFrame {
    fn publish(&self, snapshot: Snapshot) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    fn take(&self) -> Option<Snapshot> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Renderer that publishes every frame here, then sleeps for `delay`.
    fn renderer(&self, delay: Duration) -> impl FnMut(&Environment, Position) + Send + 'static {
        let slot = self.clone();
        move |environment: &Environment, at: Position| {
            slot.publish(Snapshot {
                environment: environment.clone(),
                robot: at,
            });
            thread::sleep(delay);
        }
    }
}

/// Builds the environment from the map file, or randomly from the config.
fn build_robot(config: &SimulationConfig, map: Option<&Path>) -> Result<Robot> {
    let (environment, start) = match map {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read map file {}", path.display()))?;
            load_environment_from_string(&text)
                .with_context(|| format!("load map file {}", path.display()))?
        }
        None => (config.build_environment()?, Position::ORIGIN),
    };
    let robot = Robot::new(environment, start, config.strategy.build(config.seed))?;
    Ok(robot)
}

struct App {
    controller: Controller,
    config: SimulationConfig,
    /// Latest frame received from the worker.
    snapshot: Snapshot,
    frames: LatestFrame,
    active: StrategyKind,
    resets: u64,
    message: String,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(config: SimulationConfig, map: Option<&Path>) -> Result<Self> {
        let mut robot = build_robot(&config, map)?;
        let snapshot = Snapshot {
            environment: robot.environment().clone(),
            robot: robot.position(),
        };

        let frames = LatestFrame::default();
        robot.set_renderer(frames.renderer(Duration::from_millis(config.step_delay_ms)));

        let mut controller = Controller::new(robot);
        controller.start()?;

        Ok(App {
            controller,
            active: config.strategy,
            config,
            snapshot,
            frames,
            resets: 0,
            message: String::new(),
            should_quit: false,
        })
    }

    /// Pulls the latest frame and reaps a run that finished on its own.
    fn tick(&mut self) -> Result<()> {
        if let Some(snapshot) = self.frames.take() {
            self.snapshot = snapshot;
        }
        if let Some(report) = self.controller.poll_finished()? {
            self.message = describe(&report);
        }
        Ok(())
    }

    fn select_strategy(&mut self, kind: StrategyKind) -> Result<()> {
        self.controller
            .switch_strategy(kind.build(self.config.seed))?;
        self.active = kind;
        self.message = format!("Switched to {kind}");
        Ok(())
    }

    fn reset_map(&mut self) -> Result<()> {
        self.resets += 1;
        let seed = self.config.seed.map(|seed| seed.wrapping_add(self.resets));
        self.controller
            .repopulate(self.config.obstacle_ratio, self.config.dirt_ratio, seed)?;
        self.message = "Map reset".to_string();
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.quit()?,
            KeyCode::Char('r') | KeyCode::Char('R') => self.reset_map()?,
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                self.select_strategy(StrategyKind::ALL[index])?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Cancels the active run, waits for it, then sets the quit flag.
    fn quit(&mut self) -> Result<()> {
        self.controller.stop()?;
        self.should_quit = true;
        Ok(())
    }
}

fn describe(report: &RunReport) -> String {
    format!(
        "{} {}: {} moves, {} cells cleaned",
        report.strategy,
        if report.cancelled { "cancelled" } else { "finished" },
        report.moves,
        report.cells_cleaned
    )
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let config = config::load_config(args.config.as_deref())?;
    let config = config::apply_overrides(config, &args)?;

    if args.headless {
        logging::init_stderr();
        return run_headless(&config, args.map.as_deref());
    }
    if let Some(path) = &args.log_file {
        logging::init_file(path)?;
    }

    let mut app = App::new(config, args.map.as_deref())?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop, restoring the terminal even if it failed
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;

    result
}

/// Runs the configured strategy to completion on the calling thread.
fn run_headless(config: &SimulationConfig, map: Option<&Path>) -> Result<()> {
    let mut robot = build_robot(config, map)?;
    info!(strategy = %config.strategy, "Running headless");
    let report = robot.start_cleaning(&CancellationToken::new());

    print!("{}", robot.environment().render(Some(robot.position())));
    println!("{}", describe(&report));
    println!(
        "dirt left: {}",
        robot.environment().count(CellType::Dirt)
    );
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code)?;
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the map
            Constraint::Percentage(20), // Area for status
            Constraint::Percentage(10), // Area for the menu
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.snapshot);
    render_status(frame, main_layout[1], app);

    let menu = Paragraph::new(
        "[1] Complete Coverage  [2] S-Pattern  [3] Random  [4] Nearest Dirt  [R] Reset Map  [Q] Quit",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(menu, main_layout[2]);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let environment = &app.snapshot.environment;
    let state = if app.controller.is_running() {
        Span::styled("running", Style::default().fg(Color::Green))
    } else {
        Span::styled("idle", Style::default().fg(Color::DarkGray))
    };
    let items = vec![
        ListItem::from(Line::from(vec![
            Span::raw(format!("Strategy: {} (", app.active)),
            state,
            Span::raw(")"),
        ])),
        ListItem::from(format!(
            "Robot: {}  Dirt left: {}  Cleaned: {}",
            app.snapshot.robot,
            environment.count(CellType::Dirt),
            environment.count(CellType::Cleaned)
        )),
        ListItem::from(app.message.clone()),
    ];

    let status = List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

/// Renders the environment map onto the frame.
fn render_map(frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
    let environment = &snapshot.environment;
    let mut lines: Vec<Line> = Vec::with_capacity(environment.height());

    for y in 0..environment.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(environment.width() * 2);
        for x in 0..environment.width() {
            let position = Position::new(x, y);
            if position == snapshot.robot {
                spans.push(Span::styled("R ", Style::default().fg(Color::Red).bold()));
                continue;
            }
            let cell = environment.cell(position).unwrap_or_default();
            let style = match cell {
                CellType::Obstacle => Style::default().fg(Color::DarkGray),
                CellType::Dirt => Style::default().fg(Color::Yellow),
                CellType::Cleaned => Style::default().fg(Color::Green),
                CellType::Empty => Style::default(),
            };
            spans.push(Span::styled(format!("{} ", cell.symbol()), style));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title("Vacuum cleaner robot simulation")
                .borders(Borders::ALL),
        )
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_map_runs_headless_to_a_clean_floor() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("maps/living_room.txt");
        let config = SimulationConfig {
            strategy: StrategyKind::NearestDirt,
            ..SimulationConfig::default()
        };
        let mut robot = build_robot(&config, Some(&path)).unwrap();
        assert_eq!(robot.position(), Position::ORIGIN);
        assert_eq!(robot.environment().width(), 10);

        let report = robot.start_cleaning(&CancellationToken::new());
        assert!(!report.cancelled);
        assert_eq!(robot.environment().count(CellType::Dirt), 0);
        assert!(describe(&report).starts_with("nearest-dirt finished"));
    }

    #[test]
    fn unconsumed_frames_collapse_to_the_latest() {
        let mut environment = Environment::new(30, 30);
        for y in 0..30 {
            for x in 0..30 {
                environment.add_dirt(Position::new(x, y)).unwrap();
            }
        }
        let mut robot =
            Robot::new(environment, Position::ORIGIN, StrategyKind::default().build(None)).unwrap();
        let frames = LatestFrame::default();
        robot.set_renderer(frames.renderer(Duration::ZERO));

        let report = robot.start_cleaning(&CancellationToken::new());
        assert!(report.moves > 900);

        let last = frames.take().unwrap();
        assert_eq!(last.robot, robot.position());
        assert_eq!(last.environment, *robot.environment());
        assert!(frames.take().is_none());
    }

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            step_delay_ms: 0,
            seed: Some(4),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn quit_keys_ignore_case() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let mut app = App::new(quiet_config(), None).unwrap();
            app.handle_key(code).unwrap();
            assert!(app.should_quit, "{code:?}");
            assert!(!app.controller.is_running());
        }
    }

    #[test]
    fn tick_shows_the_final_frame_of_a_finished_run() {
        let mut app = App::new(quiet_config(), None).unwrap();
        app.controller.wait().unwrap();
        app.tick().unwrap();
        let robot = app.controller.robot().unwrap();
        assert_eq!(app.snapshot.robot, robot.position());
        assert_eq!(app.snapshot.environment, *robot.environment());
    }

    #[test]
    fn bundled_config_parses() {
        let raw = include_str!("../simulation.toml");
        let config = config::parse_config(raw).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_delay_ms, 120);
    }

    #[test]
    fn missing_map_file_is_reported() {
        let err = build_robot(&SimulationConfig::default(), Some(Path::new("no/such/map.txt")))
            .unwrap_err();
        assert!(err.to_string().contains("no/such/map.txt"));
    }
}
