use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gemini::GeminiClient;
use world_core::config::DEFAULT_CONFIG_PATH;
use world_core::{GreetingController, WorldConfig};
use world_tui::{ui, App, Event, EventHandler};

const TICK_RATE_MS: u64 = 120;

#[tokio::main]
async fn main() -> Result<()> {
    // 0. Config, logging and the generation backend
    let config_path =
        std::env::var("WORLD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = WorldConfig::load_or_default(&config_path)?;
    init_logging(&config.log_file)?;

    let backend = Arc::new(GeminiClient::from_config(&config)?);
    if !backend.has_api_key() {
        warn!(var = %config.api_key_env, "no API key in environment, generation will fail");
    }
    let registry = config.registry()?;
    let (controller, startup) = GreetingController::launch(backend, registry, &config);
    info!(model = %config.model, "world generator starting");

    // 1. Setup terminal (raw mode, alternate screen)
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 2. Events and the startup greeting
    let mut events = EventHandler::new(TICK_RATE_MS);
    tokio::spawn(startup.run(events.sender()));
    let mut app = App::new(controller);

    let res = run_app(&mut terminal, &mut app, &mut events).await;

    // 3. Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn init_logging(path: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let Some(event) = events.next().await else {
            return Ok(());
        };
        match event {
            Event::Tick => app.on_tick(),
            Event::Resize => {}
            Event::Generation(update) => {
                app.apply(update);
            }
            Event::Input(key) => {
                if let Some(attempt) = app.handle_key(key) {
                    tokio::spawn(attempt.run(events.sender()));
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
