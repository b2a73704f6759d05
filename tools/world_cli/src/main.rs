use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gemini::GeminiClient;
use world_core::config::DEFAULT_CONFIG_PATH;
use world_core::{AttemptEvent, GreetingController, Phase, PresetRegistry, WorldConfig};

#[derive(Parser)]
#[command(author, version, about = "Say hello to the world in any dimension", long_about = None)]
struct Cli {
    /// YAML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available vibes
    Presets,
    /// Stream one greeting to stdout
    Generate {
        /// Vibe id (see `presets`)
        #[arg(short, long)]
        vibe: Option<String>,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = WorldConfig::load_or_default(&cli.config)?;
    let registry = config.registry()?;

    match cli.command {
        Commands::Presets => {
            for row in preset_rows(&registry) {
                println!("{}", row);
            }
        }
        Commands::Generate { vibe, model } => {
            if let Some(model) = model {
                config.model = model;
            }

            let preset = match vibe {
                Some(id) => registry.get(&id).cloned().ok_or_else(|| {
                    anyhow!("Unknown vibe '{}'. Valid vibes: {}", id, registry.ids().join(", "))
                })?,
                None => registry.default_preset().clone(),
            };

            let backend = Arc::new(GeminiClient::from_config(&config)?);
            let mut controller = GreetingController::new(backend, registry, &config);
            controller.select_preset(&preset);

            let phase = stream_greeting(&mut controller).await?;
            if phase == Phase::Failed {
                bail!("{}", controller.state().message());
            }
        }
    }

    Ok(())
}

/// One line per preset. Labels go last since emoji make their width unpredictable.
fn preset_rows(registry: &PresetRegistry) -> Vec<String> {
    let id_width = registry.iter().map(|p| p.id.len()).max().unwrap_or(0);
    let prompt_width = registry.iter().map(|p| p.prompt.chars().count()).max().unwrap_or(0);
    registry
        .iter()
        .map(|p| {
            format!(
                "{:<id_width$}  {:<prompt_width$}  {}",
                p.id, p.prompt, p.label
            )
        })
        .collect()
}

/// Prints each fragment as soon as the controller accepts it.
async fn stream_greeting(controller: &mut GreetingController) -> Result<Phase> {
    let mut stdout = std::io::stdout();
    let mut updates = controller.begin(None).updates();

    while let Some(update) = updates.next().await {
        let delta = match &update.event {
            AttemptEvent::Chunk(text) => Some(text.clone()),
            _ => None,
        };
        if controller.apply(update) {
            if let Some(text) = delta {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
        }
    }

    let phase = controller.state().phase();
    if phase == Phase::Settled {
        writeln!(stdout)?;
    }
    Ok(phase)
}
