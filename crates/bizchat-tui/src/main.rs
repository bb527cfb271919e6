use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use bizchat_core::Config;

mod app;
mod handler;
mod logging;
mod markup;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser, Debug)]
#[command(name = "bizchat")]
#[command(version, about = "Chat with your business assistant from the terminal")]
struct Cli {
    /// Chat backend base URL (overrides config and BIZCHAT_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Never contact the backend; answer from built-in suggestions
    #[arg(long)]
    offline: bool,

    /// Seed for picking offline suggestions (reproducible sessions)
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the startup health check
    #[arg(long)]
    no_probe: bool,

    /// Forget the saved business profile before starting
    #[arg(long)]
    reset_profile: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if self.offline {
            config.force_fallback = true;
        }
        if self.seed.is_some() {
            config.rng_seed = self.seed;
        }
        if self.no_probe {
            config.health_probe = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init()?;

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });
    cli.apply(&mut config);
    info!(backend = %config.backend_url, offline = config.force_fallback, "starting session");

    let mut app = App::new(&config, cli.reset_profile)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    app.shutdown();
    info!("session ended");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render_app(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }

        app.poll_tasks().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "bizchat",
            "--backend-url",
            "http://chat.example",
            "--offline",
            "--seed",
            "12",
            "--no-probe",
        ]);
        let mut config = Config::new();
        cli.apply(&mut config);

        assert_eq!(config.backend_url, "http://chat.example");
        assert!(config.force_fallback);
        assert_eq!(config.rng_seed, Some(12));
        assert!(!config.health_probe);
    }

    #[test]
    fn test_cli_defaults_leave_config() {
        let cli = Cli::parse_from(["bizchat"]);
        let mut config = Config::new();
        cli.apply(&mut config);
        assert_eq!(config, Config::new());
    }
}
