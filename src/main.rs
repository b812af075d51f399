#![forbid(unsafe_code)]

mod applets;
mod autohide;
mod background;
mod canvas;
mod color;
mod config;
mod constants;
mod daemon;
mod drag_proxy;
mod event_loop;
mod geometry;
mod ipc;
mod mask;
mod monitor;
mod panel;
mod poller;
mod shell;
mod signal;
mod strut;
mod windowing;
mod x11_utils;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::PanelConfig;
use ipc::{PanelClient, PanelRequest, PanelResponse};

#[derive(Parser)]
#[command(name = "edgepanel")]
#[command(about = "Screen-edge dock panel for X11")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the panel (default)
    Run {
        /// Config file instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Keep the panel visible
    Inhibit {
        /// Application asking for the inhibit
        #[arg(long)]
        app: String,
        /// Why the panel should stay visible
        #[arg(long, default_value = "")]
        reason: String,
        /// Stay connected and release the inhibit on exit
        #[arg(long)]
        hold: bool,
    },
    /// Release an inhibit by cookie
    Uninhibit { cookie: u32 },
    /// List outstanding inhibits
    Inhibitors,
    /// Tell the panel a docklet is open until the pointer leaves it
    OpenDocklet,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config
    Init {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config
    Show {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")?;

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run { config: None }) {
        Command::Run { config } => daemon::run_panel_daemon(config),
        Command::Inhibit { app, reason, hold } => inhibit(app, reason, hold),
        Command::Uninhibit { cookie } => match request(&PanelRequest::Uninhibit { cookie })? {
            PanelResponse::Released(true) => Ok(()),
            PanelResponse::Released(false) => bail!("No inhibitor with cookie {}", cookie),
            other => bail!("Unexpected response from panel: {:?}", other),
        },
        Command::Inhibitors => match request(&PanelRequest::ListInhibitors)? {
            PanelResponse::Inhibitors(list) => {
                for line in list {
                    println!("{}", line);
                }
                Ok(())
            }
            other => bail!("Unexpected response from panel: {:?}", other),
        },
        Command::OpenDocklet => match request(&PanelRequest::OpenDocklet)? {
            PanelResponse::Done => Ok(()),
            other => bail!("Unexpected response from panel: {:?}", other),
        },
        Command::Config { action } => config_command(action),
    }
}

fn request(req: &PanelRequest) -> Result<PanelResponse> {
    let mut client = PanelClient::connect()?;
    match client.request(req)? {
        PanelResponse::Error(message) => bail!("Panel refused request: {}", message),
        response => Ok(response),
    }
}

fn inhibit(app_name: String, reason: String, hold: bool) -> Result<()> {
    let mut client = PanelClient::connect()?;
    let cookie = match client.request(&PanelRequest::Inhibit { app_name, reason, hold })? {
        PanelResponse::Cookie(cookie) => cookie,
        PanelResponse::Error(message) => bail!("Panel refused request: {}", message),
        other => bail!("Unexpected response from panel: {:?}", other),
    };
    println!("{}", cookie);
    if !hold {
        return Ok(());
    }

    let quit = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&quit))
            .context(format!("Failed to register handler for signal {}", signal))?;
    }
    info!(cookie, "Holding inhibit until interrupted");
    while !quit.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
    }
    client.request(&PanelRequest::Uninhibit { cookie })?;
    Ok(())
}

fn config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { config, force } => {
            let path = config.unwrap_or_else(PanelConfig::default_path);
            if path.exists() && !force {
                bail!("{} already exists, pass --force to overwrite", path.display());
            }
            PanelConfig::default().save(&path)?;
            println!("{}", path.display());
        }
        ConfigAction::Show { config } => {
            let path = config.unwrap_or_else(PanelConfig::default_path);
            let config = PanelConfig::load(&path);
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to serialize config to JSON")?
            );
        }
    }
    Ok(())
}
