//! # office-loader CLI (`oload`)
//!
//! Drives every acquisition path from the command line and serves the HTTP
//! message channel.
//!
//! ## Usage
//!
//! ```bash
//! oload --config ./config/oload.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `oload open <path>` | Open a local file |
//! | `oload pick` | Prompt for a file on stdin, cancel on empty input or timeout |
//! | `oload fetch <url>` | Download and open a remote document |
//! | `oload new <kind>` | Open a blank word, cell or slide document |
//! | `oload stream <file>` | Replay channel messages from a JSON-lines file (`-` for stdin) |
//! | `oload serve` | Start the HTTP server |
//! | `oload guide status` | Show whether the menu guide was dismissed |
//! | `oload guide reset` | Forget that the menu guide was dismissed |
//!
//! Logs go to stderr (`RUST_LOG` controls the level); results go to stdout.
//! The menu guide only runs under `serve`; the other commands exit before
//! its delay elapses.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;

use office_loader::app::App;
use office_loader::channel::{ChannelDispatcher, DispatchReport};
use office_loader::config;
use office_loader::models::{AcquisitionResult, DocumentKind};
use office_loader::picker::{PathPicker, StdinPicker};
use office_loader::server;
use office_loader::traits::{FilePicker, FlagStore};
use office_loader::ui::MENU_GUIDE_DISMISSED_KEY;

/// office-loader: document acquisition and load orchestration for an
/// x2t-backed office viewer.
#[derive(Parser)]
#[command(
    name = "oload",
    about = "office-loader: open office documents through the x2t conversion engine",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/oload.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a local file.
    Open {
        path: PathBuf,
    },

    /// Prompt for a file path on stdin.
    ///
    /// An empty line cancels; so does no answer within
    /// `picker.cancel_timeout_ms`.
    Pick,

    /// Download a document and open it.
    Fetch {
        url: String,

        /// File name to use instead of the one derived from the response.
        #[arg(long)]
        name: Option<String>,
    },

    /// Open a new blank document.
    New {
        /// `word`, `cell` or `slide`.
        kind: String,
    },

    /// Replay channel messages, one JSON object per line.
    Stream {
        /// Input file, or `-` for stdin.
        path: PathBuf,
    },

    /// Start the HTTP server.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Manage the menu guide.
    Guide {
        #[command(subcommand)]
        action: GuideAction,
    },
}

#[derive(Subcommand)]
enum GuideAction {
    /// Show whether the guide was dismissed.
    Status,
    /// Forget a previous dismissal.
    Reset,
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(result: AcquisitionResult) -> anyhow::Result<()> {
    match result {
        AcquisitionResult::Success { file_name, binary } => {
            let size = binary.map(|b| b.len()).unwrap_or(0);
            println!("opened {} ({} bytes)", file_name, size);
            Ok(())
        }
        AcquisitionResult::Cancelled => {
            println!("cancelled");
            Ok(())
        }
        AcquisitionResult::Failed { reason } => bail!("{}", reason),
    }
}

async fn run_pick(app: &App, picker: &dyn FilePicker) -> anyhow::Result<()> {
    let result = app.orchestrator.pick_local(picker).await?;
    report(result)
}

async fn run_stream(app: &App, path: &Path) -> anyhow::Result<()> {
    let dispatcher = ChannelDispatcher::new(app.orchestrator.clone());

    let reader: Box<dyn tokio::io::AsyncBufRead + Unpin> = if path.as_os_str() == "-" {
        Box::new(tokio::io::BufReader::new(tokio::io::stdin()))
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Box::new(tokio::io::BufReader::new(file))
    };

    let mut lines = reader.lines();
    let mut failures = 0usize;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let outcome = dispatcher.dispatch_json(&line).await;
        if matches!(outcome, DispatchReport::Failed { .. }) {
            failures += 1;
        }
        println!("{}", serde_json::to_string(&outcome)?);
    }

    if failures > 0 {
        bail!("{} message(s) failed", failures);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let app = match cli.command {
        Commands::Serve { .. } => App::from_config(&cfg)?,
        _ => App::one_shot(&cfg)?,
    };

    match cli.command {
        Commands::Open { path } => {
            if !path.is_file() {
                bail!("no such file: {}", path.display());
            }
            run_pick(&app, &PathPicker::new(path)).await?;
        }
        Commands::Pick => {
            run_pick(&app, &StdinPicker).await?;
        }
        Commands::Fetch { url, name } => {
            let result = app.orchestrator.open_url(&url, name.as_deref()).await?;
            report(result)?;
        }
        Commands::New { kind } => {
            let kind = DocumentKind::parse(&kind)
                .with_context(|| format!("unknown document kind '{}'", kind))?;
            let result = app.orchestrator.create_new(kind).await?;
            report(result)?;
        }
        Commands::Stream { path } => {
            run_stream(&app, &path).await?;
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            server::run_server(&bind, app.server_state()).await?;
        }
        Commands::Guide { action } => match action {
            GuideAction::Status => {
                let dismissed = app.flags.get_flag(MENU_GUIDE_DISMISSED_KEY);
                println!("menu guide dismissed: {}", dismissed);
            }
            GuideAction::Reset => {
                app.flags.clear()?;
                println!("menu guide reset");
            }
        },
    }

    Ok(())
}
