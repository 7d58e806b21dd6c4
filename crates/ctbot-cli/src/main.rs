#![deny(unsafe_code)]

//! ctbot CLI: runs the daemon and talks to it over IPC.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ctbot_chat::{ChatService, pump_lines};
use ctbot_config::AppConfig;
use ctbot_core::ipc::{IpcClient, IpcClientError};
use ctbot_core::{CommandParser, CommandRouter, Daemon, DocCorpus, MappingIndex, RouteOutcome};

/// ctbot: module event notifications and documentation lookups for chat.
#[derive(Parser, Debug)]
#[command(name = "ctbot", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "ctbot.toml", global = true)]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the daemon in the foreground.
    Start {
        /// Read chat lines from stdin as author `console`.
        #[arg(long)]
        console: bool,
    },

    /// Stop a running daemon.
    Stop,

    /// Show daemon status.
    Status,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Answer one command offline and print the reply as JSON.
    Query {
        /// Shown in the reply footer.
        #[arg(long, default_value = "cli")]
        author: String,

        /// The command line; the prefix may be omitted.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, &config.logging.level))),
        )
        .init();

    match cli.command {
        Commands::Start { console } => cmd_start(config, console).await?,
        Commands::Stop => cmd_stop(&config).await?,
        Commands::Status => cmd_status(&config).await?,
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
        Commands::Query { author, line } => cmd_query(&config, &line.join(" "), &author).await?,
    }

    Ok(())
}

/// `-v` flags override the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

async fn cmd_start(config: AppConfig, console: bool) -> Result<()> {
    let daemon = Daemon::from_config(config)
        .await
        .context("failed to start ctbot daemon")?;

    if !console {
        daemon.run().await?;
        return Ok(());
    }

    let (service, handle) = ChatService::from_config(daemon.message_sender(), daemon.config());
    let chat = tokio::spawn(service.run());
    let pump_handle = handle.clone();
    let pump = tokio::spawn(async move {
        match pump_lines(BufReader::new(tokio::io::stdin()), &pump_handle).await {
            Ok(lines) => info!(lines, "Console input closed"),
            Err(e) => warn!(error = %e, "Console input stopped"),
        }
    });

    let result = daemon.run().await;
    pump.abort();
    let _ = handle.shutdown().await;
    let _ = chat.await;
    result?;
    Ok(())
}

async fn cmd_stop(config: &AppConfig) -> Result<()> {
    let client = IpcClient::new(&config.daemon.socket_path);
    match client.stop().await {
        Ok(resp) => println!("{}", resp.message),
        Err(IpcClientError::NotRunning(path)) => {
            println!("ctbot daemon is not running (no socket at {})", path.display());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn cmd_status(config: &AppConfig) -> Result<()> {
    let client = IpcClient::new(&config.daemon.socket_path);
    let status = match client.status().await {
        Ok(status) => status,
        Err(IpcClientError::NotRunning(_)) => {
            println!("ctbot daemon is not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("ctbot {} (pid {})", status.version, status.pid);
    println!("  uptime:    {}s", status.uptime_secs);
    println!("  prefix:    {}", status.command_prefix);
    println!("  sink:      {}", status.notify_sink);
    if status.stream_enabled {
        let state = if status.stats.stream_connected { "connected" } else { "reconnecting" };
        println!("  stream:    {} ({state})", status.stream_url);
    } else {
        println!("  stream:    disabled");
    }
    println!("  doc terms: {}", status.doc_terms);
    match status.mapping_entries {
        Some(n) => println!("  mappings:  {n}"),
        None => println!("  mappings:  remote"),
    }
    println!(
        "  events:    {} dispatched, {} frames rejected, {} reconnects",
        status.stats.events_dispatched, status.stats.frames_rejected, status.stats.reconnects
    );
    println!(
        "  commands:  {} handled, {} usage errors, {} failed sends",
        status.stats.commands_handled, status.stats.usage_errors, status.stats.notify_failures
    );
    Ok(())
}

fn cmd_config(path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render configuration")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", path.display());
    }
    Ok(())
}

async fn cmd_query(config: &AppConfig, line: &str, author: &str) -> Result<()> {
    let outcome = route_offline(config, line, author).await?;
    match outcome.notification() {
        Some(notification) => println!("{}", serde_json::to_string_pretty(notification)?),
        None => eprintln!("`{line}` is not a known command"),
    }
    Ok(())
}

/// Load the corpora from disk and route one line without a running daemon.
async fn route_offline(config: &AppConfig, line: &str, author: &str) -> Result<RouteOutcome> {
    let docs = DocCorpus::load(Path::new(&config.corpus.docs_path)).await?;
    let mappings = MappingIndex::load(Path::new(&config.corpus.mappings_path)).await?;
    let router = CommandRouter::new(
        CommandParser::new(config.commands.prefix.clone()),
        config.commands.javadocs_limit,
        Arc::new(docs),
        Arc::new(mappings),
    );

    let line = if line.starts_with(router.prefix()) {
        line.to_string()
    } else {
        format!("{}{line}", router.prefix())
    };
    Ok(router.handle(&line, author))
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        AppConfig::load(path)
            .await
            .with_context(|| format!("invalid configuration at {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}
