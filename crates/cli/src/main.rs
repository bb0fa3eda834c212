//! vigil — operational CLI for the alerting engine.
//!
//! The engine itself is embedded as a library together with a script
//! sandbox; this binary covers the surface that needs no sandbox:
//! validating a configuration file and probing notification channels.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use vigil_core::Config;
use vigil_notify::Dispatcher;

// ── CLI ─────────────────────────────────────────────────────────────

/// Scriptable monitoring and alerting engine.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, env = "VIGIL_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and list scripts and channels.
    Check,
    /// Send a test notification through a named channel.
    TestChannel {
        /// Channel name as configured under `channels`.
        #[arg(long)]
        channel: String,
    },
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    config.validate().context("validating config")?;
    info!(path = %cli.config.display(), "loaded configuration");

    match cli.command {
        Command::Check => check(&config),
        Command::TestChannel { channel } => test_channel(&config, &channel).await,
    }
}

fn check(config: &Config) -> anyhow::Result<()> {
    let scripts = config.load_scripts().context("loading scripts")?;

    println!("configuration OK");
    println!("scheduler: every {}s", config.scheduler.interval_secs);

    println!("channels ({}):", config.channel_names().len());
    for name in config.channel_names() {
        println!("  - {name}");
    }

    println!("scripts ({}):", scripts.len());
    for script in &scripts {
        let state = if script.ignore { " (ignored)" } else { "" };
        println!("  - {}{} -> {}", script.name, state, script.channels.join(","));
    }

    Ok(())
}

async fn test_channel(config: &Config, channel: &str) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_config(&config.channels, config.scheduler.send_timeout())
        .context("building notification channels")?;

    dispatcher
        .test_channel(channel)
        .await
        .with_context(|| format!("test notification via '{channel}' failed"))?;

    println!("test notification sent via '{channel}'");
    Ok(())
}
