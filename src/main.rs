// src/main.rs - Curtain host: loads covers from config and drives them from stdin
use std::sync::Arc;

use boardlink_curtain::config;
use boardlink_curtain::console::{self, ConsoleCommand, Outcome, ParseError};
use boardlink_curtain::{BroadcastObserver, CoverRegistry, SimulatedTransport};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Parser)]
#[command(name = "curtain-host", version, about = "Simulated IR curtain controller")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "curtains.toml")]
    config: String,

    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::info!("Starting curtain host");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading configuration from: {}", args.config);

    let config = config::load_config(&args.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", args.config, e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;
    if config.covers.is_empty() {
        tracing::warn!("No covers configured in '{}'", args.config);
    }

    let events = BroadcastObserver::new(config.host.event_capacity);
    let mut registry = CoverRegistry::new(
        config.host.clone(),
        Arc::new(SimulatedTransport::default()),
        Arc::new(events.clone()),
    );
    for cover in &config.covers {
        match SimulatedTransport::for_cover(cover) {
            Some(transport) => registry.register_with_transport(cover, Arc::new(transport))?,
            None => registry.register(cover)?,
        };
    }

    // Report every published position.
    let mut updates = events.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(snapshot) => tracing::info!(
                    "{}: {:.1}% {:?}{}",
                    snapshot.name,
                    snapshot.position,
                    snapshot.motion_state,
                    if snapshot.is_closed { " (closed)" } else { "" }
                ),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("State log fell behind, skipped {} updates", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };
        match console::execute(&registry, command).await {
            Ok(Outcome::Reply(reply)) => println!("{}", reply),
            Ok(Outcome::Quit) => break,
            Err(e) => println!("error: {}", e),
        }
    }

    tracing::info!("Shutting down {} curtain(s)", registry.len());
    registry.shutdown_all().await;
    Ok(())
}
