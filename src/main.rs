// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hasp-bridge CLI
//!
//! Bridges openHASP-style display panels on an MQTT broker into the local
//! state store.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a local broker with defaults
//! hasp-bridge --host localhost
//!
//! # With credentials and TLS
//! hasp-bridge --host broker.local --port 8883 --username panel --password secret --tls
//!
//! # Using a configuration file
//! hasp-bridge --config bridge.toml
//!
//! # Generate an example configuration
//! hasp-bridge gen-config --output bridge.toml
//! ```

use clap::{Parser, Subcommand};
use hasp_bridge::{
    migrate, transport, Bridge, BridgeConfig, BridgeStatsSnapshot, ConfigError, MemoryStore,
    MqttCommandSink, StateMeta, StateStore, StateValue, CONNECTION_STATE_ID,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// openHASP MQTT to state-store bridge
#[derive(Parser, Debug)]
#[command(name = "hasp-bridge")]
#[command(about = "Bridges MQTT display panels into a local key/value state store")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker hostname
    #[arg(long, conflicts_with = "config")]
    host: Option<String>,

    /// Broker port
    #[arg(long, conflicts_with = "config", default_value = "1883")]
    port: u16,

    /// Broker username
    #[arg(long, conflicts_with = "config")]
    username: Option<String>,

    /// Broker password
    #[arg(long, conflicts_with = "config")]
    password: Option<String>,

    /// Base topic (wire namespace of the bridge)
    #[arg(long, conflicts_with = "config", default_value = "hasp")]
    base_topic: String,

    /// Connect over TLS
    #[arg(long, conflicts_with = "config")]
    tls: bool,

    /// Statistics reporting interval (seconds, 0 to disable)
    #[arg(long, default_value = "60")]
    stats_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "bridge.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = build_config(&args)?;
    let store = Arc::new(MemoryStore::new(config.name.as_str()));

    // Connection indicator. Failure here is logged, not fatal; the transport
    // keeps reconnecting on its own.
    if let Err(err) = store.ensure_state(CONNECTION_STATE_ID, StateMeta::connection_indicator()) {
        tracing::warn!("could not create connection indicator: {}", err);
    }
    if let Err(err) = store.set_state(CONNECTION_STATE_ID, StateValue::acked(false)) {
        tracing::warn!("could not reset connection indicator: {}", err);
    }

    // Normalize metadata of records left behind by earlier runs, before the
    // transport connects.
    migrate::run(&*store);

    let (client, event_loop) = transport::connect(&config);
    let bridge = Arc::new(Bridge::new(
        &config,
        Arc::clone(&store),
        MqttCommandSink::new(client.clone()),
    ));

    println!("hasp-bridge v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Bridging {}:{} (base topic '{}') into namespace '{}'",
        config.host, config.port, config.base_topic, config.name
    );
    println!("Press Ctrl+C to stop...");

    // Outbound sync: feed store change notifications into the bridge.
    let mut changes = store.subscribe();
    let outbound_bridge = Arc::clone(&bridge);
    tokio::spawn(async move {
        while let Some(change) = changes.recv().await {
            if let Err(err) = outbound_bridge.on_state_change(&change.id, change.state.as_ref()) {
                tracing::warn!("state change for {} failed: {}", change.id, err);
            }
        }
    });

    // Stats reporting task.
    if args.stats_interval > 0 {
        let stats = bridge.stats();
        let interval_secs = args.stats_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await;
            loop {
                interval.tick().await;
                print_stats(&stats.snapshot());
            }
        });
    }

    let transport_task = transport::run(
        config.clone(),
        Arc::clone(&bridge),
        Arc::clone(&store),
        client,
        event_loop,
    );

    tokio::select! {
        _ = transport_task => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    print_stats(&bridge.stats().snapshot());
    Ok(())
}

fn build_config(args: &Args) -> Result<BridgeConfig, ConfigError> {
    if let Some(ref path) = args.config {
        return BridgeConfig::from_file(path);
    }

    let host = args
        .host
        .clone()
        .ok_or_else(|| ConfigError::Invalid("Missing --host (or use --config)".into()))?;

    let mut config = BridgeConfig {
        host,
        port: args.port,
        username: args.username.clone(),
        password: args.password.clone(),
        base_topic: args.base_topic.clone(),
        tls: args.tls,
        log_level: args.log_level.clone(),
        stats_interval_secs: args.stats_interval,
        ..Default::default()
    };
    config.normalize();
    config.validate()?;
    Ok(config)
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = BridgeConfig {
        host: "broker.local".into(),
        username: Some("panel".into()),
        password: Some("secret".into()),
        ..Default::default()
    };

    let toml_str = toml::to_string_pretty(&config)?;
    let content = format!(
        r#"# hasp-bridge configuration
# Generated by hasp-bridge gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match BridgeConfig::from_file(&path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Bridge:     {}", config.name);
            println!(
                "Broker:     {}:{}{}",
                config.host,
                config.port,
                if config.tls { " (TLS)" } else { "" }
            );
            println!("Base topic: {}", config.base_topic);
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_stats(stats: &BridgeStatsSnapshot) {
    println!(
        "--- Bridge Statistics ---\n  {} msgs in ({:.1} msg/s), {} accepted, {} filtered, {} commands out, {} errors",
        stats.messages_received,
        stats.messages_per_second(),
        stats.values_accepted,
        stats.messages_filtered,
        stats.commands_published,
        stats.errors
    );
}
