// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MQTT transport adapter.
//!
//! Wraps the `rumqttc` client: builds the connection from the validated
//! configuration, re-establishes the state subscription on every CONNACK,
//! mirrors the connection status into the well-known indicator record, and
//! dispatches inbound publishes to the bridge.
//!
//! Reconnection is the event loop's own concern; the bridge never retries a
//! failed publish.

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::store::{StateStore, StateValue, CONNECTION_STATE_ID};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Outbound command publisher.
///
/// Seam between the synchronization core and the transport, so the bridge can
/// be exercised in tests without a broker.
pub trait CommandSink: Send + Sync {
    /// Publish a command payload. Failures are reported, never retried.
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;
}

/// [`CommandSink`] backed by a live MQTT client.
#[derive(Clone)]
pub struct MqttCommandSink {
    client: AsyncClient,
}

impl MqttCommandSink {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl CommandSink for MqttCommandSink {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }
}

/// Build the MQTT client and event loop from the configuration.
pub fn connect(config: &BridgeConfig) -> (AsyncClient, EventLoop) {
    let client_id = format!("{}-{}", config.name, std::process::id());
    let mut options = MqttOptions::new(client_id, &config.host, config.port);
    options.set_keep_alive(KEEP_ALIVE);

    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.as_deref().unwrap_or(""));
    }
    if config.tls {
        options.set_transport(Transport::tls_with_default_config());
    }

    AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY)
}

/// Drive the MQTT event loop.
///
/// Runs until the surrounding task is dropped. Every failure is converted
/// into log output; the loop itself never gives up.
pub async fn run<S: StateStore>(
    config: BridgeConfig,
    bridge: Arc<Bridge<S, MqttCommandSink>>,
    store: Arc<S>,
    client: AsyncClient,
    mut event_loop: EventLoop,
) {
    let filter = format!("{}/+/state/#", config.base_topic);
    let mut connected = false;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("connected to {}:{}", config.host, config.port);
                if let Err(err) = client.try_subscribe(&filter, QoS::AtMostOnce) {
                    tracing::warn!("subscribe to {} failed: {}", filter, err);
                }
                connected = true;
                set_connection_state(&*store, true);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Err(err) = bridge.handle_message(&publish.topic, &publish.payload) {
                    tracing::warn!("inbound message on {} failed: {}", publish.topic, err);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::warn!("broker requested disconnect");
                connected = false;
                set_connection_state(&*store, false);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("MQTT connection error: {}", err);
                if connected {
                    connected = false;
                    set_connection_state(&*store, false);
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

fn set_connection_state<S: StateStore>(store: &S, up: bool) {
    if let Err(err) = store.set_state(CONNECTION_STATE_ID, StateValue::acked(up)) {
        tracing::warn!("failed to update connection indicator: {}", err);
    }
}
