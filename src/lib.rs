// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MQTT bridge for openHASP-style display panels.
//!
//! Mirrors data points reported by remote panels ("plates") into a local
//! key/value state store, and mirrors operator writes back out as command
//! messages.
//!
//! # Features
//!
//! - **Topic Codec**: parse inbound state topics, build outbound command
//!   topics
//! - **Suffix Selection**: per data point, choose which reported attribute is
//!   mirrored as the canonical value (default `val`)
//! - **Echo Suppression**: bridge-originated writes are acknowledged and
//!   never re-published, preventing command loops
//! - **Lazy Registration**: data points get their backing records on first
//!   sight, idempotently
//!
//! # Quick Start
//!
//! ```bash
//! # Bridge a broker into the local store
//! hasp-bridge --host broker.local
//!
//! # Using a config file
//! hasp-bridge --config bridge.toml
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! host = "broker.local"
//! port = 1883
//! base_topic = "hasp"
//! username = "panel"
//! password = "secret"
//! tls = false
//! ```

pub mod bridge;
pub mod config;
pub mod migrate;
pub mod registry;
pub mod stats;
pub mod store;
pub mod suffix;
pub mod topic;
pub mod transport;

pub use bridge::{Bridge, BridgeError};
pub use config::{BridgeConfig, ConfigError};
pub use registry::DataPointRegistry;
pub use stats::{BridgeStats, BridgeStatsSnapshot};
pub use store::{
    MemoryStore, StateChange, StateMeta, StateStore, StateType, StateValue, StoreError,
    CONNECTION_STATE_ID,
};
pub use suffix::{SuffixCache, SuffixResolver, DEFAULT_SUFFIX, SUFFIX_MARKER};
pub use topic::{build_command_topic, parse_state_topic, StateTopic};
pub use transport::{CommandSink, MqttCommandSink, TransportError};
