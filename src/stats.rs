// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for a running bridge.
#[derive(Debug)]
pub struct BridgeStats {
    /// Inbound messages received from the transport.
    pub messages_received: AtomicU64,

    /// Inbound messages written into the store.
    pub values_accepted: AtomicU64,

    /// Inbound messages discarded (foreign topic, empty data point, or
    /// attribute not matching the active suffix).
    pub messages_filtered: AtomicU64,

    /// Outbound command messages published.
    pub commands_published: AtomicU64,

    /// Errors encountered.
    pub errors: AtomicU64,

    /// Creation time.
    pub created: Instant,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            values_accepted: AtomicU64::new(0),
            messages_filtered: AtomicU64::new(0),
            commands_published: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.values_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.messages_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.commands_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the current counters.
    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            values_accepted: self.values_accepted.load(Ordering::Relaxed),
            messages_filtered: self.messages_filtered.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            uptime_secs: self.created.elapsed().as_secs(),
        }
    }
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of bridge statistics.
#[derive(Debug, Clone)]
pub struct BridgeStatsSnapshot {
    pub messages_received: u64,
    pub values_accepted: u64,
    pub messages_filtered: u64,
    pub commands_published: u64,
    pub errors: u64,
    pub uptime_secs: u64,
}

impl BridgeStatsSnapshot {
    /// Inbound message rate since startup.
    pub fn messages_per_second(&self) -> f64 {
        if self.uptime_secs > 0 {
            self.messages_received as f64 / self.uptime_secs as f64
        } else {
            0.0
        }
    }
}
