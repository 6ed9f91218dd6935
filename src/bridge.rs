// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronization core.
//!
//! Inbound: transport message -> topic codec -> registry -> suffix gate ->
//! store write (acknowledged). Outbound: store change -> echo filter ->
//! suffix resolution -> command topic -> publish -> acknowledged write-back.
//!
//! Every bridge-originated store write carries `ack == true`; outbound sync
//! ignores acknowledged notifications, which is the mechanism preventing
//! publish loops.

use crate::config::BridgeConfig;
use crate::registry::DataPointRegistry;
use crate::stats::BridgeStats;
use crate::store::{StateStore, StateValue, StoreError};
use crate::suffix::{SuffixResolver, SUFFIX_MARKER};
use crate::topic;
use crate::transport::{CommandSink, TransportError};
use std::sync::Arc;
use thiserror::Error;

/// Bridge errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("publish error: {0}")]
    Publish(#[from] TransportError),
}

/// Bidirectional plate/store synchronizer.
pub struct Bridge<S, P> {
    base_topic: String,
    namespace: String,
    store: Arc<S>,
    sink: P,
    resolver: SuffixResolver<S>,
    registry: DataPointRegistry<S>,
    stats: Arc<BridgeStats>,
}

impl<S: StateStore, P: CommandSink> Bridge<S, P> {
    pub fn new(config: &BridgeConfig, store: Arc<S>, sink: P) -> Self {
        Self {
            base_topic: config.base_topic.clone(),
            namespace: config.name.clone(),
            resolver: SuffixResolver::new(Arc::clone(&store)),
            registry: DataPointRegistry::new(Arc::clone(&store)),
            store,
            sink,
            stats: Arc::new(BridgeStats::new()),
        }
    }

    /// Statistics counters, shared with reporting tasks.
    pub fn stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }

    /// The suffix resolver, shared entry point for cache reads and writes.
    pub fn resolver(&self) -> &SuffixResolver<S> {
        &self.resolver
    }

    /// Inbound sync: mirror a transport message into the store.
    ///
    /// Unrecognized topics and attribute mismatches are discarded silently;
    /// they are expected noise, not errors.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> Result<(), BridgeError> {
        self.stats.record_received();

        let Some(parsed) = topic::parse_state_topic(&self.base_topic, topic) else {
            self.stats.record_filtered();
            return Ok(());
        };
        if parsed.dp.is_empty() {
            self.stats.record_filtered();
            return Ok(());
        }

        self.registry
            .ensure(&parsed.plate, &parsed.dp, &self.resolver)?;

        let active = self.resolver.get_suffix(&parsed.plate, &parsed.dp)?;
        let attr = parsed.attr.trim_start_matches('.');
        if !attr.is_empty() && attr != active.trim_start_matches('.') {
            tracing::debug!(
                "{}.{}: attribute '{}' does not match active suffix '{}'",
                parsed.plate,
                parsed.dp,
                attr,
                active
            );
            self.stats.record_filtered();
            return Ok(());
        }

        let text = String::from_utf8_lossy(payload).into_owned();
        self.store.set_state(
            &format!("{}.{}", parsed.plate, parsed.dp),
            StateValue::acked(text),
        )?;
        self.stats.record_accepted();
        Ok(())
    }

    /// Outbound sync: mirror an operator-originated store change onto the
    /// wire.
    ///
    /// `id` is the namespaced record identifier; `state` is `None` for a
    /// deleted record.
    pub fn on_state_change(&self, id: &str, state: Option<&StateValue>) -> Result<(), BridgeError> {
        let Some(state) = state else {
            return Ok(());
        };
        // Echo suppression: bridge-originated writes arrive acknowledged.
        if state.ack {
            return Ok(());
        }

        let Some(relative) = id.strip_prefix(&format!("{}.", self.namespace)) else {
            return Ok(());
        };

        let mut segments = relative.split('.');
        let (Some(plate), Some(dp)) = (segments.next(), segments.next()) else {
            return Ok(());
        };
        if plate.is_empty() || dp.is_empty() {
            return Ok(());
        }

        if let Some(dp) = dp.strip_suffix(SUFFIX_MARKER) {
            // Suffix record written by an operator: adopt the new active
            // suffix. Terminal, no command publish.
            self.resolver.set_suffix(plate, dp, &state.as_text())?;
            return Ok(());
        }

        let suffix = self.resolver.get_suffix(plate, dp)?;
        let command = topic::build_command_topic(&self.base_topic, plate, dp, &suffix);
        let payload = state.as_text();

        match self.sink.publish(&command, &payload) {
            Ok(()) => {
                tracing::debug!("published {} = {}", command, payload);
                self.stats.record_published();
            }
            Err(err) => {
                tracing::warn!("command publish to {} failed: {}", command, err);
                self.stats.record_error();
            }
        }

        // Finalize echo suppression and normalize the stored value to its
        // string form, regardless of the publish outcome.
        self.store
            .set_state(relative, StateValue::acked(payload))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Mutex;

    /// Records publishes instead of talking to a broker.
    struct RecordingSink {
        published: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn published(&self) -> Vec<(String, String)> {
            self.published.lock().unwrap().clone()
        }
    }

    impl CommandSink for RecordingSink {
        fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Unavailable("request channel full".into()));
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn bridge_with(sink: RecordingSink) -> (Arc<MemoryStore>, Bridge<MemoryStore, RecordingSink>) {
        let config = BridgeConfig::default();
        let store = Arc::new(MemoryStore::new(config.name.as_str()));
        let bridge = Bridge::new(&config, Arc::clone(&store), sink);
        (store, bridge)
    }

    fn bridge() -> (Arc<MemoryStore>, Bridge<MemoryStore, RecordingSink>) {
        bridge_with(RecordingSink::new())
    }

    #[test]
    fn test_inbound_default_suffix_accepts_val() {
        // Scenario: state topic with `.val` attribute under the default
        // suffix updates the mirrored value, acknowledged.
        let (store, bridge) = bridge();

        bridge
            .handle_message("hasp/plate1/state/p1b1.val", b"on")
            .expect("handle");

        let state = store
            .get_state("plate1.p1b1")
            .expect("get")
            .expect("written");
        assert_eq!(state.as_text(), "on");
        assert!(state.ack);
    }

    #[test]
    fn test_inbound_no_attribute_accepts() {
        let (store, bridge) = bridge();

        bridge
            .handle_message("hasp/plate1/state/p1b1", b"off")
            .expect("handle");

        let state = store.get_state("plate1.p1b1").expect("get").expect("some");
        assert_eq!(state.as_text(), "off");
    }

    #[test]
    fn test_inbound_mismatched_attribute_registers_but_skips() {
        // Scenario: `/bri` attribute with active suffix `val` does not update
        // the value, but the data point is still registered.
        let (store, bridge) = bridge();

        bridge
            .handle_message("hasp/plate1/state/p1b1/bri", b"128")
            .expect("handle");

        assert!(store.get_state("plate1.p1b1").expect("get").is_none());
        assert!(store.get_meta("plate1.p1b1").expect("meta").is_some());
        assert!(store.get_meta("plate1.p1b1_suffix").expect("meta").is_some());
    }

    #[test]
    fn test_inbound_matches_configured_suffix() {
        let (store, bridge) = bridge();
        bridge.resolver().set_suffix("plate1", "p1b1", "bri").expect("set");

        bridge
            .handle_message("hasp/plate1/state/p1b1/bri", b"128")
            .expect("handle");
        let state = store.get_state("plate1.p1b1").expect("get").expect("some");
        assert_eq!(state.as_text(), "128");

        bridge
            .handle_message("hasp/plate1/state/p1b1.val", b"on")
            .expect("handle");
        // `val` no longer matches.
        let state = store.get_state("plate1.p1b1").expect("get").expect("some");
        assert_eq!(state.as_text(), "128");
    }

    #[test]
    fn test_inbound_ignores_foreign_topics() {
        let (store, bridge) = bridge();

        bridge
            .handle_message("other/plate1/state/p1b1", b"on")
            .expect("handle");
        bridge
            .handle_message("hasp/plate1/command/p1b1", b"on")
            .expect("handle");
        bridge
            .handle_message("hasp/plate1/state", b"on")
            .expect("handle");

        assert!(store.state_ids().expect("ids").is_empty());
    }

    #[test]
    fn test_outbound_publishes_with_active_suffix() {
        // Scenario: local unacknowledged write with active suffix `bri`
        // publishes to the command topic, then re-writes acknowledged.
        let (store, bridge) = bridge();
        bridge.resolver().set_suffix("plate1", "p1b1", "bri").expect("set");

        bridge
            .on_state_change("hasp.plate1.p1b1", Some(&StateValue::unacked(50)))
            .expect("change");

        assert_eq!(
            bridge.sink.published(),
            vec![("hasp/plate1/command/p1b1.bri".to_string(), "50".to_string())]
        );
        let state = store.get_state("plate1.p1b1").expect("get").expect("some");
        assert_eq!(state.val, serde_json::Value::String("50".to_string()));
        assert!(state.ack);
    }

    #[test]
    fn test_outbound_ignores_acknowledged_writes() {
        // Echo suppression: a bridge-originated write never publishes.
        let (_store, bridge) = bridge();

        bridge
            .on_state_change("hasp.plate1.p1b1", Some(&StateValue::acked("on")))
            .expect("change");

        assert!(bridge.sink.published().is_empty());
    }

    #[test]
    fn test_inbound_write_does_not_echo() {
        let (store, bridge) = bridge();

        bridge
            .handle_message("hasp/plate1/state/p1b1.val", b"on")
            .expect("handle");
        let written = store.get_state("plate1.p1b1").expect("get").expect("some");
        bridge
            .on_state_change("hasp.plate1.p1b1", Some(&written))
            .expect("change");

        assert!(bridge.sink.published().is_empty());
    }

    #[test]
    fn test_outbound_ignores_deleted_and_foreign() {
        let (_store, bridge) = bridge();

        bridge.on_state_change("hasp.plate1.p1b1", None).expect("deleted");
        bridge
            .on_state_change("other.plate1.p1b1", Some(&StateValue::unacked("x")))
            .expect("foreign");
        bridge
            .on_state_change("hasp.loneid", Some(&StateValue::unacked("x")))
            .expect("malformed");

        assert!(bridge.sink.published().is_empty());
    }

    #[test]
    fn test_outbound_suffix_write_updates_cache_without_publish() {
        // Scenario: operator write to the suffix record becomes the active
        // suffix; no command is published.
        let (store, bridge) = bridge();

        bridge
            .on_state_change(
                "hasp.plate1.p1b1_suffix",
                Some(&StateValue::unacked("custom")),
            )
            .expect("change");

        assert!(bridge.sink.published().is_empty());
        assert_eq!(
            bridge.resolver().get_suffix("plate1", "p1b1").expect("resolve"),
            "custom"
        );
        let persisted = store
            .get_state("plate1.p1b1_suffix")
            .expect("get")
            .expect("some");
        assert!(persisted.ack);
        assert_eq!(persisted.as_text(), "custom");
    }

    #[test]
    fn test_outbound_publish_failure_still_acknowledges() {
        let (store, bridge) = bridge_with(RecordingSink::failing());

        bridge
            .on_state_change("hasp.plate1.p1b1", Some(&StateValue::unacked("50")))
            .expect("change");

        // Publish failed, but the state is still re-written acknowledged so
        // the change is not reprocessed.
        let state = store.get_state("plate1.p1b1").expect("get").expect("some");
        assert!(state.ack);
        assert_eq!(state.as_text(), "50");
        assert_eq!(bridge.stats().snapshot().errors, 1);
    }

    #[test]
    fn test_full_cycle_terminates() {
        // Drive the bridge from a live change feed: an operator write causes
        // exactly one publish, and the acknowledged write-back is suppressed.
        let (store, bridge) = bridge();
        let mut changes = store.subscribe();

        store
            .set_state("plate1.p1b1", StateValue::unacked("on"))
            .expect("set");
        while let Ok(change) = changes.try_recv() {
            bridge
                .on_state_change(&change.id, change.state.as_ref())
                .expect("change");
        }

        assert_eq!(
            bridge.sink.published(),
            vec![("hasp/plate1/command/p1b1.val".to_string(), "on".to_string())]
        );
    }
}
