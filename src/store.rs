// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State store abstraction.
//!
//! Defines the trait the bridge uses to talk to its key/value state store,
//! plus the record shapes it creates. Record identifiers are relative to the
//! bridge namespace (`plate.dp`); change notifications carry the namespaced
//! identifier.
//!
//! # Implementations
//!
//! - [`MemoryStore`] -- In-process store with change notifications, also used
//!   throughout the test suite.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

/// Well-known record mirroring the transport connection status.
///
/// Boolean, read-only, default false; set true on connect and false on
/// disconnect or error-close.
pub const CONNECTION_STATE_ID: &str = "info.connection";

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Declared type of a state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    String,
    Number,
    Bool,
    Mixed,
}

/// A state record value with its acknowledgement flag.
///
/// `ack == true` marks a bridge-originated write; the outbound sync path
/// ignores acknowledged change notifications to prevent publish echo loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateValue {
    pub val: serde_json::Value,
    pub ack: bool,
}

impl StateValue {
    /// A bridge-originated (acknowledged) value.
    pub fn acked(val: impl Into<serde_json::Value>) -> Self {
        Self {
            val: val.into(),
            ack: true,
        }
    }

    /// An operator-originated (unacknowledged) value.
    pub fn unacked(val: impl Into<serde_json::Value>) -> Self {
        Self {
            val: val.into(),
            ack: false,
        }
    }

    /// Stringified form used for wire payloads. Strings pass through
    /// unquoted; null becomes the empty string.
    pub fn as_text(&self) -> String {
        match &self.val {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Metadata of a state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMeta {
    pub name: String,
    pub state_type: StateType,
    pub role: String,
    pub read: bool,
    pub write: bool,
    pub default: Option<serde_json::Value>,
}

impl StateMeta {
    /// A string-typed, read-write text record with an empty default.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state_type: StateType::String,
            role: "text".to_string(),
            read: true,
            write: true,
            default: Some(serde_json::Value::String(String::new())),
        }
    }

    /// Override the default value.
    pub fn with_default(mut self, default: impl Into<serde_json::Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The read-only boolean record backing [`CONNECTION_STATE_ID`].
    pub fn connection_indicator() -> Self {
        Self {
            name: "connected".to_string(),
            state_type: StateType::Bool,
            role: "indicator.connected".to_string(),
            read: true,
            write: false,
            default: Some(serde_json::Value::Bool(false)),
        }
    }
}

/// A state change notification.
///
/// `id` is the namespaced identifier (`<namespace>.<plate>.<dp>`); `state` is
/// `None` when the record was deleted.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub id: String,
    pub state: Option<StateValue>,
}

/// Abstract state store interface.
///
/// Creation operations are idempotent: creating a record that already exists
/// is a no-op and must not fail.
pub trait StateStore: Send + Sync {
    /// Idempotently create a grouping record (one per plate).
    fn ensure_group(&self, id: &str, name: &str) -> Result<(), StoreError>;

    /// Idempotently create a state record with the given metadata.
    fn ensure_state(&self, id: &str, meta: StateMeta) -> Result<(), StoreError>;

    /// Read the current value of a record, `None` if never written.
    fn get_state(&self, id: &str) -> Result<Option<StateValue>, StoreError>;

    /// Write a record value.
    fn set_state(&self, id: &str, value: StateValue) -> Result<(), StoreError>;

    /// Enumerate all state record identifiers in the namespace.
    fn state_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Read record metadata, `None` for unknown records.
    fn get_meta(&self, id: &str) -> Result<Option<StateMeta>, StoreError>;

    /// Replace record metadata.
    fn set_meta(&self, id: &str, meta: StateMeta) -> Result<(), StoreError>;
}

/// In-process state store.
///
/// Keeps records in memory and fans every `set_state` out to subscribed
/// change listeners, which is what drives the outbound sync path.
pub struct MemoryStore {
    namespace: String,
    states: Mutex<HashMap<String, StateValue>>,
    metas: Mutex<HashMap<String, StateMeta>>,
    groups: Mutex<HashSet<String>>,
    watchers: Mutex<Vec<mpsc::UnboundedSender<StateChange>>>,
}

impl MemoryStore {
    /// Create a store rooted at the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            states: Mutex::new(HashMap::new()),
            metas: Mutex::new(HashMap::new()),
            groups: Mutex::new(HashSet::new()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// The namespace change notifications are prefixed with.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Subscribe to change notifications for every record in the store.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StateChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    fn notify(&self, id: &str, state: Option<StateValue>) {
        let change = StateChange {
            id: format!("{}.{}", self.namespace, id),
            state,
        };
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

impl StateStore for MemoryStore {
    fn ensure_group(&self, id: &str, _name: &str) -> Result<(), StoreError> {
        self.groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string());
        Ok(())
    }

    fn ensure_state(&self, id: &str, meta: StateMeta) -> Result<(), StoreError> {
        self.metas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.to_string())
            .or_insert(meta);
        Ok(())
    }

    fn get_state(&self, id: &str) -> Result<Option<StateValue>, StoreError> {
        Ok(self
            .states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned())
    }

    fn set_state(&self, id: &str, value: StateValue) -> Result<(), StoreError> {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), value.clone());
        self.notify(id, Some(value));
        Ok(())
    }

    fn state_ids(&self) -> Result<Vec<String>, StoreError> {
        let metas = self.metas.lock().unwrap_or_else(|e| e.into_inner());
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: HashSet<String> = metas.keys().cloned().collect();
        ids.extend(states.keys().cloned());
        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();
        Ok(ids)
    }

    fn get_meta(&self, id: &str) -> Result<Option<StateMeta>, StoreError> {
        Ok(self
            .metas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned())
    }

    fn set_meta(&self, id: &str, meta: StateMeta) -> Result<(), StoreError> {
        self.metas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), meta);
        Ok(())
    }
}
