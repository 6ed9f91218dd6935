// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Active suffix resolution.
//!
//! Every data point has an "active suffix" naming which inbound attribute
//! updates its mirrored value (default `val`). The suffix is persisted as its
//! own state record (`plate.dp_suffix`) and mirrored by an in-process cache so
//! inbound processing does not pay a store read per message.
//!
//! Cache entries never expire implicitly; only a suffix write through
//! [`SuffixResolver::set_suffix`] replaces them.

use crate::store::{StateStore, StateValue, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Attribute mirrored into the value record when no suffix was configured.
pub const DEFAULT_SUFFIX: &str = "val";

/// Identifier marker distinguishing suffix records from value records.
pub const SUFFIX_MARKER: &str = "_suffix";

/// Relative identifier of the suffix record for a data point.
pub fn suffix_state_id(plate: &str, dp: &str) -> String {
    format!("{}.{}{}", plate, dp, SUFFIX_MARKER)
}

/// In-process mirror of the persisted suffix records.
///
/// Owned by the resolver rather than ambient global state, so it can be
/// tested in isolation and swapped out.
#[derive(Debug, Default)]
pub struct SuffixCache {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl SuffixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached suffix for a data point.
    pub fn get(&self, plate: &str, dp: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(plate.to_string(), dp.to_string()))
            .cloned()
    }

    /// Insert or replace the cached suffix for a data point.
    pub fn insert(&self, plate: &str, dp: &str, suffix: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((plate.to_string(), dp.to_string()), suffix.into());
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves and persists the active suffix per data point.
pub struct SuffixResolver<S> {
    store: Arc<S>,
    cache: SuffixCache,
}

impl<S: StateStore> SuffixResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_cache(store, SuffixCache::new())
    }

    /// Build a resolver around an externally owned cache.
    pub fn with_cache(store: Arc<S>, cache: SuffixCache) -> Self {
        Self { store, cache }
    }

    /// The backing cache.
    pub fn cache(&self) -> &SuffixCache {
        &self.cache
    }

    /// Resolve the active suffix, cache-first.
    ///
    /// On a miss the persisted suffix record is read and cached; an absent or
    /// null record resolves to [`DEFAULT_SUFFIX`].
    pub fn get_suffix(&self, plate: &str, dp: &str) -> Result<String, StoreError> {
        if let Some(suffix) = self.cache.get(plate, dp) {
            return Ok(suffix);
        }

        let suffix = match self.store.get_state(&suffix_state_id(plate, dp))? {
            Some(state) if !state.val.is_null() => state.as_text(),
            _ => DEFAULT_SUFFIX.to_string(),
        };

        self.cache.insert(plate, dp, suffix.clone());
        Ok(suffix)
    }

    /// Update the active suffix.
    ///
    /// The value is trimmed, the cache updated, and the persisted record
    /// written acknowledged so the pure-metadata write does not re-trigger a
    /// command publish.
    pub fn set_suffix(&self, plate: &str, dp: &str, suffix: &str) -> Result<(), StoreError> {
        let trimmed = suffix.trim().to_string();
        self.cache.insert(plate, dp, trimmed.clone());
        self.store
            .set_state(&suffix_state_id(plate, dp), StateValue::acked(trimmed))
    }
}
