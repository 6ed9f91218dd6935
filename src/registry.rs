// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data point registry.
//!
//! Ensures every observed data point has its backing store records: a
//! grouping record for the plate, a string-typed value record, and the suffix
//! record. Creation is idempotent; once a key has been registered the store is
//! not touched again for it.

use crate::store::{StateMeta, StateStore, StoreError};
use crate::suffix::{suffix_state_id, SuffixResolver, DEFAULT_SUFFIX, SUFFIX_MARKER};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct DataPointRegistry<S> {
    store: Arc<S>,
    known: Mutex<HashSet<String>>,
}

impl<S: StateStore> DataPointRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            known: Mutex::new(HashSet::new()),
        }
    }

    /// Whether a data point has already been registered in this process.
    pub fn is_known(&self, plate: &str, dp: &str) -> bool {
        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&format!("{}.{}", plate, dp))
    }

    /// Idempotently create the records backing a data point, then eagerly
    /// load its suffix into the resolver cache so subsequent inbound
    /// processing does not incur a store read.
    pub fn ensure(
        &self,
        plate: &str,
        dp: &str,
        resolver: &SuffixResolver<S>,
    ) -> Result<(), StoreError> {
        let key = format!("{}.{}", plate, dp);
        if self
            .known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
        {
            return Ok(());
        }

        self.store.ensure_group(plate, plate)?;
        self.store.ensure_state(&key, StateMeta::text(dp))?;
        self.store.ensure_state(
            &suffix_state_id(plate, dp),
            StateMeta::text(format!("{}{}", dp, SUFFIX_MARKER)).with_default(DEFAULT_SUFFIX),
        )?;

        resolver.get_suffix(plate, dp)?;

        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key);
        Ok(())
    }
}
