// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Startup migration pass.
//!
//! Earlier releases created data point records with inconsistent type/role
//! metadata. This pass runs once before the transport connects and normalizes
//! every data point record (value and suffix alike) to a string-typed text
//! role. Individual record failures are logged and skipped; an enumeration
//! failure aborts the pass without blocking startup.

use crate::store::{StateStore, StateType};

/// Records under this prefix are bridge-internal (e.g. the connection
/// indicator) and keep their declared types.
const RESERVED_PREFIX: &str = "info.";

/// Run the migration pass. Returns the number of records normalized.
pub fn run<S: StateStore>(store: &S) -> usize {
    let ids = match store.state_ids() {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!("state enumeration failed, skipping migration: {}", err);
            return 0;
        }
    };

    let mut normalized = 0;
    for id in ids {
        if id.starts_with(RESERVED_PREFIX) {
            continue;
        }
        let mut segments = id.split('.');
        let has_dp = matches!(
            (segments.next(), segments.next()),
            (Some(_), Some(dp)) if !dp.is_empty()
        );
        if !has_dp {
            continue;
        }

        match normalize_record(store, &id) {
            Ok(true) => normalized += 1,
            Ok(false) => {}
            Err(err) => tracing::warn!("skipping migration of {}: {}", id, err),
        }
    }

    if normalized > 0 {
        tracing::info!("normalized metadata of {} state records", normalized);
    }
    normalized
}

fn normalize_record<S: StateStore>(store: &S, id: &str) -> Result<bool, crate::store::StoreError> {
    let Some(mut meta) = store.get_meta(id)? else {
        return Ok(false);
    };

    let mut changed = false;
    if meta.state_type != StateType::String {
        meta.state_type = StateType::String;
        changed = true;
    }
    // Only an unset or generic role is rewritten; anything deliberate stays.
    if meta.role.is_empty() || meta.role == "state" {
        meta.role = "text".to_string();
        changed = true;
    }

    if changed {
        store.set_meta(id, meta)?;
    }
    Ok(changed)
}
