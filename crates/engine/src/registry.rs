// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation handles for in-flight runs, keyed by run id.

use parking_lot::Mutex;
use rb_core::RunId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared map from run id to that run's cancellation token.
///
/// The orchestrator registers a fresh token per run and removes it when the
/// run is finalized; `cancel` lets an outer surface stop a run by id.
#[derive(Clone, Default)]
pub struct RunRegistry {
    inner: Arc<Mutex<HashMap<RunId, CancellationToken>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, run_id: &RunId) -> CancellationToken {
        let token = CancellationToken::new();
        self.inner.lock().insert(run_id.clone(), token.clone());
        token
    }

    /// Set the run's token. Returns false for unknown or finished runs.
    pub fn cancel(&self, run_id: &RunId) -> bool {
        match self.inner.lock().get(run_id) {
            Some(token) => {
                tracing::info!(%run_id, "cancel requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn token(&self, run_id: &RunId) -> Option<CancellationToken> {
        self.inner.lock().get(run_id).cloned()
    }

    pub fn remove(&self, run_id: &RunId) -> Option<CancellationToken> {
        self.inner.lock().remove(run_id)
    }

    pub fn active(&self) -> Vec<RunId> {
        self.inner.lock().keys().cloned().collect()
    }
}

/// Removes a run from the registry when dropped.
pub(crate) struct Registration {
    registry: RunRegistry,
    run_id: RunId,
}

impl Registration {
    pub(crate) fn new(registry: RunRegistry, run_id: RunId) -> Self {
        Self { registry, run_id }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.run_id);
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
