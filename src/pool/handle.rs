use std::fmt;
use std::sync::{Arc, RwLock};

use super::backend::PoolBackend;
use super::state::PoolState;
use crate::config::Target;

/// One generation of a target's connection pool.
///
/// Handles are shared by every request that acquired them. Only the
/// [`PoolManager`](super::PoolManager) changes a handle's state; everyone else
/// reads it.
pub struct PoolHandle {
    target: Target,
    generation: u64,
    state: RwLock<PoolState>,
    backend: Arc<dyn PoolBackend>,
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("target", &self.target)
            .field("generation", &self.generation)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PoolHandle {
    pub(crate) fn new(target: Target, generation: u64, backend: Arc<dyn PoolBackend>) -> Self {
        Self {
            target,
            generation,
            state: RwLock::new(PoolState::Connected),
            backend,
        }
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    /// Increases every time the manager builds a new pool for any target.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn backend(&self) -> &dyn PoolBackend {
        self.backend.as_ref()
    }

    /// Apply a state change if the state machine allows it.
    pub(crate) fn transition(&self, next: PoolState) -> bool {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.can_transition_to(next) {
            *guard = next;
            true
        } else {
            false
        }
    }

    /// Fold the backend's health into the handle state and report it.
    pub(crate) fn refresh(&self) -> PoolState {
        if self.state() == PoolState::Connected
            && !self.backend.is_healthy()
            && self.transition(PoolState::Disconnected)
        {
            tracing::warn!(
                target_db = %self.target,
                generation = self.generation,
                "pool reported a broken connection; marking disconnected"
            );
        }
        self.state()
    }

    /// Close the backend and move to the terminal state.
    pub(crate) async fn close(&self) {
        if self.state() == PoolState::Closed {
            return;
        }
        self.backend.close().await;
        self.transition(PoolState::Closed);
        tracing::info!(
            target_db = %self.target,
            generation = self.generation,
            "pool closed"
        );
    }
}
