use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use super::backend::PoolFactory;
use super::handle::PoolHandle;
use super::state::PoolState;
use crate::config::{Target, TargetConfig};
use crate::error::DalError;

type PendingPool = Shared<BoxFuture<'static, Result<Arc<PoolHandle>, DalError>>>;

enum Slot {
    Empty,
    Pending(PendingPool),
    Ready(Arc<PoolHandle>),
    Closed,
}

struct TargetSlot {
    config: TargetConfig,
    slot: Mutex<Slot>,
}

impl TargetSlot {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Owns one lazily-built connection pool per configured [`Target`].
///
/// The first [`acquire`](PoolManager::acquire) for a target builds its pool;
/// later calls reuse it while it stays connected. Concurrent callers racing on
/// a cold or disconnected target all await the same in-flight build, so a
/// target never has more than one pool under construction.
///
/// ```rust,no_run
/// # #[cfg(feature = "mssql")]
/// # async fn demo() -> Result<(), dashboard_dal::DalError> {
/// use std::sync::Arc;
/// use dashboard_dal::prelude::*;
/// use dashboard_dal::mssql::MssqlFactory;
///
/// let pools = PoolManager::from_env(Arc::new(MssqlFactory::new()))?;
/// let handle = pools.acquire(Target::Primary).await?;
/// let rows = execute(&handle, &QueryDescriptor::new("SELECT 1 AS one")).await?;
/// # let _ = rows;
/// pools.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct PoolManager {
    factory: Arc<dyn PoolFactory>,
    slots: BTreeMap<Target, TargetSlot>,
    generation: AtomicU64,
    closed: AtomicBool,
}

impl PoolManager {
    /// A manager with no configured targets.
    #[must_use]
    pub fn new(factory: Arc<dyn PoolFactory>) -> Self {
        Self {
            factory,
            slots: BTreeMap::new(),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a target. A later config for the same target replaces the earlier one.
    #[must_use]
    pub fn with_target(mut self, config: TargetConfig) -> Self {
        self.slots.insert(
            config.target,
            TargetSlot {
                config,
                slot: Mutex::new(Slot::Empty),
            },
        );
        self
    }

    /// Build a manager from the process environment.
    ///
    /// # Errors
    /// Returns `DalError::ConfigError` if the primary target is not fully
    /// configured, or if the HRMS target is partially configured.
    pub fn from_env(factory: Arc<dyn PoolFactory>) -> Result<Self, DalError> {
        Self::from_lookup(factory, |key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable lookup.
    ///
    /// # Errors
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(factory: Arc<dyn PoolFactory>, lookup: F) -> Result<Self, DalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut manager = Self::new(factory);
        for target in Target::ALL {
            // Only the primary target is mandatory.
            if target != Target::Primary && !TargetConfig::is_present(target, &lookup) {
                tracing::info!(target_db = %target, "target not configured; skipping");
                continue;
            }
            manager = manager.with_target(TargetConfig::from_lookup(target, &lookup)?);
        }
        Ok(manager)
    }

    /// Targets this manager can serve.
    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.slots.keys().copied()
    }

    /// Logical state of a target's pool.
    #[must_use]
    pub fn state(&self, target: Target) -> Option<PoolState> {
        let entry = self.slots.get(&target)?;
        let state = match &*entry.lock() {
            Slot::Empty => PoolState::Uninitialized,
            Slot::Pending(_) => PoolState::Connecting,
            Slot::Ready(handle) => handle.state(),
            Slot::Closed => PoolState::Closed,
        };
        Some(state)
    }

    /// Return the target's pool, building it if needed.
    ///
    /// A connected pool is returned as-is. A missing or disconnected pool is
    /// rebuilt: the stale handle is closed first, then a new pool is connected
    /// within the target's connect timeout. Failures are not retried.
    ///
    /// # Errors
    /// Returns `DalError::ConnectionError` if the pool cannot be connected or
    /// the manager has been shut down, and `DalError::ConfigError` if `target`
    /// was never configured.
    pub async fn acquire(&self, target: Target) -> Result<Arc<PoolHandle>, DalError> {
        let entry = self.slots.get(&target).ok_or_else(|| {
            DalError::ConfigError(format!("database target {target} is not configured"))
        })?;

        let pending = {
            let mut slot = entry.lock();
            match &*slot {
                Slot::Closed => return Err(shut_down(target)),
                Slot::Ready(handle) if handle.refresh() == PoolState::Connected => {
                    return Ok(Arc::clone(handle));
                }
                Slot::Pending(pending) => pending.clone(),
                Slot::Ready(stale) => {
                    let pending = self.build(&entry.config, Some(Arc::clone(stale)));
                    *slot = Slot::Pending(pending.clone());
                    pending
                }
                Slot::Empty => {
                    let pending = self.build(&entry.config, None);
                    *slot = Slot::Pending(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut slot = entry.lock();
        match &*slot {
            Slot::Pending(current) if current.ptr_eq(&pending) => {
                *slot = match &result {
                    Ok(handle) => Slot::Ready(Arc::clone(handle)),
                    Err(_) => Slot::Empty,
                };
                result
            }
            Slot::Closed => Err(shut_down(target)),
            _ => result,
        }
    }

    /// Mark a target's live pool as disconnected so the next
    /// [`acquire`](Self::acquire) rebuilds it.
    pub fn mark_disconnected(&self, target: Target) {
        let Some(entry) = self.slots.get(&target) else {
            return;
        };
        if let Slot::Ready(handle) = &*entry.lock()
            && handle.transition(PoolState::Disconnected)
        {
            tracing::warn!(
                target_db = %target,
                generation = handle.generation(),
                "pool marked disconnected"
            );
        }
    }

    /// Close every pool and refuse further acquisitions.
    ///
    /// In-flight builds are awaited and their pools closed as well.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("shutting down database pools");
        for entry in self.slots.values() {
            let previous = std::mem::replace(&mut *entry.lock(), Slot::Closed);
            match previous {
                Slot::Ready(handle) => handle.close().await,
                Slot::Pending(pending) => {
                    if let Ok(handle) = pending.await {
                        handle.close().await;
                    }
                }
                Slot::Empty | Slot::Closed => {}
            }
        }
    }

    fn build(&self, config: &TargetConfig, stale: Option<Arc<PoolHandle>>) -> PendingPool {
        let factory = Arc::clone(&self.factory);
        let config = config.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let target = config.target;

        let attempt = async move {
            if let Some(stale) = stale {
                tracing::info!(
                    target_db = %target,
                    generation = stale.generation(),
                    "closing disconnected pool before reconnecting"
                );
                stale.close().await;
            }

            tracing::info!(
                target_db = %target,
                generation,
                server = %config.server,
                database = %config.database,
                "connecting pool"
            );
            let timeout = config.pool.connect_timeout;
            let backend = match tokio::time::timeout(timeout, factory.connect(&config)).await {
                Ok(Ok(backend)) => backend,
                Ok(Err(err)) => {
                    tracing::warn!(
                        target_db = %target,
                        generation,
                        error = %err,
                        "pool connect failed"
                    );
                    return Err(err);
                }
                Err(_) => {
                    tracing::warn!(target_db = %target, generation, "pool connect timed out");
                    return Err(DalError::ConnectionError(format!(
                        "timed out connecting to {target} database after {}ms",
                        timeout.as_millis()
                    )));
                }
            };

            tracing::info!(target_db = %target, generation, "pool connected");
            Ok(Arc::new(PoolHandle::new(target, generation, backend)))
        };

        // A panicking factory must not leave the slot pending forever.
        AssertUnwindSafe(attempt)
            .catch_unwind()
            .map(move |outcome| {
                outcome.unwrap_or_else(|payload| {
                    let reason = panic_message(payload.as_ref());
                    tracing::error!(target_db = %target, generation, reason, "pool build panicked");
                    Err(DalError::Other(format!(
                        "building the {target} pool panicked: {reason}"
                    )))
                })
            })
            .boxed()
            .shared()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

fn shut_down(target: Target) -> DalError {
    DalError::ConnectionError(format!("database pools are shut down; {target} unavailable"))
}
