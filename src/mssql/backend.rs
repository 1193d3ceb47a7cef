use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bb8::{Pool, PooledConnection, RunError};
use tokio::sync::Notify;

use super::config::build_tiberius_config;
use super::manager::MssqlConnectionManager;
use super::query::run;
use crate::config::{Target, TargetConfig};
use crate::error::DalError;
use crate::pool::{PoolBackend, PoolFactory};
use crate::query::QueryDescriptor;
use crate::results::ResultSet;

type MssqlPool = Pool<MssqlConnectionManager>;

/// A bb8 pool of SQL Server connections for one target.
pub struct MssqlBackend {
    target: Target,
    pool: Mutex<Option<MssqlPool>>,
    healthy: AtomicBool,
    in_flight: InFlight,
}

/// Counts statements running against a backend so `close` can wait for them.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    drained: Notify,
}

struct InFlightGuard<'a>(&'a InFlight);

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self)
    }

    fn active(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn drain(&self) {
        loop {
            // Register before checking so a release in between is not missed.
            let drained = self.drained.notified();
            if self.active() == 0 {
                return;
            }
            drained.await;
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.drained.notify_waiters();
        }
    }
}

/// A timed-out checkout means the pool is busy, not broken.
fn checkout_breaks_pool<E>(err: &RunError<E>) -> bool {
    matches!(err, RunError::User(_))
}

/// One leased connection. Dropping it before [`finish`](Lease::finish) marks
/// the connection broken so the pool discards it instead of reusing a client
/// left mid-statement.
struct Lease<'a> {
    conn: PooledConnection<'a, MssqlConnectionManager>,
    finished: bool,
}

impl Lease<'_> {
    fn finish(mut self, connection_lost: bool) {
        self.conn.broken = connection_lost;
        self.finished = true;
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.conn.broken = true;
        }
    }
}

impl MssqlBackend {
    fn new(target: Target, pool: MssqlPool) -> Self {
        Self {
            target,
            pool: Mutex::new(Some(pool)),
            healthy: AtomicBool::new(true),
            in_flight: InFlight::default(),
        }
    }

    fn pool(&self) -> Option<MssqlPool> {
        match self.pool.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn mark_unhealthy(&self) {
        if self.healthy.swap(false, Ordering::SeqCst) {
            tracing::warn!(target_db = %self.target, "connection-class failure observed");
        }
    }
}

#[async_trait]
impl PoolBackend for MssqlBackend {
    async fn execute(&self, descriptor: &QueryDescriptor) -> Result<ResultSet, DalError> {
        let _in_flight = self.in_flight.enter();
        let pool = self.pool().ok_or_else(|| {
            DalError::ConnectionError(format!("{} pool is closed", self.target))
        })?;

        let conn = match pool.get().await {
            Ok(conn) => conn,
            Err(err) => {
                if checkout_breaks_pool(&err) {
                    self.mark_unhealthy();
                } else {
                    tracing::debug!(target_db = %self.target, "timed out waiting for a connection");
                }
                return Err(DalError::from(err));
            }
        };
        let mut lease = Lease {
            conn,
            finished: false,
        };

        let result = run(&mut lease.conn.client, descriptor).await;
        let connection_lost = matches!(result, Err(DalError::ConnectionError(_)));
        lease.finish(connection_lost);
        if connection_lost {
            self.mark_unhealthy();
        }
        result
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        let pool = match self.pool.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(pool) = pool else {
            return;
        };
        let active = self.in_flight.active();
        if active > 0 {
            tracing::debug!(target_db = %self.target, active, "waiting for in-flight statements");
            self.in_flight.drain().await;
        }
        let state = pool.state();
        tracing::debug!(
            target_db = %self.target,
            connections = state.connections,
            idle = state.idle_connections,
            "dropping SQL Server pool"
        );
    }
}

/// Opens [`MssqlBackend`] pools.
///
/// The factory checks one connection out before returning, so an unreachable
/// server fails the build instead of the first query.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlFactory;

impl MssqlFactory {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PoolFactory for MssqlFactory {
    async fn connect(&self, config: &TargetConfig) -> Result<Arc<dyn PoolBackend>, DalError> {
        let manager = MssqlConnectionManager::new(
            build_tiberius_config(config),
            config.instance_name.is_some(),
        );
        let settings = &config.pool;
        let pool = Pool::builder()
            .max_size(settings.max_connections)
            .min_idle(Some(settings.min_connections))
            .idle_timeout(Some(settings.idle_timeout))
            .connection_timeout(settings.connect_timeout)
            .retry_connection(false)
            .test_on_check_out(true)
            .build(manager)
            .await
            .map_err(|err| DalError::ConnectionError(err.to_string()))?;

        drop(pool.get().await?);

        Ok(Arc::new(MssqlBackend::new(config.target, pool)))
    }
}
