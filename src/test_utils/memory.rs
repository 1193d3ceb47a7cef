use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Target, TargetConfig};
use crate::error::DalError;
use crate::pool::{PoolBackend, PoolFactory};
use crate::query::QueryDescriptor;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Produces the outcome of each executed statement.
pub type Responder = Arc<dyn Fn(&QueryDescriptor) -> Result<ResultSet, DalError> + Send + Sync>;

/// A statement as a driver would receive it: ordinal SQL plus bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Vec<RowValues>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct Shared {
    builds: AtomicUsize,
    closes: AtomicUsize,
    active_leases: AtomicUsize,
    connect_delay: Mutex<Duration>,
    connect_failure: Mutex<Option<DalError>>,
    connect_panics: AtomicBool,
    query_delay: Mutex<Duration>,
    responder: Mutex<Responder>,
    backends: Mutex<Vec<Arc<MemoryBackend>>>,
    executed: Mutex<Vec<ExecutedStatement>>,
    events: Mutex<Vec<String>>,
}

/// A [`PoolFactory`] whose pools live in memory.
///
/// Clones share state, so a test can keep one clone for inspection and hand
/// another to the [`PoolManager`](crate::pool::PoolManager).
#[derive(Clone)]
pub struct MemoryFactory {
    shared: Arc<Shared>,
}

impl Default for MemoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFactory {
    #[must_use]
    pub fn new() -> Self {
        let responder: Responder = Arc::new(|_: &QueryDescriptor| Ok(ResultSet::default()));
        Self {
            shared: Arc::new(Shared {
                builds: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                active_leases: AtomicUsize::new(0),
                connect_delay: Mutex::new(Duration::ZERO),
                connect_failure: Mutex::new(None),
                connect_panics: AtomicBool::new(false),
                query_delay: Mutex::new(Duration::ZERO),
                responder: Mutex::new(responder),
                backends: Mutex::new(Vec::new()),
                executed: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of times `connect` was called, successful or not.
    #[must_use]
    pub fn builds(&self) -> usize {
        self.shared.builds.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// `connect:{n}` and `close:{n}` in the order they happened.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        lock(&self.shared.events).clone()
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *lock(&self.shared.connect_delay) = delay;
    }

    /// Make every following `connect` fail with `err`.
    pub fn fail_connect(&self, err: DalError) {
        *lock(&self.shared.connect_failure) = Some(err);
    }

    pub fn clear_connect_failure(&self) {
        *lock(&self.shared.connect_failure) = None;
    }

    /// Make every following `connect` panic instead of returning.
    pub fn set_connect_panic(&self, panics: bool) {
        self.shared.connect_panics.store(panics, Ordering::SeqCst);
    }

    pub fn set_query_delay(&self, delay: Duration) {
        *lock(&self.shared.query_delay) = delay;
    }

    /// Answer statements with `responder`. A `ConnectionError` from it also
    /// marks the backend unhealthy, the way a dropped socket would.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&QueryDescriptor) -> Result<ResultSet, DalError> + Send + Sync + 'static,
    {
        let responder: Responder = Arc::new(responder);
        *lock(&self.shared.responder) = responder;
    }

    /// Statements executed so far, across every backend.
    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        lock(&self.shared.executed).clone()
    }

    /// The `n`-th backend built (1-based).
    #[must_use]
    pub fn backend(&self, n: usize) -> Option<Arc<MemoryBackend>> {
        n.checked_sub(1)
            .and_then(|idx| lock(&self.shared.backends).get(idx).cloned())
    }

    /// Connections currently leased by running statements.
    #[must_use]
    pub fn active_leases(&self) -> usize {
        self.shared.active_leases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolFactory for MemoryFactory {
    async fn connect(&self, config: &TargetConfig) -> Result<Arc<dyn PoolBackend>, DalError> {
        let build = self.shared.builds.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *lock(&self.shared.connect_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.shared.connect_panics.load(Ordering::SeqCst) {
            panic!("memory factory connect {build} panicked");
        }
        if let Some(err) = lock(&self.shared.connect_failure).clone() {
            return Err(err);
        }

        let backend = Arc::new(MemoryBackend {
            build,
            target: config.target,
            shared: Arc::clone(&self.shared),
            healthy: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        });
        lock(&self.shared.backends).push(Arc::clone(&backend));
        lock(&self.shared.events).push(format!("connect:{build}"));
        Ok(backend)
    }
}

/// One in-memory pool.
pub struct MemoryBackend {
    build: usize,
    target: Target,
    shared: Arc<Shared>,
    healthy: AtomicBool,
    closed: AtomicBool,
}

struct LeaseGuard<'a>(&'a AtomicUsize);

impl<'a> LeaseGuard<'a> {
    fn acquire(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryBackend {
    /// Simulate the server going away under a live pool.
    pub fn break_connection(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn build(&self) -> usize {
        self.build
    }
}

#[async_trait]
impl PoolBackend for MemoryBackend {
    async fn execute(&self, descriptor: &QueryDescriptor) -> Result<ResultSet, DalError> {
        if self.is_closed() {
            return Err(DalError::ConnectionError(format!(
                "{} pool is closed",
                self.target
            )));
        }
        let _lease = LeaseGuard::acquire(&self.shared.active_leases);

        let statement = descriptor.prepare()?;
        lock(&self.shared.executed).push(ExecutedStatement {
            sql: statement.sql.into_owned(),
            params: statement.params.into_iter().cloned().collect(),
        });

        let delay = *lock(&self.shared.query_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let responder = Arc::clone(&*lock(&self.shared.responder));
        let result = responder(descriptor);
        if matches!(result, Err(DalError::ConnectionError(_))) {
            self.break_connection();
        }
        result
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
            lock(&self.shared.events).push(format!("close:{}", self.build));
        }
    }
}
