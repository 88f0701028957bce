use super::connection::{Lease, PooledConnection};
use quire_application::ports::ConnectionFactory;
use quire_domain::config::PoolConfig;
use quire_domain::{DomainError, PoolStats, PoolType};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Upper bound for a deadline when the caller passes an absurd timeout.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

struct PoolState<C> {
    /// Oldest release at the front, most recently used at the back.
    idle: VecDeque<PooledConnection<C>>,
    active: FxHashSet<u64>,
    /// Connections the factory is opening right now.
    opening: usize,
    closed: bool,
}

impl<C> PoolState<C> {
    fn total(&self) -> usize {
        self.idle.len() + self.active.len() + self.opening
    }
}

/// The part of a pool that checked-out connections point back to.
pub(crate) struct PoolShared<C> {
    pool_type: PoolType,
    state: Mutex<PoolState<C>>,
}

impl<C> PoolShared<C> {
    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    /// Drop `id` from the active set. Returns whether it was there.
    pub(crate) fn forget_active(&self, id: u64) -> bool {
        self.lock().active.remove(&id)
    }
}

/// Counts one in-flight factory call. Dropping it armed (error or
/// cancellation) gives the reservation back.
struct OpeningSlot<'a, C> {
    shared: &'a PoolShared<C>,
    armed: bool,
}

impl<'a, C> OpeningSlot<'a, C> {
    fn reserve(shared: &'a PoolShared<C>, state: &mut PoolState<C>) -> Self {
        state.opening += 1;
        Self {
            shared,
            armed: true,
        }
    }

    fn complete(mut self, state: &mut PoolState<C>) {
        state.opening = state.opening.saturating_sub(1);
        self.armed = false;
    }
}

impl<C> Drop for OpeningSlot<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.shared.lock();
            state.opening = state.opening.saturating_sub(1);
        }
    }
}

enum Release<C> {
    Pooled,
    Close(PooledConnection<C>),
    Unknown(PooledConnection<C>),
}

/// Bounded pool of connections produced by one [`ConnectionFactory`].
///
/// The semaphore holds one permit per slot that is not checked out or being
/// opened. A checked-out connection owns its permit through its lease, so a
/// connection dropped without release still returns the slot. The mutex
/// guards the idle/active partition and is never held across an await.
pub struct ConnectionPool<F: ConnectionFactory> {
    shared: Arc<PoolShared<F::Connection>>,
    factory: F,
    min_connections: usize,
    max_connections: usize,
    permits: Arc<Semaphore>,
    connection_errors: AtomicU64,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    pub fn new(pool_type: PoolType, config: &PoolConfig, factory: F) -> Self {
        let max_connections = config.max_connections.max(1);
        Self {
            shared: Arc::new(PoolShared {
                pool_type,
                state: Mutex::new(PoolState {
                    idle: VecDeque::with_capacity(max_connections),
                    active: FxHashSet::default(),
                    opening: 0,
                    closed: false,
                }),
            }),
            factory,
            min_connections: config.min_connections.min(max_connections),
            max_connections,
            permits: Arc::new(Semaphore::new(max_connections)),
            connection_errors: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<F::Connection>> {
        self.shared.lock()
    }

    pub fn pool_type(&self) -> PoolType {
        self.shared.pool_type
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn lease(&self, id: u64, permit: OwnedSemaphorePermit) -> Lease<F::Connection> {
        Lease::new(id, Arc::downgrade(&self.shared), permit)
    }

    fn exhausted(&self, timeout: Duration) -> DomainError {
        let waited_ms = timeout.as_millis() as u64;
        warn!(pool = %self.pool_type(), waited_ms, "Connection pool exhausted");
        DomainError::PoolExhausted {
            pool: self.pool_type(),
            waited_ms,
        }
    }

    async fn connect(&self) -> Result<F::Connection, DomainError> {
        self.factory.connect().await.map_err(|e| {
            self.connection_errors.fetch_add(1, AtomicOrdering::Relaxed);
            warn!(pool = %self.pool_type(), error = %e, "Failed to open connection");
            match e {
                DomainError::ConnectionFactory(_) => e,
                other => DomainError::ConnectionFactory(other.to_string()),
            }
        })
    }

    /// Open connections until `min_connections` exist. Returns how many were created.
    ///
    /// Each open holds a permit, so prewarm and concurrent acquirers together
    /// never exceed `max_connections`. Stops early when every slot is taken.
    pub async fn prewarm(&self) -> Result<usize, DomainError> {
        let mut created = 0;
        loop {
            let permit = match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => permit,
                Err(TryAcquireError::Closed) => return Err(DomainError::PoolClosed(self.pool_type())),
                Err(TryAcquireError::NoPermits) => break,
            };

            let opening = {
                let mut state = self.lock();
                if state.closed {
                    return Err(DomainError::PoolClosed(self.pool_type()));
                }
                if state.total() >= self.min_connections {
                    break;
                }
                OpeningSlot::reserve(&self.shared, &mut state)
            };

            let conn = PooledConnection::new(self.pool_type(), self.connect().await?);
            let surplus = {
                let mut state = self.lock();
                opening.complete(&mut state);
                if state.closed {
                    Some(conn)
                } else {
                    state.idle.push_back(conn);
                    None
                }
            };
            drop(permit);

            if let Some(conn) = surplus {
                self.factory.close(conn.into_handle()).await;
                break;
            }
            created += 1;
        }

        info!(pool = %self.pool_type(), created, min = self.min_connections, "Connection pool prewarmed");
        Ok(created)
    }

    /// Check out a connection. `timeout` bounds the whole call: waiting for a
    /// slot and opening a new connection share one deadline.
    pub async fn get_connection(
        &self,
        timeout: Duration,
    ) -> Result<PooledConnection<F::Connection>, DomainError> {
        let start = Instant::now();
        let deadline = start
            .checked_add(timeout)
            .unwrap_or_else(|| start + FAR_FUTURE);

        let permit = match timeout_at(deadline, Arc::clone(&self.permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(DomainError::PoolClosed(self.pool_type())),
            Err(_) => return Err(self.exhausted(timeout)),
        };

        let opening = {
            let mut state = self.lock();
            if state.closed {
                return Err(DomainError::PoolClosed(self.pool_type()));
            }
            if let Some(mut conn) = state.idle.pop_back() {
                conn.mark_active();
                state.active.insert(conn.id());
                conn.attach_lease(self.lease(conn.id(), permit));
                debug!(pool = %self.pool_type(), id = conn.id(), "Reused idle connection");
                return Ok(conn);
            }
            OpeningSlot::reserve(&self.shared, &mut state)
        };

        // On error or timeout the permit and the reservation drop here.
        let handle = match timeout_at(deadline, self.connect()).await {
            Ok(result) => result?,
            Err(_) => return Err(self.exhausted(timeout)),
        };
        let mut conn = PooledConnection::new(self.pool_type(), handle);

        let closed = {
            let mut state = self.lock();
            opening.complete(&mut state);
            if !state.closed {
                conn.mark_active();
                state.active.insert(conn.id());
            }
            state.closed
        };

        if closed {
            self.factory.close(conn.into_handle()).await;
            return Err(DomainError::PoolClosed(self.pool_type()));
        }

        conn.attach_lease(self.lease(conn.id(), permit));
        debug!(pool = %self.pool_type(), id = conn.id(), "Opened new connection");
        Ok(conn)
    }

    /// Return a checked-out connection. Connections this pool does not hold
    /// as active are closed and rejected.
    pub async fn release_connection(
        &self,
        conn: PooledConnection<F::Connection>,
    ) -> Result<(), DomainError> {
        let mut conn = conn;
        let lease = conn.take_lease();
        let release = {
            let mut state = self.lock();
            if conn.pool_type() != self.pool_type() || !state.active.remove(&conn.id()) {
                Release::Unknown(conn)
            } else if state.closed {
                Release::Close(conn)
            } else {
                conn.mark_idle();
                state.idle.push_back(conn);
                Release::Pooled
            }
        };
        // Hands the permit back once the connection is idle again.
        drop(lease);

        match release {
            Release::Pooled => Ok(()),
            Release::Close(conn) => {
                self.factory.close(conn.into_handle()).await;
                Ok(())
            }
            Release::Unknown(conn) => {
                let id = conn.id();
                warn!(
                    pool = %self.pool_type(),
                    id,
                    owner = %conn.pool_type(),
                    "Rejected release of connection not checked out from this pool"
                );
                self.factory.close(conn.into_handle()).await;
                Err(DomainError::UnknownConnection(id))
            }
        }
    }

    /// Close idle connections unused for at least `idle_timeout`, oldest first,
    /// keeping `min_connections` alive. Returns how many were closed.
    pub async fn close_idle_connections(&self, idle_timeout: Duration) -> usize {
        let victims: Vec<PooledConnection<F::Connection>> = {
            let mut state = self.lock();
            let now = Instant::now();
            let mut budget = state.total().saturating_sub(self.min_connections);
            let mut victims = Vec::new();

            while budget > 0
                && state
                    .idle
                    .front()
                    .is_some_and(|conn| conn.idle_for(now) >= idle_timeout)
            {
                let Some(conn) = state.idle.pop_front() else {
                    break;
                };
                victims.push(conn);
                budget -= 1;
            }
            victims
        };

        let closed = victims.len();
        for conn in victims {
            self.factory.close(conn.into_handle()).await;
        }

        if closed > 0 {
            info!(pool = %self.pool_type(), closed, "Closed idle connections");
        }
        closed
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats::new(
            self.pool_type(),
            state.idle.len(),
            state.active.len(),
            self.max_connections,
            self.connection_errors.load(AtomicOrdering::Relaxed),
        )
    }

    /// Refuse further checkouts and close every idle connection. Active
    /// connections are closed as they come back.
    pub async fn close_all(&self) {
        self.permits.close();
        let idle: Vec<PooledConnection<F::Connection>> = {
            let mut state = self.lock();
            state.closed = true;
            state.idle.drain(..).collect()
        };

        let closed = idle.len();
        for conn in idle {
            self.factory.close(conn.into_handle()).await;
        }
        info!(pool = %self.pool_type(), closed, "Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
