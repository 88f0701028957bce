use super::connection_pool::PoolShared;
use quire_domain::PoolType;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;
use tracing::warn;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A checked-out slot: the semaphore permit plus a way back to the pool's
/// active set.
///
/// Dropping a lease whose connection is still marked active (the caller was
/// cancelled or never released) frees the slot. The handle itself is dropped
/// without going through the factory.
pub(crate) struct Lease<C> {
    id: u64,
    pool: Weak<PoolShared<C>>,
    _permit: OwnedSemaphorePermit,
}

impl<C> Lease<C> {
    pub(crate) fn new(id: u64, pool: Weak<PoolShared<C>>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            id,
            pool,
            _permit: permit,
        }
    }
}

impl<C> Drop for Lease<C> {
    fn drop(&mut self) {
        let Some(pool) = self.pool.upgrade() else {
            return;
        };
        if pool.forget_active(self.id) {
            warn!(
                pool = %pool.pool_type(),
                id = self.id,
                "Connection dropped without release, slot reclaimed"
            );
        }
    }
}

impl<C> fmt::Debug for Lease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("id", &self.id).finish()
    }
}

/// A backend handle plus the bookkeeping the pool needs.
///
/// Checked out by value: while a caller holds it, no other caller can.
/// A checked-out connection carries a [`Lease`]; idle ones do not.
#[derive(Debug)]
pub struct PooledConnection<C> {
    id: u64,
    pool_type: PoolType,
    is_active: bool,
    created_at: Instant,
    last_used: Instant,
    lease: Option<Lease<C>>,
    handle: C,
}

impl<C> PooledConnection<C> {
    pub(crate) fn new(pool_type: PoolType, handle: C) -> Self {
        let now = Instant::now();
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, AtomicOrdering::Relaxed),
            pool_type,
            is_active: false,
            created_at: now,
            last_used: now,
            lease: None,
            handle,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    pub fn handle(&self) -> &C {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut C {
        &mut self.handle
    }

    pub(crate) fn into_handle(self) -> C {
        self.handle
    }

    pub(crate) fn attach_lease(&mut self, lease: Lease<C>) {
        self.lease = Some(lease);
    }

    /// Detach the lease so the caller decides when the slot is returned.
    /// Drop the result outside the pool lock.
    pub(crate) fn take_lease(&mut self) -> Option<Lease<C>> {
        self.lease.take()
    }

    pub(crate) fn mark_active(&mut self) {
        self.is_active = true;
        self.last_used = Instant::now();
    }

    pub(crate) fn mark_idle(&mut self) {
        self.is_active = false;
        self.last_used = Instant::now();
    }

    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used)
    }
}

impl<C> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.handle
    }
}

impl<C> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.handle
    }
}
