//! Reuse pool for the records that cross the bridge at frame rate.
//!
//! Every slot is either idle (value parked in the pool) or in use (value moved
//! out into a [`Lease`]). Moving the value out means one instance can never
//! be held twice, and a lease can only be released once because `release`
//! consumes it.
//!
//! The pool never resets a value. Whoever fills a lease must overwrite every
//! field it reads afterwards.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Misuse of [`ObjectPool::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("lease from pool {lease_pool} released into pool {pool}")]
    ForeignLease { pool: u64, lease_pool: u64 },

    #[error("slot {slot} is not checked out")]
    NotInUse { slot: usize },
}

/// A checked-out pool value. Dereferences to the pooled record.
///
/// Dropping a lease instead of releasing it leaves its slot marked in use.
#[derive(Debug)]
pub struct Lease<T> {
    pool_id: u64,
    slot: usize,
    value: T,
}

impl<T> Lease<T> {
    /// Index of the slot this lease was taken from.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<T> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Grow-on-demand pool of default-constructed records.
#[derive(Debug)]
pub struct ObjectPool<T> {
    id: u64,
    /// `Some` = idle, `None` = leased out.
    slots: Vec<Option<T>>,
    /// Idle slot indices, most recently released last.
    idle: Vec<usize>,
}

impl<T: Default> ObjectPool<T> {
    /// Pre-populate `capacity` idle records.
    pub fn new(capacity: usize) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            slots: (0..capacity).map(|_| Some(T::default())).collect(),
            idle: (0..capacity).rev().collect(),
        }
    }

    /// Check out an idle record, growing the pool by one if none is idle.
    pub fn acquire(&mut self) -> Lease<T> {
        if let Some(slot) = self.idle.pop() {
            if let Some(value) = self.slots[slot].take() {
                return Lease {
                    pool_id: self.id,
                    slot,
                    value,
                };
            }
        }

        let slot = self.slots.len();
        self.slots.push(None);
        debug!(pool = self.id, capacity = self.slots.len(), "object pool grew");
        Lease {
            pool_id: self.id,
            slot,
            value: T::default(),
        }
    }
}

impl<T> ObjectPool<T> {
    /// Return a lease to the idle set.
    ///
    /// # Errors
    /// - `PoolError::ForeignLease` if the lease came from another pool.
    /// - `PoolError::NotInUse` if its slot is already idle.
    pub fn release(&mut self, lease: Lease<T>) -> Result<(), PoolError> {
        let Lease {
            pool_id,
            slot,
            value,
        } = lease;

        if pool_id != self.id {
            return Err(PoolError::ForeignLease {
                pool: self.id,
                lease_pool: pool_id,
            });
        }

        match self.slots.get_mut(slot) {
            Some(entry) if entry.is_none() => {
                *entry = Some(value);
                self.idle.push(slot);
                Ok(())
            }
            _ => Err(PoolError::NotInUse { slot }),
        }
    }

    /// Total number of records managed, idle or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.slots.len() - self.idle.len()
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
