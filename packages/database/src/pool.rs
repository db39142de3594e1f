//! Bounded connection pool for the transactions store.
//!
//! Hands out connections round-robin via an atomic counter, the same shape
//! as a fixed set of read connections behind mutexes. Each slot is
//! health-checked on checkout (`SELECT 1`) and re-established when the
//! check fails or the connection exceeds the recycle age, so a dropped
//! remote connection (e.g. an idle Neon socket) never surfaces as a query
//! error to callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use switchy_database::Database;
use tokio::sync::{Mutex, MutexGuard};

use crate::{DbError, db};

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default age after which a connection is recycled.
pub const DEFAULT_RECYCLE_AFTER: Duration = Duration::from_secs(3600);

/// One pooled connection with its creation time.
pub struct PooledConn {
    database: Box<dyn Database>,
    opened_at: Instant,
}

impl PooledConn {
    /// The underlying database handle.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.database.as_ref()
    }
}

/// Bounded round-robin pool of Postgres connections.
pub struct DbPool {
    slots: Vec<Mutex<PooledConn>>,
    next: AtomicUsize,
    recycle_after: Duration,
}

impl DbPool {
    /// Opens `size` connections from the `DATABASE_URL` environment
    /// variable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any connection fails to open.
    pub async fn connect_from_env(
        size: usize,
        recycle_after: Duration,
    ) -> Result<Self, DbError> {
        let mut slots = Vec::with_capacity(size);
        for _ in 0..size {
            let database = db::connect_from_env().await?;
            slots.push(Mutex::new(PooledConn {
                database,
                opened_at: Instant::now(),
            }));
        }

        log::info!("Opened database pool with {size} connections");

        Ok(Self {
            slots,
            next: AtomicUsize::new(0),
            recycle_after,
        })
    }

    /// Acquires the next connection from the pool (round-robin).
    ///
    /// The connection is health-checked before being handed out; a failed
    /// check or an over-age connection is replaced with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a replacement connection cannot be
    /// established.
    pub async fn acquire(&self) -> Result<MutexGuard<'_, PooledConn>, DbError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let mut slot = self.slots[idx].lock().await;

        let over_age = slot.opened_at.elapsed() >= self.recycle_after;
        let healthy = !over_age && slot.database.exec_raw("SELECT 1").await.is_ok();

        if !healthy {
            if over_age {
                log::debug!("Recycling pooled connection {idx} (age limit)");
            } else {
                log::warn!("Pooled connection {idx} failed health check, reconnecting");
            }
            slot.database = db::connect_from_env().await?;
            slot.opened_at = Instant::now();
        }

        Ok(slot)
    }

    /// Number of connections in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }
}
