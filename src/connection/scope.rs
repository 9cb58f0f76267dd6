use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::config::ConfigAndPool;
use crate::error::SqlTemplateError;

use super::pooled::SqliteConnection;

/// Where a single template call gets its connection from.
#[derive(Debug)]
pub enum ConnectionHandle<'c> {
    /// Check a connection out of the pool for this call and return it afterwards.
    Acquire,
    /// Use the caller's connection (and whatever transaction it has open); never
    /// released by the template.
    Supplied(&'c mut SqliteConnection),
}

/// Counters for connections the template checked out on its own behalf.
///
/// Caller-owned connections (from `get_connection` or `begin`) are not counted.
#[derive(Debug, Default)]
pub struct PoolStats {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Point-in-time copy of [`PoolStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub acquired: u64,
    pub released: u64,
}

impl PoolStatsSnapshot {
    /// Connections acquired by the template and not yet released.
    #[must_use]
    pub fn in_use(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

impl PoolStats {
    #[must_use]
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            acquired: self.acquired.load(Ordering::Acquire),
            released: self.released.load(Ordering::Acquire),
        }
    }

    fn record_acquire(&self) {
        self.acquired.fetch_add(1, Ordering::AcqRel);
    }

    fn record_release(&self) {
        self.released.fetch_add(1, Ordering::AcqRel);
    }
}

/// Connection held for the duration of one template call.
///
/// An acquired connection goes back to the pool when the scope drops, which covers
/// normal returns, errors, panics and cancelled futures alike.
pub(crate) enum ConnectionScope<'c> {
    Acquired {
        conn: Option<SqliteConnection>,
        stats: Arc<PoolStats>,
    },
    Supplied(&'c mut SqliteConnection),
}

impl<'c> ConnectionScope<'c> {
    pub(crate) async fn open(
        config: &ConfigAndPool,
        stats: &Arc<PoolStats>,
        handle: ConnectionHandle<'c>,
    ) -> Result<Self, SqlTemplateError> {
        match handle {
            ConnectionHandle::Acquire => {
                let conn = config.get_connection().await?;
                stats.record_acquire();
                trace!("acquired pooled connection");
                Ok(Self::Acquired {
                    conn: Some(conn),
                    stats: Arc::clone(stats),
                })
            }
            ConnectionHandle::Supplied(conn) => {
                trace!(in_transaction = conn.in_transaction(), "using supplied connection");
                Ok(Self::Supplied(conn))
            }
        }
    }

    pub(crate) fn connection(&self) -> Result<&SqliteConnection, SqlTemplateError> {
        match self {
            Self::Acquired { conn, .. } => conn
                .as_ref()
                .ok_or_else(|| SqlTemplateError::connection("connection already released")),
            Self::Supplied(conn) => Ok(&**conn),
        }
    }
}

impl Drop for ConnectionScope<'_> {
    fn drop(&mut self) {
        if let Self::Acquired { conn, stats } = self
            && let Some(conn) = conn.take()
        {
            drop(conn);
            stats.record_release();
            trace!("released pooled connection");
        }
    }
}
