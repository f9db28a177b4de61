mod conflict;
mod error;
mod mutations;
mod queries;

pub use error::EngineError;

use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::model::{Reservation, ReservationKind};
use crate::store::{MemoryStore, ReservationStore};
use crate::wal::WalStore;

/// Admission controller for one rentable unit.
///
/// The conflict decision itself is a pure function over a snapshot; the
/// hazard is the check-then-write sequence around it. Every write path holds
/// `admission` from snapshot through commit,
/// so two racing writers can never both observe the pre-write state. Reads
/// bypass the lock entirely.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    admission: Mutex<()>,
}

impl Engine {
    pub fn with_store(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            store,
            admission: Mutex::new(()),
        }
    }

    /// Volatile engine over a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Durable engine over a journal-backed [`WalStore`] at `path`.
    pub fn durable(path: &Path) -> io::Result<Self> {
        Ok(Self::with_store(Arc::new(WalStore::open(path)?)))
    }

    /// Snapshot both collections at the same logical instant. Only sound
    /// while the caller holds the admission lock — otherwise a writer could
    /// commit between the two listings.
    pub(super) async fn snapshot(
        &self,
    ) -> Result<(Vec<Reservation>, Vec<Reservation>), EngineError> {
        let bookings = self.store.list_all(ReservationKind::Booking).await?;
        let blocks = self.store.list_all(ReservationKind::Block).await?;
        Ok((bookings, blocks))
    }
}
