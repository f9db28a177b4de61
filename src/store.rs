use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::{Event, Reservation, ReservationKind};

/// Failures at the storage seam. The engine maps `NotFound` into its own
/// taxonomy; everything else surfaces as a storage error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound { kind: ReservationKind, id: Ulid },
    AlreadyExists { kind: ReservationKind, id: Ulid },
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { kind, id } => write!(f, "no {kind} with id {id}"),
            StoreError::AlreadyExists { kind, id } => {
                write!(f, "{kind} with id {id} already exists")
            }
            StoreError::Io(e) => write!(f, "storage I/O error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Keyed collection of reservations, partitioned by kind. Pure storage — no
/// conflict logic lives behind this trait, so any backend (in-memory map,
/// relational table, embedded KV store) can implement it.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Every current reservation of one kind, in insertion order.
    async fn list_all(&self, kind: ReservationKind) -> Result<Vec<Reservation>, StoreError>;

    async fn get(&self, kind: ReservationKind, id: Ulid) -> Result<Reservation, StoreError>;

    /// Persist a new reservation. A draft (nil id) gets a fresh id assigned;
    /// a non-nil id that collides with an existing record is rejected.
    async fn insert(&self, reservation: Reservation) -> Result<Reservation, StoreError>;

    /// Replace the record matching `(kind, id)`.
    async fn update(&self, reservation: &Reservation) -> Result<(), StoreError>;

    async fn delete(&self, kind: ReservationKind, id: Ulid) -> Result<(), StoreError>;
}

/// In-memory backend: one insertion-ordered Vec per kind inside a DashMap.
/// The reservation count per unit is small, so linear scans are fine.
pub struct MemoryStore {
    shelves: DashMap<ReservationKind, Vec<Reservation>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let shelves = DashMap::new();
        shelves.insert(ReservationKind::Booking, Vec::new());
        shelves.insert(ReservationKind::Block, Vec::new());
        Self { shelves }
    }

    pub fn len(&self, kind: ReservationKind) -> usize {
        self.shelves.get(&kind).map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len(ReservationKind::Booking) == 0 && self.len(ReservationKind::Block) == 0
    }

    /// Apply a committed journal event. Infallible upsert/remove semantics —
    /// replay trusts the journal, it does not re-validate.
    pub fn apply(&self, event: &Event) {
        match event {
            Event::Inserted(rsv) => {
                let mut shelf = self.shelves.entry(rsv.kind).or_default();
                if let Some(existing) = shelf.iter_mut().find(|r| r.id == rsv.id) {
                    *existing = rsv.clone();
                } else {
                    shelf.push(rsv.clone());
                }
            }
            Event::Updated(rsv) => {
                let mut shelf = self.shelves.entry(rsv.kind).or_default();
                if let Some(existing) = shelf.iter_mut().find(|r| r.id == rsv.id) {
                    *existing = rsv.clone();
                } else {
                    shelf.push(rsv.clone());
                }
            }
            Event::Deleted { kind, id } => {
                if let Some(mut shelf) = self.shelves.get_mut(kind) {
                    shelf.retain(|r| r.id != *id);
                }
            }
        }
    }

    fn contains(&self, kind: ReservationKind, id: Ulid) -> bool {
        self.shelves
            .get(&kind)
            .is_some_and(|shelf| shelf.iter().any(|r| r.id == id))
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn list_all(&self, kind: ReservationKind) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .shelves
            .get(&kind)
            .map(|shelf| shelf.value().clone())
            .unwrap_or_default())
    }

    async fn get(&self, kind: ReservationKind, id: Ulid) -> Result<Reservation, StoreError> {
        self.shelves
            .get(&kind)
            .and_then(|shelf| shelf.iter().find(|r| r.id == id).cloned())
            .ok_or(StoreError::NotFound { kind, id })
    }

    async fn insert(&self, mut reservation: Reservation) -> Result<Reservation, StoreError> {
        if reservation.is_draft() {
            reservation.id = Ulid::new();
        } else if self.contains(reservation.kind, reservation.id) {
            return Err(StoreError::AlreadyExists {
                kind: reservation.kind,
                id: reservation.id,
            });
        }
        self.apply(&Event::Inserted(reservation.clone()));
        Ok(reservation)
    }

    async fn update(&self, reservation: &Reservation) -> Result<(), StoreError> {
        if !self.contains(reservation.kind, reservation.id) {
            return Err(StoreError::NotFound {
                kind: reservation.kind,
                id: reservation.id,
            });
        }
        self.apply(&Event::Updated(reservation.clone()));
        Ok(())
    }

    async fn delete(&self, kind: ReservationKind, id: Ulid) -> Result<(), StoreError> {
        if !self.contains(kind, id) {
            return Err(StoreError::NotFound { kind, id });
        }
        self.apply(&Event::Deleted { kind, id });
        Ok(())
    }
}
