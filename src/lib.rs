//! Booking/block admission engine for a single rentable unit.
//!
//! Guest bookings and administrative blocks are date-ranged reservations
//! over one shared calendar. The [`Engine`] guarantees that no accepted
//! booking overlaps any other reservation of either kind, atomically under
//! concurrent writers; [`ReservationStore`] is the persistence seam, with
//! in-memory and journal-backed implementations provided.

pub mod engine;
pub mod model;
pub mod observability;
pub mod store;
pub mod wal;

pub use engine::{Engine, EngineError};
pub use model::{DateRange, Event, Reservation, ReservationKind};
pub use store::{MemoryStore, ReservationStore, StoreError};
pub use wal::WalStore;
