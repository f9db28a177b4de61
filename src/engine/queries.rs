use ulid::Ulid;

use crate::model::{Reservation, ReservationKind};

use super::{Engine, EngineError};

/// Read path. Reads never take the admission lock — a stale-but-committed
/// snapshot is acceptable, a partially applied write is impossible because
/// the store commits each mutation as a unit.
impl Engine {
    pub async fn list_bookings(&self) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.store.list_all(ReservationKind::Booking).await?)
    }

    pub async fn get_booking(&self, id: Ulid) -> Result<Reservation, EngineError> {
        Ok(self.store.get(ReservationKind::Booking, id).await?)
    }

    pub async fn list_blocks(&self) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.store.list_all(ReservationKind::Block).await?)
    }

    pub async fn get_block(&self, id: Ulid) -> Result<Reservation, EngineError> {
        Ok(self.store.get(ReservationKind::Block, id).await?)
    }
}
