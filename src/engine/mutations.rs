use std::time::Instant;

use tracing::debug;
use ulid::Ulid;

use crate::model::{DateRange, Reservation, ReservationKind};
use crate::observability;

use super::conflict::{check_admissible, validate_range};
use super::{Engine, EngineError};

impl Engine {
    pub async fn create_booking(&self, range: DateRange) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = async {
            validate_range(&range)?;
            let _admit = self.admission.lock().await;
            let (bookings, blocks) = self.snapshot().await?;
            let draft = Reservation::draft(ReservationKind::Booking, range);
            check_admissible(&draft, &bookings, &blocks)?;
            let created = self.store.insert(draft).await?;
            debug!(id = %created.id, %range, "booking created");
            Ok(created)
        }
        .await;
        observe("create_booking", started, &result);
        result
    }

    /// Re-book the identified booking onto new dates. Only the range changes;
    /// the booking never conflicts with its own prior version.
    pub async fn update_booking(
        &self,
        id: Ulid,
        range: DateRange,
    ) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = async {
            validate_range(&range)?;
            let _admit = self.admission.lock().await;
            let existing = self.store.get(ReservationKind::Booking, id).await?;
            let candidate = Reservation { range, ..existing };
            let (bookings, blocks) = self.snapshot().await?;
            check_admissible(&candidate, &bookings, &blocks)?;
            self.store.update(&candidate).await?;
            debug!(id = %candidate.id, %range, "booking moved");
            Ok(candidate)
        }
        .await;
        observe("update_booking", started, &result);
        result
    }

    /// Removal never triggers a conflict check.
    pub async fn delete_booking(&self, id: Ulid) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = async {
            let _admit = self.admission.lock().await;
            self.store.get(ReservationKind::Booking, id).await?;
            self.store.delete(ReservationKind::Booking, id).await?;
            debug!(%id, "booking deleted");
            Ok(())
        }
        .await;
        observe("delete_booking", started, &result);
        result
    }

    /// Administrative hold. Block writes perform no overlap scan — not
    /// against bookings and not against other blocks; only the booking side
    /// of the cross-kind check is enforced.
    pub async fn create_block(&self, range: DateRange) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = async {
            validate_range(&range)?;
            let _admit = self.admission.lock().await;
            let created = self
                .store
                .insert(Reservation::draft(ReservationKind::Block, range))
                .await?;
            debug!(id = %created.id, %range, "block created");
            Ok(created)
        }
        .await;
        observe("create_block", started, &result);
        result
    }

    pub async fn update_block(
        &self,
        id: Ulid,
        range: DateRange,
    ) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = async {
            validate_range(&range)?;
            let _admit = self.admission.lock().await;
            let existing = self.store.get(ReservationKind::Block, id).await?;
            let candidate = Reservation { range, ..existing };
            self.store.update(&candidate).await?;
            debug!(id = %candidate.id, %range, "block moved");
            Ok(candidate)
        }
        .await;
        observe("update_block", started, &result);
        result
    }

    pub async fn delete_block(&self, id: Ulid) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = async {
            let _admit = self.admission.lock().await;
            self.store.get(ReservationKind::Block, id).await?;
            self.store.delete(ReservationKind::Block, id).await?;
            debug!(%id, "block deleted");
            Ok(())
        }
        .await;
        observe("delete_block", started, &result);
        result
    }
}

fn observe<T>(op: &'static str, started: Instant, result: &Result<T, EngineError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(EngineError::InvalidRange { .. }) => "invalid_range",
        Err(EngineError::Conflict(_)) => "conflict",
        Err(EngineError::NotFound(_)) => "not_found",
        Err(EngineError::Store(_)) => "store_error",
    };
    metrics::counter!(observability::WRITES_TOTAL, "op" => op, "outcome" => outcome).increment(1);
    match result {
        Err(EngineError::Conflict(_)) => {
            metrics::counter!(observability::CONFLICTS_TOTAL).increment(1);
        }
        Err(EngineError::InvalidRange { .. }) => {
            metrics::counter!(observability::INVALID_RANGES_TOTAL).increment(1);
        }
        _ => {}
    }
    metrics::histogram!(observability::WRITE_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}
