use crate::model::{DateRange, Reservation};

use super::EngineError;

pub(crate) fn validate_range(range: &DateRange) -> Result<(), EngineError> {
    if !range.is_well_formed() {
        return Err(EngineError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    Ok(())
}

/// Decide whether a proposed booking may be committed against a consistent
/// snapshot of both collections.
///
/// Pure existential test, linear over both slices — scan order never changes
/// the verdict. Bookings whose id matches the proposal are skipped so an
/// update cannot conflict with its own prior version; a draft carries the nil
/// id, which never matches a stored record. Blocks get no identity exclusion:
/// they live in a different id namespace.
pub(crate) fn check_admissible(
    proposed: &Reservation,
    bookings: &[Reservation],
    blocks: &[Reservation],
) -> Result<(), EngineError> {
    for existing in bookings {
        if existing.id != proposed.id && existing.range.overlaps(&proposed.range) {
            return Err(EngineError::Conflict(existing.id));
        }
    }
    for block in blocks {
        if block.range.overlaps(&proposed.range) {
            return Err(EngineError::Conflict(block.id));
        }
    }
    Ok(())
}
