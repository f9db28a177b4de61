use chrono::NaiveDate;
use ulid::Ulid;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Proposed `start >= end`. Caught before any overlap scan.
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// Overlap with the identified existing reservation. Retrying with the
    /// same range will always re-conflict.
    Conflict(Ulid),
    NotFound(Ulid),
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange { start, end } => {
                write!(f, "invalid range: start {start} must be before end {end}")
            }
            EngineError::Conflict(id) => write!(f, "conflict with reservation: {id}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id, .. } => EngineError::NotFound(id),
            other => EngineError::Store(other),
        }
    }
}
