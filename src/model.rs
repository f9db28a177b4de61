use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open calendar-date range `[start, end)`.
///
/// Whole days only — a guest leaving on the 15th frees the unit for a guest
/// arriving on the 15th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range is well-formed only when `start < end`; zero-length ranges
    /// are rejected at admission, never silently accepted.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Open-interval intersection. Touching endpoints do not overlap, which
    /// is what allows back-to-back reservations.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The two reservation collections. They are stored separately but share one
/// overlap domain: a booking must not overlap reservations of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationKind {
    /// Guest-initiated reservation of the unit.
    Booking,
    /// Administrative hold on the unit, not guest-facing.
    Block,
}

impl std::fmt::Display for ReservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationKind::Booking => write!(f, "booking"),
            ReservationKind::Block => write!(f, "block"),
        }
    }
}

/// A single date-ranged reservation. `id` and `kind` are immutable after
/// creation; only the range may change through an accepted update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub kind: ReservationKind,
    pub range: DateRange,
}

impl Reservation {
    /// A not-yet-created reservation. The nil id marks "no identity assigned";
    /// the store replaces it with a fresh Ulid on insert.
    pub fn draft(kind: ReservationKind, range: DateRange) -> Self {
        Self {
            id: Ulid::nil(),
            kind,
            range,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_nil()
    }
}

/// The journal record format — one entry per committed store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Inserted(Reservation),
    Updated(Reservation),
    Deleted { kind: ReservationKind, id: Ulid },
}
