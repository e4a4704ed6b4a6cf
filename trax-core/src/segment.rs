use serde::{Deserialize, Serialize};

use crate::{BookingError, BookingResult};

/// Half-open interval `[from, to)` of stop-sequence numbers.
///
/// Stop sequences are the sole coordinate system for travel intervals: every
/// lock, order and fare leg is expressed in them. Half-open semantics are
/// intentional: a passenger alighting exactly at stop K and a passenger
/// boarding exactly at stop K share no track segment and never conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    from: i32,
    to: i32,
}

impl Segment {
    pub fn new(from: i32, to: i32) -> BookingResult<Self> {
        if from < 0 || from >= to {
            return Err(BookingError::Validation(format!(
                "invalid segment [{from}, {to}): requires 0 <= from < to"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn from_seq(&self) -> i32 {
        self.from
    }

    pub fn to_seq(&self) -> i32 {
        self.to
    }

    /// The single system-wide definition of conflict between two intervals.
    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.from < other.to && other.from < self.to
    }

    /// True when `other` lies fully inside this segment. Used by fare
    /// aggregation: a booking pays for every leg it contains.
    pub fn contains(&self, other: &Segment) -> bool {
        other.from >= self.from && other.to <= self.to
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_intervals() {
        assert!(Segment::new(3, 3).is_err());
        assert!(Segment::new(5, 2).is_err());
        assert!(Segment::new(-1, 4).is_err());
        assert!(Segment::new(0, 1).is_ok());
    }

    #[test]
    fn test_touching_endpoints_do_not_overlap() {
        let a = Segment::new(2, 5).unwrap();
        let b = Segment::new(5, 8).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = Segment::new(2, 5).unwrap();
        assert!(a.overlaps(&Segment::new(1, 3).unwrap()));
        assert!(a.overlaps(&Segment::new(4, 6).unwrap()));
        assert!(a.overlaps(&Segment::new(3, 4).unwrap()));
        assert!(a.overlaps(&Segment::new(1, 9).unwrap()));
        assert!(!a.overlaps(&Segment::new(0, 2).unwrap()));
    }

    #[test]
    fn test_containment() {
        let trip = Segment::new(1, 4).unwrap();
        assert!(trip.contains(&Segment::new(1, 2).unwrap()));
        assert!(trip.contains(&Segment::new(3, 4).unwrap()));
        assert!(!trip.contains(&Segment::new(4, 5).unwrap()));
        assert!(!trip.contains(&Segment::new(0, 2).unwrap()));
    }
}
