//! Identifiers and timestamps for new records.

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

/// Fresh random identifier (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Millisecond clock whose readings strictly increase.
///
/// When the wall clock has not advanced past the previous reading (same
/// millisecond, or stepped backwards) the clock issues the previous reading
/// plus one millisecond.
#[derive(Debug, Clone, Default)]
pub struct MonotonicClock {
    last: Option<DateTime<Utc>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock whose first reading is later than `floor`.
    pub fn after(floor: Option<DateTime<Utc>>) -> Self {
        Self { last: floor }
    }

    pub fn now(&mut self) -> DateTime<Utc> {
        self.advance(Utc::now())
    }

    /// Issue the next reading given the current wall-clock time.
    pub(crate) fn advance(&mut self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let wall = DateTime::from_timestamp_millis(wall.timestamp_millis()).unwrap_or(wall);
        let next = match self.last {
            Some(last) if wall <= last => last + TimeDelta::milliseconds(1),
            _ => wall,
        };
        self.last = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn readings_strictly_increase_within_a_millisecond() {
        let mut clock = MonotonicClock::new();
        let a = clock.advance(at(1_000));
        let b = clock.advance(at(1_000));
        let c = clock.advance(at(1_000));
        assert!(a < b && b < c);
        assert_eq!(c, at(1_002));
    }

    #[test]
    fn backwards_wall_clock_is_ignored() {
        let mut clock = MonotonicClock::new();
        clock.advance(at(5_000));
        assert_eq!(clock.advance(at(4_000)), at(5_001));
        assert_eq!(clock.advance(at(9_000)), at(9_000));
    }

    #[test]
    fn seeded_clock_starts_after_floor() {
        let mut clock = MonotonicClock::after(Some(at(10_000)));
        assert_eq!(clock.advance(at(2_000)), at(10_001));
    }

    #[test]
    fn sub_millisecond_precision_is_dropped() {
        let mut clock = MonotonicClock::new();
        let wall = at(7_000) + TimeDelta::microseconds(450);
        assert_eq!(clock.advance(wall), at(7_000));
    }

    #[test]
    fn ids_are_unique_uuids() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
