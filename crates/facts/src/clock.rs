//! Local-time fact at a configurable UTC offset.

use async_trait::async_trait;
use chatrelay_core::facts::{FactContext, FactProvider};
use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Renders the current wall-clock time at a fixed UTC offset (default
/// deployment: +9, KST).
pub struct ClockFact {
    offset: FixedOffset,
}

impl ClockFact {
    pub fn new(offset_hours: i32) -> Self {
        // Out-of-range (or overflowing) offsets fall back to UTC
        let offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    fn render(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.offset);
        format!("Current time: {}", local.format("%Y-%m-%d %H:%M"))
    }
}

#[async_trait]
impl FactProvider for ClockFact {
    fn name(&self) -> &str {
        "clock"
    }

    async fn fact(&self, _context: &FactContext) -> String {
        self.render(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_at_the_configured_offset() {
        let clock = ClockFact::new(9);
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 5, 30, 0).unwrap();
        assert_eq!(clock.render(now), "Current time: 2026-08-25 14:30");
    }

    #[test]
    fn offset_can_cross_a_date_boundary() {
        let clock = ClockFact::new(9);
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 20, 0, 0).unwrap();
        assert_eq!(clock.render(now), "Current time: 2026-08-26 05:00");
    }

    #[test]
    fn absurd_offset_falls_back_to_utc() {
        let clock = ClockFact::new(999);
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        assert_eq!(clock.render(now), "Current time: 2026-08-25 12:00");
    }

    #[test]
    fn extreme_offset_does_not_overflow() {
        for hours in [i32::MAX, i32::MIN] {
            let clock = ClockFact::new(hours);
            let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
            assert_eq!(clock.render(now), "Current time: 2026-08-25 12:00");
        }
    }
}
