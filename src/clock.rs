use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::Mutex;

/// Zone in which calendar windows are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarZone {
    /// The host's zone, with the offset resolved per date so DST shifts apply.
    Local,
    Fixed(FixedOffset),
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn zone(&self) -> CalendarZone {
        CalendarZone::Local
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn zone(&self) -> CalendarZone {
        CalendarZone::Fixed(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::{CalendarZone, Clock, ManualClock, SystemClock};
    use chrono::{Duration, FixedOffset, TimeZone, Utc};

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let dubai = FixedOffset::east_opt(4 * 3600).unwrap();
        let clock = ManualClock::new(start, dubai);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.zone(), CalendarZone::Fixed(dubai));
        assert_eq!(SystemClock.zone(), CalendarZone::Local);

        clock.advance(Duration::seconds(31));
        assert_eq!(clock.now(), start + Duration::seconds(31));
    }
}
