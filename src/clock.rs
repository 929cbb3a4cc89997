//! # clock
//!
//! Wall-clock seam. The scheduler and every task read "now" through
//! [`Clock`] so tests can drive time by hand instead of sleeping.

use chrono::{DateTime, SecondsFormat, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_msc(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Milliseconds since the epoch → UTC instant. Out-of-range values map to the
/// epoch rather than panicking.
pub fn msc_to_dt(time_msc: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(time_msc).unwrap_or_default()
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn iso_millis(time_msc: i64) -> String {
    msc_to_dt(time_msc).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::{DateTime, Utc};

    use super::{msc_to_dt, Clock};

    /// Test clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        msc: AtomicI64,
    }

    impl ManualClock {
        pub fn at(dt: DateTime<Utc>) -> Self {
            Self { msc: AtomicI64::new(dt.timestamp_millis()) }
        }

        pub fn advance_ms(&self, ms: i64) {
            self.msc.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            msc_to_dt(self.msc.load(Ordering::SeqCst))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_millis() {
        assert_eq!(iso_millis(1_704_114_000_123), "2024-01-01T13:00:00.123Z");
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at(msc_to_dt(1_000));
        clock.advance_ms(250);
        assert_eq!(clock.now_msc(), 1_250);
    }
}
