//! # session
//!
//! Trading-session labels derived from UTC time of day, and the edge-triggered
//! tracker that turns a stream of instants into [`SessionEvent`]s.
//!
//! ```text
//!  00:00        07:00          12:00            16:00        21:00     24:00
//!    │   Asia     │   London     │ LondonNY_Overlap │  NewYork   │  Asia  │
//! ```

use std::fmt;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Session {
    Asia,
    London,
    NewYork,
    #[serde(rename = "LondonNY_Overlap")]
    LondonNyOverlap,
}

impl Session {
    pub fn as_str(self) -> &'static str {
        match self {
            Session::Asia            => "Asia",
            Session::London          => "London",
            Session::NewYork         => "NewYork",
            Session::LondonNyOverlap => "LondonNY_Overlap",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an instant. Half-open windows on fractional UTC hours, overlap
/// checked first.
pub fn session_of(dt: DateTime<Utc>) -> Session {
    let h = dt.hour() as f64 + dt.minute() as f64 / 60.0;

    if (12.0..16.0).contains(&h) {
        Session::LondonNyOverlap
    } else if (7.0..16.0).contains(&h) {
        Session::London
    } else if (12.0..21.0).contains(&h) {
        Session::NewYork
    } else {
        Session::Asia
    }
}

// ─── Transition Tracker ───────────────────────────────────────────────────────

/// Holds the last seen label and reports changes.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    current: Option<Session>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Session> {
        self.current
    }

    /// Returns an event only when the label differs from the held one.
    /// The very first observation of a fresh tracker counts as a change,
    /// with `previous_session = None`.
    pub fn observe(&mut self, dt: DateTime<Utc>) -> Option<SessionEvent> {
        let session = session_of(dt);
        if self.current == Some(session) {
            return None;
        }

        let event = SessionEvent {
            time_dt:          dt.to_rfc3339(),
            session,
            previous_session: self.current,
            weekday:          dt.format("%A").to_string(),
        };
        self.current = Some(session);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, h, m, 0).unwrap()
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(session_of(at(6, 59)), Session::Asia);
        assert_eq!(session_of(at(7, 0)), Session::London);
        assert_eq!(session_of(at(11, 59)), Session::London);
        assert_eq!(session_of(at(12, 0)), Session::LondonNyOverlap);
        assert_eq!(session_of(at(15, 59)), Session::LondonNyOverlap);
        assert_eq!(session_of(at(16, 0)), Session::NewYork);
        assert_eq!(session_of(at(20, 59)), Session::NewYork);
        assert_eq!(session_of(at(21, 0)), Session::Asia);
        assert_eq!(session_of(at(0, 0)), Session::Asia);
    }

    #[test]
    fn test_same_session_produces_no_events() {
        let mut tracker = SessionTracker::new();
        assert!(tracker.observe(at(7, 30)).is_some());
        let events: Vec<_> = [at(8, 0), at(9, 30), at(11, 59)]
            .into_iter()
            .filter_map(|dt| tracker.observe(dt))
            .collect();
        assert!(events.is_empty());
    }

    #[test]
    fn test_crossing_boundary_produces_exactly_one_event() {
        let mut tracker = SessionTracker::new();
        assert!(tracker.observe(at(7, 30)).is_some());
        let events: Vec<_> = [at(11, 58), at(11, 59), at(12, 0), at(12, 1), at(13, 0)]
            .into_iter()
            .filter_map(|dt| tracker.observe(dt))
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session, Session::LondonNyOverlap);
        assert_eq!(events[0].previous_session, Some(Session::London));
        assert_eq!(events[0].weekday, "Wednesday");
    }

    #[test]
    fn test_first_observation_has_no_previous() {
        let mut tracker = SessionTracker::new();
        let event = tracker.observe(at(3, 0)).unwrap();
        assert_eq!(event.session, Session::Asia);
        assert_eq!(event.previous_session, None);
        assert!(tracker.observe(at(4, 0)).is_none());
    }

    #[test]
    fn test_serde_label() {
        let json = serde_json::to_string(&Session::LondonNyOverlap).unwrap();
        assert_eq!(json, r#""LondonNY_Overlap""#);
    }
}
