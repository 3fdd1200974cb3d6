//! Property tests for the price window.

use chrono::{Duration, NaiveDate};
use earnlab_core::domain::{AnnouncementEvent, TimingTag};
use earnlab_runner::price_window;
use proptest::prelude::*;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

proptest! {
    /// The window covers every event up to the run date with at least the
    /// configured padding, and never extends past the run date.
    #[test]
    fn window_covers_events(
        offsets in prop::collection::vec(0i64..3000, 1..20),
        padding in 7i64..30,
        run_offset in 0i64..3200,
    ) {
        let run_date = base() + Duration::days(run_offset);
        let events: Vec<AnnouncementEvent> = offsets
            .iter()
            .map(|o| AnnouncementEvent::new("P", base() + Duration::days(*o), TimingTag::AfterMarketClose))
            .collect();
        let earliest = events.iter().map(|e| e.calendar_date).min().unwrap();

        match price_window(&events, padding, run_date) {
            Some((start, end)) => {
                prop_assert!(start <= end);
                prop_assert!(end <= run_date);
                prop_assert_eq!(start, earliest - Duration::days(padding));
                for e in events.iter().filter(|e| e.calendar_date <= run_date) {
                    prop_assert!(e.calendar_date - start >= Duration::days(padding));
                    prop_assert!(e.calendar_date <= end);
                }
            }
            None => prop_assert!(earliest - Duration::days(padding) > run_date),
        }
    }
}
