//! Record building: one AlignedRecord per announcement, in emission order.

use super::resolver::{AlignError, AlignmentResolver, DataGap};
use crate::calendar::TradingCalendarIndex;
use crate::domain::{AlignedRecord, AnnouncementEvent};
use tracing::debug;

/// The aligned records of one entity plus gap counts for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub records: Vec<AlignedRecord>,
    /// Records whose announcement predates the price series.
    pub exhausted: usize,
    /// Records with at least one (but not all) closes unavailable.
    pub partial: usize,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Align every announcement of an entity against its calendar index.
///
/// Data gaps become unavailable fields on the record; the record is never
/// dropped. Contract violations (ambiguous or missing timing, announcements
/// out of order) fail the whole entity.
pub fn build_records(
    events: &[AnnouncementEvent],
    index: &TradingCalendarIndex,
    resolver: &AlignmentResolver,
) -> Result<RecordSet, AlignError> {
    let mut set = RecordSet {
        records: Vec::with_capacity(events.len()),
        ..RecordSet::default()
    };

    for (i, event) in events.iter().enumerate() {
        if i > 0 {
            let prev = events[i - 1].calendar_date;
            if event.calendar_date <= prev {
                return Err(AlignError::EventOrder {
                    prev,
                    next: event.calendar_date,
                });
            }
        }

        let resolution = resolver.resolve(event, index)?;
        match resolution.gap {
            Some(DataGap::SeriesExhausted) => {
                debug!(
                    entity = %event.entity_id,
                    date = %event.calendar_date,
                    "announcement predates price series"
                );
                set.exhausted += 1;
            }
            Some(DataGap::FieldsUnavailable(missing)) => {
                debug!(
                    entity = %event.entity_id,
                    date = %event.calendar_date,
                    missing,
                    "closes unavailable around announcement"
                );
                set.partial += 1;
            }
            None => {}
        }

        set.records
            .push(AlignedRecord::new(event, resolution.session, resolution.prices));
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionSide, TimingTag, TradingSession};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn index() -> TradingCalendarIndex {
        let closes = [
            ("2023-12-29", 99.0),
            ("2024-01-02", 100.0),
            ("2024-01-03", 101.0),
            ("2024-01-04", 102.0),
            ("2024-01-05", 103.0),
            ("2024-01-08", 104.0),
        ];
        TradingCalendarIndex::build(
            closes
                .iter()
                .map(|(date, close)| TradingSession::new(d(date), *close))
                .collect(),
        )
        .unwrap()
    }

    fn event(date: &str, timing: TimingTag) -> AnnouncementEvent {
        AnnouncementEvent::new("MSFT", d(date), timing).with_metrics(Some(1.0), Some(1.1))
    }

    #[test]
    fn one_record_per_event_in_order() {
        let events = vec![
            event("2023-06-01", TimingTag::AfterMarketClose),
            event("2024-01-03", TimingTag::BeforeMarketOpen),
            event("2024-01-08", TimingTag::Unknown),
        ];
        let set = build_records(&events, &index(), &AlignmentResolver::default()).unwrap();

        assert_eq!(set.len(), 3);
        let dates: Vec<_> = set.records.iter().map(|r| r.calendar_date).collect();
        assert_eq!(dates, vec![d("2023-06-01"), d("2024-01-03"), d("2024-01-08")]);

        // Predates the series
        assert!(set.records[0].prices.is_empty());
        assert_eq!(set.exhausted, 1);

        // BMO on 01-03: prev = 01-02, next = 01-03
        assert_eq!(set.records[1].session, SessionSide::BeforeOpen);
        assert_eq!(set.records[1].prices.prev_close, Some(100.0));
        assert_eq!(set.records[1].prices.next_close, Some(101.0));

        // Unknown defaults to AMC on the last session: no next closes yet
        assert_eq!(set.records[2].session, SessionSide::AfterClose);
        assert_eq!(set.records[2].prices.prev_close, Some(104.0));
        assert_eq!(set.records[2].prices.next_close, None);
        assert_eq!(set.partial, 1);
    }

    #[test]
    fn provider_metrics_are_carried_through() {
        let events = vec![event("2024-01-03", TimingTag::AfterMarketClose)];
        let set = build_records(&events, &index(), &AlignmentResolver::default()).unwrap();
        assert_eq!(set.records[0].estimated_metric, Some(1.0));
        assert_eq!(set.records[0].actual_metric, Some(1.1));
        assert_eq!(set.records[0].entity_id, "MSFT");
    }

    #[test]
    fn ambiguous_hour_fails_the_whole_set() {
        let events = vec![
            event("2024-01-02", TimingTag::AfterMarketClose),
            event("2024-01-04", TimingTag::Hour(11)),
        ];
        let err = build_records(&events, &index(), &AlignmentResolver::default()).unwrap_err();
        assert!(matches!(err, AlignError::TimingAmbiguous { hour: 11, .. }));
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let events = vec![
            event("2024-01-04", TimingTag::AfterMarketClose),
            event("2024-01-02", TimingTag::AfterMarketClose),
        ];
        let err = build_records(&events, &index(), &AlignmentResolver::default()).unwrap_err();
        assert_eq!(
            err,
            AlignError::EventOrder {
                prev: d("2024-01-04"),
                next: d("2024-01-02")
            }
        );
    }

    #[test]
    fn empty_series_gives_all_unavailable_records() {
        let events = vec![
            event("2024-01-02", TimingTag::AfterMarketClose),
            event("2024-04-02", TimingTag::BeforeMarketOpen),
        ];
        let set = build_records(
            &events,
            &TradingCalendarIndex::empty(),
            &AlignmentResolver::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.records.iter().all(|r| r.prices.is_empty()));
        assert_eq!(set.exhausted, 2);
    }

    #[test]
    fn no_events_no_records() {
        let set = build_records(&[], &index(), &AlignmentResolver::default()).unwrap();
        assert!(set.is_empty());
    }
}
