//! Integration tests for the data collaborators feeding the alignment engine.
//!
//! CSV events and prices → calendar index → record builder → record store,
//! with no network access.

use chrono::NaiveDate;
use earnlab_core::align::{build_records, AlignmentResolver};
use earnlab_core::calendar::TradingCalendarIndex;
use earnlab_core::data::{
    CsvEventProvider, CsvPriceProvider, CsvRecordStore, EventProvider, PriceProvider,
    RecordStore, SyntheticPriceProvider,
};
use earnlab_core::domain::{SessionSide, TimingTag};
use earnlab_core::UnknownTiming;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("earnlab_integration_{}_{id}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn write_fixture(dir: &PathBuf) -> (PathBuf, PathBuf) {
    let events = dir.join("events");
    let prices = dir.join("prices");
    fs::create_dir_all(&events).unwrap();
    fs::create_dir_all(&prices).unwrap();

    fs::write(
        events.join("ACME.csv"),
        "date,time,eps_estimate,eps_actual\n\
         2020-01-06,BMO,1.10,1.25\n\
         2020-01-03,AMC,1.00,0.95\n\
         2019-12-20,TNS,,\n",
    )
    .unwrap();
    fs::write(
        prices.join("ACME.csv"),
        "date,adj_close\n\
         2020-01-02,100.0\n\
         2020-01-03,101.0\n\
         2020-01-06,102.0\n\
         2020-01-07,103.0\n",
    )
    .unwrap();
    (events, prices)
}

#[test]
fn csv_sources_align_and_persist() {
    let dir = temp_dir();
    let (events_dir, prices_dir) = write_fixture(&dir);

    let provider = CsvEventProvider::new(&events_dir, UnknownTiming::AfterClose);
    let events = provider.fetch_events("ACME").unwrap();
    assert_eq!(events.len(), 3);

    let sessions = CsvPriceProvider::new(&prices_dir)
        .fetch_sessions("ACME", d("2019-12-01"), d("2020-01-31"))
        .unwrap();
    let index = TradingCalendarIndex::build(sessions).unwrap();
    let resolver = AlignmentResolver::new(provider.unknown_timing());

    let set = build_records(&events, &index, &resolver).unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.exhausted, 1);

    // 2019-12-20 predates the series
    assert_eq!(set.records[0].timing, TimingTag::Unknown);
    assert!(set.records[0].prices.is_empty());

    // Both worked examples land on the same bracket
    for record in &set.records[1..] {
        assert_eq!(record.prices.prev_close, Some(101.0));
        assert_eq!(record.prices.next_close, Some(102.0));
    }
    assert_eq!(set.records[2].session, SessionSide::BeforeOpen);

    let store = CsvRecordStore::new(dir.join("earnings"));
    let run = d("2020-02-01");
    store.write(run, "ACME", &set.records).unwrap();
    assert_eq!(store.read(run, "ACME").unwrap(), set.records);
    assert_eq!(store.entities(run).unwrap(), vec!["ACME"]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn synthetic_prices_feed_the_index() {
    let sessions = SyntheticPriceProvider::new()
        .fetch_sessions("ACME", d("2024-01-01"), d("2024-03-31"))
        .unwrap();
    let index = TradingCalendarIndex::build(sessions).unwrap();
    assert_eq!(index.first_date(), Some(d("2024-01-01")));
    assert_eq!(index.last_date(), Some(d("2024-03-29")));
}
