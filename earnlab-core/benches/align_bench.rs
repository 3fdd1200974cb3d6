//! Criterion benchmarks for the alignment hot path.
//!
//! Benchmarks:
//! 1. Calendar index construction over long series
//! 2. Single-event resolution (one upper-bound lookup)
//! 3. Record building for a full earnings history

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use earnlab_core::align::{build_records, AlignmentResolver};
use earnlab_core::calendar::TradingCalendarIndex;
use earnlab_core::data::{PriceProvider, SyntheticPriceProvider};
use earnlab_core::domain::{AnnouncementEvent, TimingTag, TradingSession};

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 1, 2).unwrap()
}

fn make_sessions(years: i64) -> Vec<TradingSession> {
    SyntheticPriceProvider::new()
        .fetch_sessions("BENCH", start(), start() + Duration::days(years * 365))
        .unwrap()
}

/// Quarterly announcements alternating BMO and AMC.
fn make_events(years: i64) -> Vec<AnnouncementEvent> {
    (0..years * 4)
        .map(|q| {
            let timing = if q % 2 == 0 {
                TimingTag::BeforeMarketOpen
            } else {
                TimingTag::AfterMarketClose
            };
            AnnouncementEvent::new("BENCH", start() + Duration::days(q * 91 + 30), timing)
        })
        .collect()
}

// ── 1. Index construction ────────────────────────────────────────────

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    for years in [5, 30] {
        let sessions = make_sessions(years);
        group.bench_with_input(BenchmarkId::from_parameter(years), &sessions, |b, s| {
            b.iter(|| TradingCalendarIndex::build(black_box(s.clone())).unwrap())
        });
    }
    group.finish();
}

// ── 2. Single resolution ─────────────────────────────────────────────

fn bench_resolve(c: &mut Criterion) {
    let index = TradingCalendarIndex::build(make_sessions(30)).unwrap();
    let resolver = AlignmentResolver::default();
    let event = AnnouncementEvent::new(
        "BENCH",
        start() + Duration::days(15 * 365),
        TimingTag::AfterMarketClose,
    );

    c.bench_function("resolve_30y", |b| {
        b.iter(|| resolver.resolve(black_box(&event), black_box(&index)).unwrap())
    });
}

// ── 3. Record building ───────────────────────────────────────────────

fn bench_build_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_records");
    for years in [5, 30] {
        let index = TradingCalendarIndex::build(make_sessions(years)).unwrap();
        let events = make_events(years);
        let resolver = AlignmentResolver::default();
        group.bench_with_input(BenchmarkId::from_parameter(years), &events, |b, ev| {
            b.iter(|| build_records(black_box(ev), &index, &resolver).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_index_build, bench_resolve, bench_build_records);
criterion_main!(benches);
