//! EarnLab Core: domain types, calendar index, alignment, data collaborators.
//!
//! This crate contains the alignment engine:
//! - Domain types (announcement events, trading sessions, aligned records)
//! - Trading calendar index with a single upper-bound lookup
//! - Alignment resolver mapping timing tags to bracketing closes
//! - Record builder joining an entity's events with the resolver
//! - Event and price providers, universe resolution, CSV record store

pub mod align;
pub mod calendar;
pub mod data;
pub mod domain;

pub use align::{build_records, AlignError, AlignmentResolver, RecordSet, UnknownTiming};
pub use calendar::{CalendarError, TradingCalendarIndex};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a batch worker touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::AnnouncementEvent>();
        require_sync::<domain::AnnouncementEvent>();
        require_send::<domain::TradingSession>();
        require_sync::<domain::TradingSession>();
        require_send::<domain::AlignedRecord>();
        require_sync::<domain::AlignedRecord>();

        // Alignment
        require_send::<TradingCalendarIndex>();
        require_sync::<TradingCalendarIndex>();
        require_send::<AlignmentResolver>();
        require_sync::<AlignmentResolver>();
        require_send::<RecordSet>();
        require_sync::<RecordSet>();
        require_send::<AlignError>();
        require_sync::<AlignError>();

        // Data collaborators
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvEventProvider>();
        require_sync::<data::CsvEventProvider>();
        require_send::<data::CsvRecordStore>();
        require_sync::<data::CsvRecordStore>();
        require_send::<data::EntityUniverse>();
        require_sync::<data::EntityUniverse>();
    }

    /// The orchestrator holds providers and the store as trait objects.
    #[test]
    fn collaborator_traits_are_object_safe() {
        fn _check(
            _events: &dyn data::EventProvider,
            _prices: &dyn data::PriceProvider,
            _store: &dyn data::RecordStore,
            _universe: &dyn data::UniverseResolver,
        ) {
        }
    }
}
