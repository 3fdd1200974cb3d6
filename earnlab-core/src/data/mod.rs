//! Data collaborators: providers, universe, record store

pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod store;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_import::{symbol_file_name, CsvEventProvider, CsvPriceProvider};
pub use provider::{DataError, DataSource, EventProvider, PriceProvider};
pub use store::{CsvRecordStore, RecordStore, RECORD_COLUMNS};
pub use synthetic::SyntheticPriceProvider;
pub use universe::{
    CachedUniverseResolver, EntityUniverse, Universe, UniverseMember, UniverseResolver,
    UNIVERSE_FILE,
};
pub use yahoo::YahooProvider;
