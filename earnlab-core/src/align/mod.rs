//! Announcement-to-session alignment

pub mod builder;
pub mod resolver;

pub use builder::{build_records, RecordSet};
pub use resolver::{
    AlignError, AlignmentResolver, DataGap, Resolution, UnknownTiming, MARKET_CLOSE_HOUR,
    MARKET_OPEN_HOUR,
};
