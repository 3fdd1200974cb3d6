//! Domain types for EarnLab

pub mod event;
pub mod record;
pub mod session;

pub use event::{AnnouncementEvent, ParseTimingError, TimingTag};
pub use record::{AlignedRecord, PriceWindow, SessionSide};
pub use session::TradingSession;
