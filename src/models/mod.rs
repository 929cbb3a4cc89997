//! Record types shared by the source, the enricher and the log writers.

pub mod bar;
pub mod depth;
pub mod records;
pub mod symbol;
pub mod tick;

pub use bar::{Bar, Timeframe};
pub use depth::{BookEntry, DepthLevel};
pub use records::{HeartbeatRecord, SessionEvent};
pub use symbol::{MetadataSnapshot, SymbolInfo};
pub use tick::{EnrichedTick, RawTick};
