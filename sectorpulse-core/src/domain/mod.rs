//! Domain types shared by every pipeline stage.

pub mod audit;
pub mod instrument;
pub mod market;
pub mod performance;
pub mod sector;
pub mod trend;

pub use audit::{BenchmarkRecord, CollectionLogEntry, CollectionStatus};
pub use instrument::{FilterFlags, InstrumentRecord, ScreenedInstrument};
pub use market::{CollectTarget, Market, MarketSelection, UnknownMarket};
pub use performance::{Mover, SectorPerformance};
pub use sector::{Sector, UnknownSector};
pub use trend::{MomentumSignal, TrendScore, UnknownSignal};
