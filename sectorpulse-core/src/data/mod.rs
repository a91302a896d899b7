//! Source adapters: vendor clients and the per-market adapters built on them.

pub mod circuit_breaker;
pub mod csv_source;
pub mod finnhub;
pub mod provider;
pub mod universe;
pub mod universe_source;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_source::CsvSnapshotSource;
pub use finnhub::{CompanyProfile, FinnhubClient, RateLimiter};
pub use provider::{SourceAdapter, SourceError};
pub use universe::{MarketUniverse, UniverseError};
pub use universe_source::{ChartFeed, ProfileFeed, UniverseSource};
pub use yahoo::{ChartSeries, DailyBar, SessionStats, YahooChartClient};
