//! SectorPulse Core — domain types, filtering, sector aggregation, trend scoring.
//!
//! This crate holds everything that does not touch the database or a
//! notification channel:
//! - Domain types (instruments, sector performance, trend scores, markets)
//! - Vendor taxonomy tables mapping vendor sector strings to [`domain::Sector`]
//! - Filter engine (market-cap, survivor volume percentile, abnormal moves)
//! - Sector aggregator and cross-country trend scorer
//! - Source adapters (Yahoo chart, Finnhub profile, CSV snapshots)

pub mod aggregate;
pub mod data;
pub mod domain;
pub mod filter;
pub mod score;
pub mod stats;
pub mod taxonomy;

pub use aggregate::aggregate_sectors;
pub use filter::{screen, FilterPolicy, FilterSummary};
pub use score::{score_sectors, TrendConfig, TrendWeights};
