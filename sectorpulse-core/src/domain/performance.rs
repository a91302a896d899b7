//! Sector-level performance aggregates, one per (date, market, sector).

use super::market::Market;
use super::sector::Sector;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A named instrument and its daily return (percent, 2 decimals).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub name: String,
    #[serde(rename = "return")]
    pub daily_return: f64,
}

/// Aggregated performance of one sector in one market on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorPerformance {
    pub date: NaiveDate,
    pub market: Market,
    pub sector: Sector,
    /// Mean daily return of active instruments (percent).
    pub daily_return: Option<f64>,
    /// Filled in outside the aggregator; `None` until then.
    pub weekly_return: Option<f64>,
    /// Fraction of active instruments with a positive return.
    pub breadth: f64,
    /// Mean volume relative to the 20-day average, minus one, in percent.
    pub volume_change: f64,
    pub stock_count: usize,
    pub top_gainers: Vec<Mover>,
    pub top_losers: Vec<Mover>,
    pub collected_at: DateTime<Utc>,
}
