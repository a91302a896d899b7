//! Canonical per-instrument record produced by every source adapter.

use super::sector::Sector;
use serde::{Deserialize, Serialize};

/// One instrument on one trading day in one market.
///
/// Every adapter normalizes its vendor payload into this shape; vendor
/// sector strings are already mapped to [`Sector`] by the time a record
/// exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub ticker: String,
    pub name: String,
    pub sector: Sector,
    /// Market capitalization in local currency units.
    pub market_cap: Option<f64>,
    pub close_price: f64,
    /// Daily return in percent.
    pub daily_return: Option<f64>,
    pub volume: Option<f64>,
    pub avg_volume_20d: Option<f64>,
}

impl InstrumentRecord {
    /// Minimal record; optional fields start empty.
    pub fn new(ticker: impl Into<String>, name: impl Into<String>, sector: Sector, close_price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            sector,
            market_cap: None,
            close_price,
            daily_return: None,
            volume: None,
            avg_volume_20d: None,
        }
    }
}

/// Filter decision attached to a record.
///
/// The two flags are independent: an instrument can be excluded by the
/// liquidity filters and flagged abnormal at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFlags {
    /// Excluded by the market-cap or volume filter.
    pub is_filtered: bool,
    /// Absolute daily return above the abnormal-move threshold.
    pub is_abnormal: bool,
}

impl FilterFlags {
    /// Contributes to sector aggregation.
    pub fn is_active(&self) -> bool {
        !self.is_filtered && !self.is_abnormal
    }
}

/// An instrument record annotated with its filter decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenedInstrument {
    pub record: InstrumentRecord,
    pub flags: FilterFlags,
}

impl ScreenedInstrument {
    pub fn is_active(&self) -> bool {
        self.flags.is_active()
    }
}
