//! Write-only audit records: collection attempts and benchmark quotes.

use super::sector::Sector;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Success,
    Failed,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collection attempt for one market. Never read by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionLogEntry {
    pub timestamp: DateTime<Utc>,
    /// Market code, or `BENCHMARK`.
    pub market: String,
    pub status: CollectionStatus,
    pub total: usize,
    pub filtered: usize,
    pub abnormal: usize,
    pub error: Option<String>,
}

impl CollectionLogEntry {
    pub fn success(market: impl Into<String>, total: usize, filtered: usize, abnormal: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            market: market.into(),
            status: CollectionStatus::Success,
            total,
            filtered,
            abnormal,
            error: None,
        }
    }

    pub fn failed(market: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            market: market.into(),
            status: CollectionStatus::Failed,
            total: 0,
            filtered: 0,
            abnormal: 0,
            error: Some(error.into()),
        }
    }
}

/// Daily quote for a sector ETF or composite index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub date: NaiveDate,
    pub ticker: String,
    /// Short key such as `US_IT` or `KR_KOSPI`.
    pub label: String,
    /// Market code, or `GL` for global funds.
    pub region: String,
    /// `None` for composite indices.
    pub sector: Option<Sector>,
    pub close_price: f64,
    pub daily_return: Option<f64>,
    /// Return versus five sessions earlier (percent).
    pub weekly_return: Option<f64>,
}
