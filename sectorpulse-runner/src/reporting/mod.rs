//! Plain-text reports rendered from the store.
//!
//! Renderers never fail on missing data: empty tables produce placeholder
//! text. Only store errors propagate.

pub mod chunk;
pub mod daily;
pub mod detail;

pub use chunk::{chunk_blocks, MESSAGE_LIMIT};
pub use daily::{render_abnormal_report, render_daily_report, render_trending};
pub use detail::{render_country_detail, render_sector_detail};

use crate::store::{Store, StoreError};
use chrono::{NaiveDate, Utc};

pub(crate) const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Explicit date, else the latest collected date, else today (UTC).
pub fn resolve_date(store: &Store, date: Option<NaiveDate>) -> Result<NaiveDate, StoreError> {
    match date {
        Some(d) => Ok(d),
        None => Ok(store
            .latest_sector_date()?
            .unwrap_or_else(|| Utc::now().date_naive())),
    }
}

pub(crate) fn arrow(ret: f64) -> &'static str {
    if ret > 0.0 {
        "▲"
    } else if ret < 0.0 {
        "▼"
    } else {
        "■"
    }
}
