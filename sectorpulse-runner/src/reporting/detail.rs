//! Single-block drill-down views for one sector or one country.

use super::{arrow, resolve_date, RULE};
use crate::store::{Store, StoreError};
use chrono::NaiveDate;
use sectorpulse_core::domain::{Market, Sector};

const DETAIL_GAINERS: usize = 3;

/// One sector across every collected country, strongest first.
pub fn render_sector_detail(store: &Store, sector: Sector, date: Option<NaiveDate>) -> Result<String, StoreError> {
    let date = resolve_date(store, date)?;
    let rows = store.sector_detail(date, sector)?;
    if rows.is_empty() {
        return Ok(format!("❌ No data found for sector '{sector}' on {date}."));
    }

    let mut msg = format!("🔍 {sector} by country ({date})\n{RULE}\n\n");
    for r in &rows {
        let ret = r.daily_return.unwrap_or(0.0);
        msg.push_str(&format!(
            "{} {}: {} {:+.2}% | up {:.0}% | {} stocks\n",
            r.market.flag(),
            r.market.display_name(),
            arrow(ret),
            ret,
            r.breadth * 100.0,
            r.stock_count
        ));
        for g in r.top_gainers.iter().take(DETAIL_GAINERS) {
            msg.push_str(&format!("    ↑ {} {:+.1}%\n", g.name, g.daily_return));
        }
    }
    Ok(msg)
}

/// Every sector of one country, strongest first.
pub fn render_country_detail(store: &Store, market: Market, date: Option<NaiveDate>) -> Result<String, StoreError> {
    let date = resolve_date(store, date)?;
    let rows = store.sector_performance(Some(date), Some(market))?;
    if rows.is_empty() {
        return Ok(format!("❌ No data found for {} on {date}.", market.display_name()));
    }

    let mut msg = format!(
        "{} {} sectors ({date})\n{RULE}\n\n",
        market.flag(),
        market.display_name()
    );
    for r in rows.iter().filter(|r| !r.sector.is_other()) {
        let ret = r.daily_return.unwrap_or(0.0);
        msg.push_str(&format!(
            "{} {} {:+.2}% | up {:.0}% | {} stocks\n",
            arrow(ret),
            r.sector,
            ret,
            r.breadth * 100.0,
            r.stock_count
        ));
    }
    Ok(msg)
}
