//! The daily report: trend summary, per-country sector breakdown and
//! abnormal movers.

use super::chunk::{chunk_blocks, MESSAGE_LIMIT};
use super::{arrow, resolve_date, RULE};
use crate::store::{Store, StoreError, StoredInstrument};
use chrono::NaiveDate;
use sectorpulse_core::domain::{Market, SectorPerformance, TrendScore};

const TOP_TRENDING: usize = 5;
const WEAK_WINDOW: usize = 3;
const MAX_ABNORMAL: usize = 10;

/// Render the daily report for `date` (latest collected date when `None`)
/// as message blocks, each within the channel limit.
pub fn render_daily_report(store: &Store, date: Option<NaiveDate>) -> Result<Vec<String>, StoreError> {
    let date = resolve_date(store, date)?;
    let scores = store.trend_scores(date)?;
    let rows = store.sector_performance(Some(date), None)?;
    let abnormal = store.abnormal_instruments(Some(date))?;

    let mut blocks = vec![render_header(date, &scores)];

    let mut any_country = false;
    for market in Market::ALL {
        let entries: Vec<&SectorPerformance> = rows.iter().filter(|r| r.market == market).collect();
        if entries.is_empty() {
            continue;
        }
        any_country = true;
        blocks.push(render_country_block(market, entries));
    }
    if !any_country {
        blocks.push(format!("(no sector data for {date})\n"));
    }

    if !abnormal.is_empty() {
        blocks.push(render_abnormal(&abnormal));
    }

    Ok(chunk_blocks(&blocks, MESSAGE_LIMIT))
}

/// Only the trend summary block of the daily report.
pub fn render_trending(store: &Store, date: Option<NaiveDate>) -> Result<String, StoreError> {
    let date = resolve_date(store, date)?;
    Ok(render_header(date, &store.trend_scores(date)?))
}

/// Only the abnormal-movers block. Without a date, the latest date that
/// has any abnormal instrument is used.
pub fn render_abnormal_report(store: &Store, date: Option<NaiveDate>) -> Result<String, StoreError> {
    let abnormal = store.abnormal_instruments(date)?;
    if abnormal.is_empty() {
        return Ok(match date {
            Some(d) => format!("No abnormal moves on {d}."),
            None => "No abnormal moves recorded.".to_string(),
        });
    }
    Ok(render_abnormal(&abnormal))
}

fn render_header(date: NaiveDate, scores: &[TrendScore]) -> String {
    let mut msg = format!("📊 Global Sector Daily Report ({date})\n{RULE}\n\n");

    if scores.is_empty() {
        msg.push_str("(no trend score data)\n");
        return msg;
    }

    msg.push_str(&format!("🔥 Top {TOP_TRENDING} trending sectors\n"));
    for (i, t) in scores.iter().take(TOP_TRENDING).enumerate() {
        let direction = if t.score > 0.0 { "▲" } else { "▼" };
        let total = t.countries_positive + t.countries_negative;
        msg.push_str(&format!(
            "  {}. {} {} | score {:+.0} | {}/{} countries up\n",
            i + 1,
            t.sector,
            direction,
            t.score,
            t.countries_positive,
            total
        ));
    }

    let tail = &scores[scores.len().saturating_sub(WEAK_WINDOW)..];
    let weak: Vec<&TrendScore> = tail.iter().filter(|t| t.score < 0.0).collect();
    if !weak.is_empty() {
        msg.push_str("\n❄️ Weak sectors\n");
        for t in weak {
            let total = t.countries_positive + t.countries_negative;
            msg.push_str(&format!(
                "  ▼ {} | score {:+.0} | {}/{} countries down\n",
                t.sector, t.score, t.countries_negative, total
            ));
        }
    }
    msg
}

fn render_country_block(market: Market, mut entries: Vec<&SectorPerformance>) -> String {
    let analyzed: usize = entries.iter().map(|e| e.stock_count).sum();

    let mut msg = format!("{} {}", market.flag(), market.display_name());
    if analyzed > 0 {
        msg.push_str(&format!(" (analyzed {analyzed} stocks)"));
    }
    msg.push('\n');

    entries.sort_by(|a, b| {
        let (x, y) = (a.daily_return.unwrap_or(0.0), b.daily_return.unwrap_or(0.0));
        y.total_cmp(&x)
    });

    for e in entries.into_iter().filter(|e| !e.sector.is_other()) {
        let ret = e.daily_return.unwrap_or(0.0);
        let mut line = format!("  {} {} {:+.2}%", arrow(ret), e.sector, ret);
        let breadth_pct = e.breadth * 100.0;
        if breadth_pct > 0.0 {
            line.push_str(&format!(" | up {breadth_pct:.0}%"));
        }
        if let Some(top) = e.top_gainers.first() {
            line.push_str(&format!(" | {} {:+.1}%", top.name, top.daily_return));
        }
        msg.push_str(&line);
        msg.push('\n');
    }
    msg
}

fn render_abnormal(abnormal: &[StoredInstrument]) -> String {
    let mut msg = format!("⚠️ Abnormal moves ({} stocks)\n", abnormal.len());
    for a in abnormal.iter().take(MAX_ABNORMAL) {
        let ret = a.record.daily_return.unwrap_or(0.0);
        msg.push_str(&format!("  {} {} {:+.1}%", a.market.flag(), a.record.name, ret));
        if let Some(cap) = a.record.market_cap.filter(|c| *c > 0.0) {
            msg.push_str(&format!(" (cap {})", format_market_cap(a.market, cap)));
        }
        msg.push('\n');
    }
    msg
}

/// KRW caps in units of 100M (억), everything else in millions.
pub fn format_market_cap(market: Market, cap: f64) -> String {
    match market {
        Market::KR => format!("{}억 KRW", group_thousands(cap / 1e8)),
        _ => format!("{}M {}", group_thousands(cap / 1e6), market.currency()),
    }
}

fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}
