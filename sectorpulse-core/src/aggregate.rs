//! Sector aggregator — reduces one market's active instruments into one
//! [`SectorPerformance`] row per sector.
//!
//! Degenerate groups resolve to documented defaults instead of nulls:
//! a group with no returns has `daily_return = 0.0` and `breadth = 0.0`, and
//! a group with no usable volume pairs has `volume_change = 0.0`.
//! Values are rounded only when the row is built.

use crate::domain::{InstrumentRecord, Market, Mover, ScreenedInstrument, Sector, SectorPerformance};
use crate::stats::{mean, round_to};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Number of gainers and losers kept per sector.
pub const TOP_MOVERS: usize = 3;

/// Aggregate active instruments by sector.
///
/// Only instruments with both filter flags clear contribute. Instruments in
/// [`Sector::Other`] never produce a row. Rows come out in sector order.
pub fn aggregate_sectors(
    date: NaiveDate,
    market: Market,
    screened: &[ScreenedInstrument],
    collected_at: DateTime<Utc>,
) -> Vec<SectorPerformance> {
    let mut groups: BTreeMap<Sector, Vec<&InstrumentRecord>> = BTreeMap::new();
    for item in screened.iter().filter(|s| s.is_active()) {
        if item.record.sector.is_other() {
            continue;
        }
        groups.entry(item.record.sector).or_default().push(&item.record);
    }

    groups
        .into_iter()
        .map(|(sector, group)| {
            let metrics = SectorMetrics::compute(&group);
            SectorPerformance {
                date,
                market,
                sector,
                daily_return: Some(round_to(metrics.avg_return, 4)),
                weekly_return: None,
                breadth: round_to(metrics.breadth, 4),
                volume_change: round_to(metrics.volume_change, 2),
                stock_count: group.len(),
                top_gainers: metrics.top_gainers,
                top_losers: metrics.top_losers,
                collected_at,
            }
        })
        .collect()
}

/// Unrounded metrics for one sector group.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMetrics {
    pub avg_return: f64,
    pub breadth: f64,
    pub volume_change: f64,
    pub top_gainers: Vec<Mover>,
    pub top_losers: Vec<Mover>,
}

impl SectorMetrics {
    pub fn compute(group: &[&InstrumentRecord]) -> Self {
        let returns: Vec<f64> = group.iter().filter_map(|r| r.daily_return).collect();
        let avg_return = mean(&returns).unwrap_or(0.0);
        let breadth = if returns.is_empty() {
            0.0
        } else {
            returns.iter().filter(|&&r| r > 0.0).count() as f64 / returns.len() as f64
        };

        let ratios: Vec<f64> = group
            .iter()
            .filter_map(|r| match (r.volume, r.avg_volume_20d) {
                (Some(vol), Some(avg)) if avg > 0.0 => Some(vol / avg),
                _ => None,
            })
            .collect();
        let volume_change = mean(&ratios).map_or(0.0, |m| (m - 1.0) * 100.0);

        let (top_gainers, top_losers) = top_movers(group);

        Self {
            avg_return,
            breadth,
            volume_change,
            top_gainers,
            top_losers,
        }
    }
}

/// Gainers are the head and losers the tail of the same descending order.
///
/// With fewer than `2 * TOP_MOVERS` priced instruments the two lists
/// overlap; both keep descending order.
fn top_movers(group: &[&InstrumentRecord]) -> (Vec<Mover>, Vec<Mover>) {
    let mut priced: Vec<(&InstrumentRecord, f64)> = group
        .iter()
        .filter_map(|r| r.daily_return.map(|ret| (*r, ret)))
        .collect();
    // Stable sort keeps input order among ties.
    priced.sort_by(|a, b| b.1.total_cmp(&a.1));

    let to_mover = |(record, ret): &(&InstrumentRecord, f64)| Mover {
        name: record.name.clone(),
        daily_return: round_to(*ret, 2),
    };

    let gainers = priced.iter().take(TOP_MOVERS).map(to_mover).collect();
    let losers = priced[priced.len().saturating_sub(TOP_MOVERS)..]
        .iter()
        .map(to_mover)
        .collect();
    (gainers, losers)
}
