//! Cross-country scoring pass over stored sector rows.

use crate::store::{Store, StoreError};
use chrono::NaiveDate;
use sectorpulse_core::domain::TrendScore;
use sectorpulse_core::{score_sectors, TrendConfig};
use tracing::{info, warn};

/// Score every sector for `date` from whatever markets have been collected
/// and upsert the results. Benchmark weekly returns are copied onto the
/// sector rows first so momentum can use them.
pub fn run_scoring(date: NaiveDate, config: &TrendConfig, store: &Store) -> Result<Vec<TrendScore>, StoreError> {
    store.transaction(|s| {
        s.apply_benchmark_weekly(date)?;

        let rows = s.sector_performance(Some(date), None)?;
        if rows.is_empty() {
            warn!(%date, "no sector data to score");
            return Ok(Vec::new());
        }

        let scores = score_sectors(date, &rows, config);
        s.upsert_trend_scores(&scores)?;

        let markets = {
            let mut m: Vec<_> = rows.iter().map(|r| r.market).collect();
            m.sort();
            m.dedup();
            m.len()
        };
        info!(%date, markets, sectors = scores.len(), "trend scores updated");
        Ok(scores)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sectorpulse_core::domain::{BenchmarkRecord, Market, MomentumSignal, Sector, SectorPerformance};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn perf(market: Market, sector: Sector, ret: f64) -> SectorPerformance {
        SectorPerformance {
            date: date(),
            market,
            sector,
            daily_return: Some(ret),
            weekly_return: None,
            breadth: 1.0,
            volume_change: 0.0,
            stock_count: 3,
            top_gainers: vec![],
            top_losers: vec![],
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn no_data_yields_no_scores() {
        let store = Store::open_in_memory().unwrap();
        assert!(run_scoring(date(), &TrendConfig::default(), &store).unwrap().is_empty());
        assert!(!store.has_trend_scores(date()).unwrap());
    }

    #[test]
    fn three_country_scenario_is_stored() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_sector_performance(&[
                perf(Market::US, Sector::InformationTechnology, 2.0),
                perf(Market::KR, Sector::InformationTechnology, -1.0),
                perf(Market::CN, Sector::InformationTechnology, 3.0),
            ])
            .unwrap();

        let scores = run_scoring(date(), &TrendConfig::default(), &store).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 20.67);

        let stored = store.trend_scores(date()).unwrap();
        assert_eq!(stored, scores);
        assert_eq!(stored[0].signal, MomentumSignal::Neutral);
    }

    #[test]
    fn rerun_overwrites_instead_of_duplicating() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_sector_performance(&[perf(Market::US, Sector::Energy, 5.0)])
            .unwrap();
        let first = run_scoring(date(), &TrendConfig::default(), &store).unwrap();
        let second = run_scoring(date(), &TrendConfig::default(), &store).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.trend_scores(date()).unwrap().len(), 1);
        assert_eq!(first[0].score, 40.0);
        assert_eq!(first[0].signal, MomentumSignal::Up);
    }

    #[test]
    fn benchmark_weekly_feeds_momentum() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_sector_performance(&[perf(Market::US, Sector::Energy, 0.0)])
            .unwrap();
        store
            .upsert_benchmarks(&[BenchmarkRecord {
                date: date(),
                ticker: "XLE".into(),
                label: "US_ENERGY".into(),
                region: "US".into(),
                sector: Some(Sector::Energy),
                close_price: 90.0,
                daily_return: Some(0.0),
                weekly_return: Some(10.0),
            }])
            .unwrap();

        let scores = run_scoring(date(), &TrendConfig::default(), &store).unwrap();
        // return 0, breadth neutral, momentum +100 → 30
        assert_eq!(scores[0].score, 30.0);
        assert_eq!(scores[0].signal, MomentumSignal::Neutral);
    }
}
