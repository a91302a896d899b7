//! Sector ETF and index benchmarks.
//!
//! Benchmarks are stored apart from instruments. Their 5-session return is
//! the weekly figure the trend scorer uses for momentum: before scoring,
//! each sector row picks up the weekly return of the benchmark with the
//! same date, country and sector.

use crate::store::{Store, StoreError};
use chrono::{Days, NaiveDate};
use sectorpulse_core::data::ChartFeed;
use sectorpulse_core::domain::{BenchmarkRecord, CollectionLogEntry, Sector};
use sectorpulse_core::stats::round_to;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Calendar days fetched before the target date; covers 5 sessions plus
/// a holiday week.
pub const BENCHMARK_LOOKBACK_DAYS: u64 = 14;

/// Sessions back for the weekly return.
pub const WEEKLY_SESSIONS: usize = 5;

/// Label used for benchmark runs in the collection log.
pub const BENCHMARK_LOG_LABEL: &str = "BENCHMARK";

/// One benchmark to collect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTicker {
    pub label: String,
    pub ticker: String,
    /// Market code, or `GLOBAL` for world sector funds.
    pub region: String,
    /// `None` for composite indices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
}

const DEFAULT_BENCHMARKS: &[(&str, &str, &str, Option<Sector>)] = &[
    // US sector SPDRs
    ("US_IT", "XLK", "US", Some(Sector::InformationTechnology)),
    ("US_FIN", "XLF", "US", Some(Sector::Financials)),
    ("US_ENERGY", "XLE", "US", Some(Sector::Energy)),
    ("US_HEALTH", "XLV", "US", Some(Sector::HealthCare)),
    ("US_IND", "XLI", "US", Some(Sector::Industrials)),
    ("US_CD", "XLY", "US", Some(Sector::ConsumerDiscretionary)),
    ("US_CS", "XLP", "US", Some(Sector::ConsumerStaples)),
    ("US_MAT", "XLB", "US", Some(Sector::Materials)),
    ("US_RE", "XLRE", "US", Some(Sector::RealEstate)),
    ("US_COMM", "XLC", "US", Some(Sector::CommunicationServices)),
    ("US_UTIL", "XLU", "US", Some(Sector::Utilities)),
    // NSE sector indices
    ("IN_IT", "^CNXIT", "IN", Some(Sector::InformationTechnology)),
    ("IN_BANK", "^CNXBANK", "IN", Some(Sector::Financials)),
    ("IN_PHARMA", "^CNXPHARMA", "IN", Some(Sector::HealthCare)),
    ("IN_AUTO", "^CNXAUTO", "IN", Some(Sector::Industrials)),
    ("IN_METAL", "^CNXMETAL", "IN", Some(Sector::Materials)),
    ("IN_FMCG", "^CNXFMCG", "IN", Some(Sector::ConsumerStaples)),
    ("IN_ENERGY", "^CNXENERGY", "IN", Some(Sector::Energy)),
    // iShares global sector funds
    ("GL_IT", "IXN", "GLOBAL", Some(Sector::InformationTechnology)),
    ("GL_FIN", "IXG", "GLOBAL", Some(Sector::Financials)),
    ("GL_HEALTH", "IXJ", "GLOBAL", Some(Sector::HealthCare)),
    ("GL_ENERGY", "IXC", "GLOBAL", Some(Sector::Energy)),
    ("GL_IND", "EXI", "GLOBAL", Some(Sector::Industrials)),
    ("GL_MAT", "MXI", "GLOBAL", Some(Sector::Materials)),
    // Composite indices
    ("KR_KOSPI", "^KS11", "KR", None),
    ("CN_CSI300", "000300.SS", "CN", None),
    ("JP_N225", "^N225", "JP", None),
    ("VN_INDEX", "^VNINDEX", "VN", None),
    ("IN_NIFTY", "^NSEI", "IN", None),
    ("DE_DAX", "^GDAXI", "DE", None),
];

pub fn default_benchmarks() -> Vec<BenchmarkTicker> {
    DEFAULT_BENCHMARKS
        .iter()
        .map(|&(label, ticker, region, sector)| BenchmarkTicker {
            label: label.to_string(),
            ticker: ticker.to_string(),
            region: region.to_string(),
            sector,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkSummary {
    pub collected: usize,
    pub failed: Vec<String>,
}

/// Fetch bars for each benchmark, derive daily and weekly returns and
/// upsert them for `date`. Per-ticker failures are skipped; a fatal vendor
/// error stops the run and marks the remaining tickers failed.
pub fn collect_benchmarks(
    date: NaiveDate,
    tickers: &[BenchmarkTicker],
    charts: &dyn ChartFeed,
    store: &Store,
) -> Result<BenchmarkSummary, StoreError> {
    let start = date
        .checked_sub_days(Days::new(BENCHMARK_LOOKBACK_DAYS))
        .unwrap_or(date);
    let mut records = Vec::with_capacity(tickers.len());
    let mut summary = BenchmarkSummary::default();

    for (i, bench) in tickers.iter().enumerate() {
        let series = match charts.daily_bars(&bench.ticker, start, date) {
            Ok(series) => series,
            Err(e) if e.is_fatal() => {
                warn!(ticker = %bench.ticker, error = %e, "benchmark collection stopped");
                summary
                    .failed
                    .extend(tickers[i..].iter().map(|b| b.label.clone()));
                break;
            }
            Err(e) => {
                debug!(ticker = %bench.ticker, error = %e, "benchmark skipped");
                summary.failed.push(bench.label.clone());
                continue;
            }
        };

        let Some(stats) = series.session_stats(date) else {
            debug!(ticker = %bench.ticker, "no sessions for benchmark");
            summary.failed.push(bench.label.clone());
            continue;
        };

        records.push(BenchmarkRecord {
            date,
            ticker: bench.ticker.clone(),
            label: bench.label.clone(),
            region: bench.region.clone(),
            sector: bench.sector,
            close_price: stats.close,
            daily_return: stats.daily_return.map(|r| round_to(r, 4)),
            weekly_return: series.return_over(WEEKLY_SESSIONS, date).map(|r| round_to(r, 4)),
        });
    }

    summary.collected = records.len();
    store.transaction(|s| {
        s.upsert_benchmarks(&records)?;
        let entry = if records.is_empty() {
            CollectionLogEntry::failed(BENCHMARK_LOG_LABEL, "no benchmark data")
        } else {
            CollectionLogEntry::success(BENCHMARK_LOG_LABEL, records.len(), 0, 0)
        };
        s.log_collection(&entry)
    })?;

    info!(
        %date,
        collected = summary.collected,
        failed = summary.failed.len(),
        "benchmarks collected"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectorpulse_core::data::{ChartSeries, DailyBar, SourceError};
    use sectorpulse_core::domain::CollectionStatus;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    struct FakeCharts;

    impl ChartFeed for FakeCharts {
        fn daily_bars(&self, symbol: &str, _start: NaiveDate, _end: NaiveDate) -> Result<ChartSeries, SourceError> {
            if symbol == "MISSING" {
                return Err(SourceError::SymbolNotFound { symbol: symbol.into() });
            }
            let closes = [100.0, 101.0, 99.0, 102.0, 104.0, 105.0, 110.0];
            let days = [6, 7, 10, 11, 12, 13, 14];
            Ok(ChartSeries {
                symbol: symbol.into(),
                name: None,
                bars: days
                    .iter()
                    .zip(closes)
                    .map(|(&day, close)| DailyBar { date: d(day), close, volume: None })
                    .collect(),
            })
        }
    }

    fn ticker(label: &str, symbol: &str) -> BenchmarkTicker {
        BenchmarkTicker {
            label: label.into(),
            ticker: symbol.into(),
            region: "US".into(),
            sector: Some(Sector::Energy),
        }
    }

    #[test]
    fn default_list_covers_every_us_sector() {
        let list = default_benchmarks();
        for sector in Sector::ALL {
            assert!(
                list.iter().any(|b| b.region == "US" && b.sector == Some(sector)),
                "no US benchmark for {sector}"
            );
        }
        assert!(list.iter().any(|b| b.ticker == "^CNXAUTO" && b.sector == Some(Sector::Industrials)));
    }

    #[test]
    fn computes_daily_and_weekly_returns() {
        let store = Store::open_in_memory().unwrap();
        let summary = collect_benchmarks(
            d(14),
            &[ticker("US_ENERGY", "XLE"), ticker("BROKEN", "MISSING")],
            &FakeCharts,
            &store,
        )
        .unwrap();
        assert_eq!(summary.collected, 1);
        assert_eq!(summary.failed, vec!["BROKEN".to_string()]);

        let rows = store.benchmarks(d(14)).unwrap();
        assert_eq!(rows.len(), 1);
        let xle = &rows[0];
        assert_eq!(xle.close_price, 110.0);
        // 110 / 105 - 1
        assert_eq!(xle.daily_return, Some(4.7619));
        // 110 / 101 - 1, five sessions back
        assert_eq!(xle.weekly_return, Some(8.9109));

        let log = store.collection_log(1).unwrap();
        assert_eq!(log[0].market, BENCHMARK_LOG_LABEL);
        assert_eq!(log[0].status, CollectionStatus::Success);
    }

    #[test]
    fn nothing_collected_is_logged_as_failed() {
        let store = Store::open_in_memory().unwrap();
        let summary =
            collect_benchmarks(d(14), &[ticker("BROKEN", "MISSING")], &FakeCharts, &store).unwrap();
        assert_eq!(summary.collected, 0);
        let log = store.collection_log(1).unwrap();
        assert_eq!(log[0].status, CollectionStatus::Failed);
    }
}
