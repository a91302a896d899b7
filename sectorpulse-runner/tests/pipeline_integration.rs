//! Integration tests for a full daily run against an on-disk store.
//!
//! CSV snapshots for three markets are collected through the configured
//! adapters, scored, and rendered; reruns must leave the same rows behind.

use chrono::NaiveDate;
use sectorpulse_core::data::{ChartFeed, ChartSeries, SourceAdapter, SourceError};
use sectorpulse_core::domain::{Market, MarketSelection, MomentumSignal, Sector};
use sectorpulse_runner::{
    build_adapter, collect_markets, render_daily_report, run_scoring, AppConfig, SourceConfig,
    SourceFactory, SourceKind, Store, TargetResult, MESSAGE_LIMIT,
};
use std::path::Path;
use std::sync::Arc;

const HEADER: &str = "ticker,name,sector,market_cap,close_price,daily_return,volume,avg_volume_20d\n";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn write_snapshot(dir: &Path, market: Market, rows: &str) {
    let market_dir = dir.join(market.code());
    std::fs::create_dir_all(&market_dir).unwrap();
    std::fs::write(market_dir.join("2025-03-14.csv"), format!("{HEADER}{rows}")).unwrap();
}

struct NoCharts;

impl ChartFeed for NoCharts {
    fn daily_bars(&self, symbol: &str, _: NaiveDate, _: NaiveDate) -> Result<ChartSeries, SourceError> {
        Err(SourceError::SymbolNotFound { symbol: symbol.into() })
    }
}

struct CsvFactory {
    config: AppConfig,
}

impl SourceFactory for CsvFactory {
    fn adapter(&self, market: Market) -> Result<Box<dyn SourceAdapter>, SourceError> {
        build_adapter(market, &self.config.source(market), Arc::new(NoCharts), None)
    }

    fn benchmark_feed(&self) -> Arc<dyn ChartFeed> {
        Arc::new(NoCharts)
    }
}

fn setup(dir: &Path) -> (AppConfig, CsvFactory) {
    write_snapshot(
        dir,
        Market::US,
        "AAPL,Apple,Technology,3e12,210,2.0,5e7,4e7\n\
         XOM,Exxon Mobil,Energy,4e11,110,-0.5,2e7,1.8e7\n\
         SPAC,Blank Check,Shell Companies,9e9,10,0.1,9e6,9e6\n\
         MEME,Meme Corp,Technology,8e9,4,120.0,9e7,1e6\n",
    );
    write_snapshot(dir, Market::KR, "005930,삼성전자,전기전자,4e14,71000,-1.0,1.5e7,1.2e7\n");
    write_snapshot(dir, Market::CN, "600519,贵州茅台,电子,2e12,1700,3.0,3e6,2.5e6\n");

    let mut config = AppConfig::default();
    config.filter.volume_bottom_percentile = 0.0;
    for market in [Market::US, Market::KR, Market::CN] {
        config.sources.insert(
            market.code().to_string(),
            SourceConfig {
                kind: SourceKind::Csv,
                universe: None,
                csv_dir: Some(dir.to_path_buf()),
                taxonomy: None,
            },
        );
    }
    let factory = CsvFactory { config: config.clone() };
    (config, factory)
}

#[test]
fn collect_score_and_report() {
    let tmp = tempfile::tempdir().unwrap();
    let (config, factory) = setup(tmp.path());
    let store = Store::open(tmp.path().join("db/pulse.db")).unwrap();

    let selection = MarketSelection::parse("US,KR,CN,VN");
    let report = collect_markets(&selection, date(), &config, &factory, &store).unwrap();
    assert_eq!(report.results.len(), 4);
    // VN has no snapshot in the default dir.
    assert_eq!(report.failures(), 1);
    assert!(matches!(report.results[3].1, TargetResult::Empty | TargetResult::Failed(_)));

    let rows = store.sector_performance(Some(date()), None).unwrap();
    assert!(rows.iter().all(|r| !r.sector.is_other()));
    assert_eq!(rows.len(), 4);

    let abnormal = store.abnormal_instruments(None).unwrap();
    assert_eq!(abnormal.len(), 1);
    assert_eq!(abnormal[0].record.ticker, "MEME");

    let scores = run_scoring(date(), &config.trend, &store).unwrap();
    let tech = scores
        .iter()
        .find(|s| s.sector == Sector::InformationTechnology)
        .unwrap();
    assert_eq!(tech.score, 20.67);
    assert_eq!(tech.signal, MomentumSignal::Neutral);
    assert_eq!(tech.countries_positive, 2);
    assert_eq!(tech.countries_negative, 1);

    let blocks = render_daily_report(&store, None).unwrap();
    assert!(blocks[0].contains("2025-03-14"));
    assert!(blocks[0].contains("Information Technology"));
    assert!(blocks.iter().any(|b| b.contains("🇺🇸 United States")));
    assert!(blocks.iter().any(|b| b.contains("⚠️") && b.contains("Meme Corp")));
    assert!(blocks.iter().all(|b| b.chars().count() <= MESSAGE_LIMIT));

    // US block lists stronger sectors first.
    let us = blocks.iter().find(|b| b.contains("United States")).unwrap();
    let it = us.find("Information Technology").unwrap();
    let energy = us.find("Energy").unwrap();
    assert!(it < energy);
}

#[test]
fn reruns_are_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let (config, factory) = setup(tmp.path());
    let store = Store::open(tmp.path().join("pulse.db")).unwrap();
    let selection = MarketSelection::parse("US,KR,CN");

    collect_markets(&selection, date(), &config, &factory, &store).unwrap();
    let first_rows = store.sector_performance(Some(date()), None).unwrap();
    let first_scores = run_scoring(date(), &config.trend, &store).unwrap();

    collect_markets(&selection, date(), &config, &factory, &store).unwrap();
    let second_rows = store.sector_performance(Some(date()), None).unwrap();
    let second_scores = run_scoring(date(), &config.trend, &store).unwrap();

    assert_eq!(first_rows.len(), second_rows.len());
    for (a, b) in first_rows.iter().zip(&second_rows) {
        assert_eq!((a.market, a.sector, a.daily_return), (b.market, b.sector, b.daily_return));
        assert_eq!(a.top_gainers, b.top_gainers);
    }
    assert_eq!(first_scores, second_scores);
    assert_eq!(store.trend_scores(date()).unwrap().len(), first_scores.len());
    assert_eq!(store.instruments(date(), Market::US).unwrap().len(), 4);
    // Only the audit log grows.
    assert_eq!(store.collection_log(100).unwrap().len(), 6);
}

#[test]
fn report_on_empty_store_shows_placeholders() {
    let store = Store::open_in_memory().unwrap();
    let blocks = render_daily_report(&store, Some(date())).unwrap();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].contains("(no trend score data)"));
    assert!(blocks[1].contains("no sector data"));
}
