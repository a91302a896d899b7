//! End-to-end scenarios: CSV snapshot → screen → aggregate → score.

use chrono::{NaiveDate, Utc};
use sectorpulse_core::data::{CsvSnapshotSource, SourceAdapter};
use sectorpulse_core::domain::{Market, MomentumSignal, Sector, SectorPerformance};
use sectorpulse_core::{aggregate_sectors, score_sectors, screen, FilterPolicy, FilterSummary, TrendConfig};
use std::path::Path;

const HEADER: &str = "ticker,name,sector,market_cap,close_price,daily_return,volume,avg_volume_20d\n";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn write_snapshot(dir: &Path, market: Market, rows: &str) {
    let market_dir = dir.join(market.code());
    std::fs::create_dir_all(&market_dir).unwrap();
    std::fs::write(market_dir.join("2025-03-14.csv"), format!("{HEADER}{rows}")).unwrap();
}

fn collect(dir: &Path, market: Market) -> Vec<SectorPerformance> {
    let source = CsvSnapshotSource::new(market, dir);
    let records = source.fetch(date()).unwrap();
    let policy = FilterPolicy::with_min_market_cap(market.default_min_market_cap());
    let screened = screen(&records, &policy);
    aggregate_sectors(date(), market, &screened, Utc::now())
}

#[test]
fn missing_snapshot_is_empty_not_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let source = CsvSnapshotSource::new(Market::VN, tmp.path());
    assert!(source.fetch(date()).unwrap().is_empty());
}

#[test]
fn three_country_technology_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    write_snapshot(
        tmp.path(),
        Market::US,
        "AAPL,Apple,Technology,3e12,210,2.0,5e7,4e7\n",
    );
    write_snapshot(
        tmp.path(),
        Market::KR,
        "005930,삼성전자,전기전자,4e14,71000,-1.0,1.5e7,1.2e7\n",
    );
    write_snapshot(
        tmp.path(),
        Market::CN,
        "600519,贵州茅台,电子,2e12,1700,3.0,3e6,2.5e6\n",
    );

    let mut rows = Vec::new();
    for market in [Market::US, Market::KR, Market::CN] {
        rows.extend(collect(tmp.path(), market));
    }
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.sector == Sector::InformationTechnology));

    let scores = score_sectors(date(), &rows, &TrendConfig::default());
    assert_eq!(scores.len(), 1);
    let tech = &scores[0];
    assert_eq!(tech.global_avg_return, 1.3333);
    assert_eq!(tech.global_breadth, 0.6667);
    assert_eq!(tech.score, 20.67);
    assert_eq!(tech.signal, MomentumSignal::Neutral);
}

#[test]
fn screening_summary_and_other_sector() {
    let tmp = tempfile::tempdir().unwrap();
    write_snapshot(
        tmp.path(),
        Market::US,
        "BIG1,Big One,Energy,9e9,50,1.0,1000,900\n\
         BIG2,Big Two,Energy,9e9,50,-0.5,3000,1800\n\
         BIG3,Big Three,Energy,9e9,50,0.5,3000,2900\n\
         BIG4,Big Four,Energy,9e9,50,1.5,4000,3500\n\
         BIG5,Big Five,Energy,9e9,50,2.0,5000,4000\n\
         SMALL,Small Cap,Energy,1e6,5,4.0,9000,100\n\
         JUMP,Jumper,Energy,9e9,5,75.0,6000,1000\n\
         SPAC,Blank Check,Shell Companies,9e9,10,0.1,9000,9000\n",
    );

    let records = CsvSnapshotSource::new(Market::US, tmp.path()).fetch(date()).unwrap();
    let screened = screen(&records, &FilterPolicy::with_min_market_cap(5e8));
    let summary = FilterSummary::from_screened(&screened);
    assert_eq!(summary.total, 8);
    // SMALL by cap, BIG1 by the survivor volume floor.
    assert_eq!(summary.filtered, 2);
    assert_eq!(summary.abnormal, 1);
    assert_eq!(summary.active, 5);

    let rows = aggregate_sectors(date(), Market::US, &screened, Utc::now());
    assert_eq!(rows.len(), 1, "Other never produces a row");
    let energy = &rows[0];
    assert_eq!(energy.sector, Sector::Energy);
    assert_eq!(energy.stock_count, 4);
    assert_eq!(energy.daily_return, Some(0.875));
    assert_eq!(energy.breadth, 0.75);
}

#[test]
fn nan_return_cell_never_reaches_sector_row() {
    let tmp = tempfile::tempdir().unwrap();
    write_snapshot(
        tmp.path(),
        Market::US,
        "A,Alpha,Energy,1e10,10,1.0,100,100\n\
         B,Beta,Energy,1e10,10,NaN,100,100\n",
    );

    let rows = collect(tmp.path(), Market::US);
    assert_eq!(rows.len(), 1);
    let energy = &rows[0];
    let ret = energy.daily_return.unwrap();
    assert!(ret.is_finite());
    assert_eq!(ret, 1.0);
    assert!(energy.breadth.is_finite());
}
