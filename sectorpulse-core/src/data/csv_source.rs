//! CSV snapshot source for markets fed by vendor exports.
//!
//! Reads `<dir>/<MARKET>/<YYYY-MM-DD>.csv` with the header
//! `ticker,name,sector,market_cap,close_price,daily_return,volume,avg_volume_20d`.
//! Empty cells are nulls. The vendor `sector` column goes through the
//! market's taxonomy; rows without a ticker or close price are rejected.

use super::provider::{SourceAdapter, SourceError};
use crate::domain::{InstrumentRecord, Market};
use crate::taxonomy::Taxonomy;
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    ticker: Option<String>,
    name: Option<String>,
    sector: Option<String>,
    market_cap: Option<f64>,
    close_price: Option<f64>,
    daily_return: Option<f64>,
    volume: Option<f64>,
    avg_volume_20d: Option<f64>,
}

pub struct CsvSnapshotSource {
    market: Market,
    dir: PathBuf,
    taxonomy: Taxonomy,
}

impl CsvSnapshotSource {
    pub fn new(market: Market, dir: impl Into<PathBuf>) -> Self {
        Self {
            market,
            dir: dir.into(),
            taxonomy: Taxonomy::default_for(market),
        }
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(self.market.code())
            .join(format!("{}.csv", date.format("%Y-%m-%d")))
    }

    /// Parse snapshot rows from any reader.
    pub fn parse<R: Read>(&self, reader: R) -> Result<Vec<InstrumentRecord>, SourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (i, row) in rdr.deserialize::<SnapshotRow>().enumerate() {
            // Line 1 is the header.
            let line = i + 2;
            let row = row.map_err(|e| SourceError::InvalidRow {
                line: e.position().map_or(line, |p| p.line() as usize),
                reason: e.to_string(),
            })?;

            let ticker = row.ticker.filter(|t| !t.is_empty()).ok_or_else(|| SourceError::InvalidRow {
                line,
                reason: "missing ticker".into(),
            })?;
            let close_price = row.close_price.ok_or_else(|| SourceError::InvalidRow {
                line,
                reason: format!("missing close price for {ticker}"),
            })?;
            if !close_price.is_finite() {
                return Err(SourceError::InvalidRow {
                    line,
                    reason: format!("non-finite close price for {ticker}"),
                });
            }

            let sector = self.taxonomy.map(row.sector.as_deref().unwrap_or(""));
            let name = row.name.filter(|n| !n.is_empty()).unwrap_or_else(|| ticker.clone());

            records.push(InstrumentRecord {
                ticker,
                name,
                sector,
                market_cap: finite(row.market_cap),
                close_price,
                daily_return: finite(row.daily_return),
                volume: finite(row.volume),
                avg_volume_20d: finite(row.avg_volume_20d),
            });
        }
        Ok(records)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<InstrumentRecord>, SourceError> {
        let file = std::fs::File::open(path)?;
        self.parse(file)
    }
}

/// `NaN` and infinities in optional columns are treated as empty cells.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl SourceAdapter for CsvSnapshotSource {
    fn name(&self) -> &str {
        "csv_snapshot"
    }

    fn market(&self) -> Market {
        self.market
    }

    fn fetch(&self, date: NaiveDate) -> Result<Vec<InstrumentRecord>, SourceError> {
        let path = self.snapshot_path(date);
        if !path.exists() {
            debug!(market = %self.market, path = %path.display(), "no snapshot for date");
            return Ok(Vec::new());
        }
        let records = self.read_file(&path)?;
        info!(market = %self.market, instruments = records.len(), "snapshot loaded");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sector;

    const HEADER: &str = "ticker,name,sector,market_cap,close_price,daily_return,volume,avg_volume_20d\n";

    fn source() -> CsvSnapshotSource {
        CsvSnapshotSource::new(Market::KR, "/unused")
    }

    #[test]
    fn parses_rows_and_maps_vendor_sector() {
        let body = format!(
            "{HEADER}005930,삼성전자,전기전자,4.2e14,71000,1.25,15000000,12000000\n\
             000660,SK하이닉스,반도체,,180000,,,\n"
        );
        let records = source().parse(body.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sector, Sector::InformationTechnology);
        assert_eq!(records[0].market_cap, Some(4.2e14));
        assert_eq!(records[0].daily_return, Some(1.25));
        assert_eq!(records[1].market_cap, None);
        assert_eq!(records[1].daily_return, None);
        assert_eq!(records[1].volume, None);
    }

    #[test]
    fn unknown_sector_becomes_other() {
        let body = format!("{HEADER}X,Thing,우주,,10,0.5,1,1\n");
        let records = source().parse(body.as_bytes()).unwrap();
        assert_eq!(records[0].sector, Sector::Other);
    }

    #[test]
    fn missing_name_falls_back_to_ticker() {
        let body = format!("{HEADER}X,,금융,,10,,,\n");
        assert_eq!(source().parse(body.as_bytes()).unwrap()[0].name, "X");
    }

    #[test]
    fn rejects_missing_ticker_or_close() {
        let no_ticker = format!("{HEADER},Name,금융,,10,,,\n");
        assert!(matches!(
            source().parse(no_ticker.as_bytes()),
            Err(SourceError::InvalidRow { line: 2, .. })
        ));

        let no_close = format!("{HEADER}A,Name,금융,,10,,,\nB,Name,금융,,,,,\n");
        assert!(matches!(
            source().parse(no_close.as_bytes()),
            Err(SourceError::InvalidRow { line: 3, .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_values() {
        let body = format!("{HEADER}A,Name,금융,big,10,,,\n");
        assert!(matches!(
            source().parse(body.as_bytes()),
            Err(SourceError::InvalidRow { .. })
        ));
    }

    #[test]
    fn non_finite_optional_cells_become_null() {
        let body = format!("{HEADER}B,B,금융,inf,10,NaN,-inf,NaN\n");
        let r = &source().parse(body.as_bytes()).unwrap()[0];
        assert_eq!(r.market_cap, None);
        assert_eq!(r.daily_return, None);
        assert_eq!(r.volume, None);
        assert_eq!(r.avg_volume_20d, None);
    }

    #[test]
    fn rejects_non_finite_close() {
        let body = format!("{HEADER}A,Name,금융,1e12,10,1.0,1,1\nB,Name,금융,1e12,NaN,1.0,1,1\n");
        assert!(matches!(
            source().parse(body.as_bytes()),
            Err(SourceError::InvalidRow { line: 3, .. })
        ));
    }

    #[test]
    fn snapshot_path_layout() {
        let s = CsvSnapshotSource::new(Market::VN, "/data/snapshots");
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(
            s.snapshot_path(date),
            PathBuf::from("/data/snapshots/VN/2025-03-14.csv")
        );
    }
}
