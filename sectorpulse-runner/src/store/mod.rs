//! SQLite persistence for instruments, sector aggregates, trend scores,
//! benchmarks and the collection audit log.
//!
//! Every derived table is keyed and written with upsert-on-conflict, so a
//! rerun for the same key overwrites instead of duplicating. Dates are stored
//! as `YYYY-MM-DD`, timestamps as RFC 3339, enums by their storage labels.

mod migrations;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sectorpulse_core::domain::{
    BenchmarkRecord, CollectionLogEntry, CollectionStatus, FilterFlags, InstrumentRecord, Market,
    MomentumSignal, Mover, ScreenedInstrument, Sector, SectorPerformance, TrendScore,
};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid {column} value '{value}' in database")]
    InvalidValue { column: &'static str, value: String },
}

/// An instrument row as persisted, with the filter decision it was stored with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredInstrument {
    pub date: NaiveDate,
    pub market: Market,
    pub record: InstrumentRecord,
    pub flags: FilterFlags,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "database opened");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Run `f` inside one transaction; it commits only if `f` returns `Ok`.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&Store) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let tx = self.conn.unchecked_transaction().map_err(StoreError::from)?;
        let out = f(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub fn upsert_instruments(
        &self,
        date: NaiveDate,
        market: Market,
        instruments: &[ScreenedInstrument],
    ) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO stock_daily (
                date, ticker, name, country, sector, market_cap, close_price,
                daily_return, volume, avg_volume_20d, is_filtered, is_abnormal
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(date, ticker) DO UPDATE SET
                name = excluded.name,
                country = excluded.country,
                sector = excluded.sector,
                market_cap = excluded.market_cap,
                close_price = excluded.close_price,
                daily_return = excluded.daily_return,
                volume = excluded.volume,
                avg_volume_20d = excluded.avg_volume_20d,
                is_filtered = excluded.is_filtered,
                is_abnormal = excluded.is_abnormal",
        )?;

        let date = date_label(date);
        for s in instruments {
            let r = &s.record;
            stmt.execute(params![
                date,
                r.ticker,
                r.name,
                market.code(),
                r.sector.as_str(),
                r.market_cap,
                r.close_price,
                r.daily_return,
                r.volume,
                r.avg_volume_20d,
                s.flags.is_filtered,
                s.flags.is_abnormal,
            ])?;
        }
        Ok(instruments.len())
    }

    /// A NULL weekly return never overwrites one that is already stored.
    pub fn upsert_sector_performance(&self, rows: &[SectorPerformance]) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO sector_performance (
                date, country, sector, daily_return, weekly_return, breadth,
                volume_change, stock_count, top_gainers, top_losers, collected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(date, country, sector) DO UPDATE SET
                daily_return = excluded.daily_return,
                weekly_return = COALESCE(excluded.weekly_return, sector_performance.weekly_return),
                breadth = excluded.breadth,
                volume_change = excluded.volume_change,
                stock_count = excluded.stock_count,
                top_gainers = excluded.top_gainers,
                top_losers = excluded.top_losers,
                collected_at = excluded.collected_at",
        )?;

        for row in rows {
            stmt.execute(params![
                date_label(row.date),
                row.market.code(),
                row.sector.as_str(),
                row.daily_return,
                row.weekly_return,
                row.breadth,
                row.volume_change,
                row.stock_count as i64,
                serde_json::to_string(&row.top_gainers)?,
                serde_json::to_string(&row.top_losers)?,
                row.collected_at.to_rfc3339(),
            ])?;
        }
        Ok(rows.len())
    }

    pub fn upsert_trend_scores(&self, scores: &[TrendScore]) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO trend_scores (
                date, sector, trend_score, countries_positive, countries_negative,
                global_avg_return, global_breadth, momentum_signal
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(date, sector) DO UPDATE SET
                trend_score = excluded.trend_score,
                countries_positive = excluded.countries_positive,
                countries_negative = excluded.countries_negative,
                global_avg_return = excluded.global_avg_return,
                global_breadth = excluded.global_breadth,
                momentum_signal = excluded.momentum_signal",
        )?;

        for s in scores {
            stmt.execute(params![
                date_label(s.date),
                s.sector.as_str(),
                s.score,
                s.countries_positive as i64,
                s.countries_negative as i64,
                s.global_avg_return,
                s.global_breadth,
                s.signal.as_str(),
            ])?;
        }
        Ok(scores.len())
    }

    pub fn upsert_benchmarks(&self, records: &[BenchmarkRecord]) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO benchmark_daily (
                date, ticker, name, country, sector, close_price, daily_return, weekly_return
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(date, ticker) DO UPDATE SET
                name = excluded.name,
                country = excluded.country,
                sector = excluded.sector,
                close_price = excluded.close_price,
                daily_return = excluded.daily_return,
                weekly_return = excluded.weekly_return",
        )?;

        for b in records {
            stmt.execute(params![
                date_label(b.date),
                b.ticker,
                b.label,
                b.region,
                b.sector.map(|s| s.as_str()),
                b.close_price,
                b.daily_return,
                b.weekly_return,
            ])?;
        }
        Ok(records.len())
    }

    pub fn log_collection(&self, entry: &CollectionLogEntry) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO collection_log (
                timestamp, market, status, total_stocks, filtered_stocks,
                abnormal_stocks, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.timestamp.to_rfc3339(),
                entry.market,
                entry.status.as_str(),
                entry.total as i64,
                entry.filtered as i64,
                entry.abnormal as i64,
                entry.error,
            ],
        )?;
        Ok(())
    }

    /// Copy benchmark weekly returns onto the sector rows of the same
    /// date, country and sector. Returns the number of rows updated.
    pub fn apply_benchmark_weekly(&self, date: NaiveDate) -> Result<usize, StoreError> {
        let updated = self.conn.execute(
            "UPDATE sector_performance SET weekly_return = (
                SELECT b.weekly_return FROM benchmark_daily b
                WHERE b.date = sector_performance.date
                  AND b.country = sector_performance.country
                  AND b.sector = sector_performance.sector
                  AND b.weekly_return IS NOT NULL
                ORDER BY b.ticker LIMIT 1
            )
            WHERE date = ?1 AND EXISTS (
                SELECT 1 FROM benchmark_daily b
                WHERE b.date = sector_performance.date
                  AND b.country = sector_performance.country
                  AND b.sector = sector_performance.sector
                  AND b.weekly_return IS NOT NULL
            )",
            params![date_label(date)],
        )?;
        if updated > 0 {
            info!(%date, rows = updated, "weekly returns taken from benchmarks");
        }
        Ok(updated)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn latest_sector_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(date) FROM sector_performance", [], |row| row.get(0))?;
        latest.map(|d| parse_date(&d)).transpose()
    }

    /// Sector rows for `date` (latest stored date when `None`), optionally
    /// for one market, ordered by country then return descending.
    pub fn sector_performance(
        &self,
        date: Option<NaiveDate>,
        market: Option<Market>,
    ) -> Result<Vec<SectorPerformance>, StoreError> {
        let date = match date {
            Some(d) => d,
            None => match self.latest_sector_date()? {
                Some(d) => d,
                None => return Ok(Vec::new()),
            },
        };

        let mut stmt = self.conn.prepare_cached(
            "SELECT date, country, sector, daily_return, weekly_return, breadth,
                    volume_change, stock_count, top_gainers, top_losers, collected_at
             FROM sector_performance
             WHERE date = ?1 AND (?2 IS NULL OR country = ?2)
             ORDER BY country, daily_return DESC",
        )?;
        let raw = stmt
            .query_map(params![date_label(date), market.map(|m| m.code())], RawSectorRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawSectorRow::into_domain).collect()
    }

    /// One sector across every country on `date`, return descending.
    pub fn sector_detail(&self, date: NaiveDate, sector: Sector) -> Result<Vec<SectorPerformance>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date, country, sector, daily_return, weekly_return, breadth,
                    volume_change, stock_count, top_gainers, top_losers, collected_at
             FROM sector_performance
             WHERE date = ?1 AND sector = ?2
             ORDER BY daily_return DESC",
        )?;
        let raw = stmt
            .query_map(params![date_label(date), sector.as_str()], RawSectorRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawSectorRow::into_domain).collect()
    }

    /// Abnormal movers for `date`, or for the latest date that has any.
    /// Ordered by absolute return, largest first.
    pub fn abnormal_instruments(&self, date: Option<NaiveDate>) -> Result<Vec<StoredInstrument>, StoreError> {
        let date = match date {
            Some(d) => date_label(d),
            None => {
                let latest: Option<String> = self.conn.query_row(
                    "SELECT MAX(date) FROM stock_daily WHERE is_abnormal = 1",
                    [],
                    |row| row.get(0),
                )?;
                match latest {
                    Some(d) => d,
                    None => return Ok(Vec::new()),
                }
            }
        };

        let mut stmt = self.conn.prepare_cached(
            "SELECT date, country, ticker, name, sector, market_cap, close_price,
                    daily_return, volume, avg_volume_20d, is_filtered, is_abnormal
             FROM stock_daily
             WHERE date = ?1 AND is_abnormal = 1
             ORDER BY ABS(daily_return) DESC",
        )?;
        let raw = stmt
            .query_map(params![date], RawInstrumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawInstrumentRow::into_domain).collect()
    }

    /// Every stored instrument of one market on one date, by ticker.
    pub fn instruments(&self, date: NaiveDate, market: Market) -> Result<Vec<StoredInstrument>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date, country, ticker, name, sector, market_cap, close_price,
                    daily_return, volume, avg_volume_20d, is_filtered, is_abnormal
             FROM stock_daily
             WHERE date = ?1 AND country = ?2
             ORDER BY ticker",
        )?;
        let raw = stmt
            .query_map(params![date_label(date), market.code()], RawInstrumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawInstrumentRow::into_domain).collect()
    }

    pub fn trend_scores(&self, date: NaiveDate) -> Result<Vec<TrendScore>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date, sector, trend_score, countries_positive, countries_negative,
                    global_avg_return, global_breadth, momentum_signal
             FROM trend_scores
             WHERE date = ?1
             ORDER BY trend_score DESC",
        )?;
        let raw = stmt
            .query_map(params![date_label(date)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(date, sector, score, pos, neg, avg, breadth, signal)| {
                Ok(TrendScore {
                    date: parse_date(&date)?,
                    sector: parse_label("sector", &sector)?,
                    score,
                    countries_positive: to_count("countries_positive", pos)?,
                    countries_negative: to_count("countries_negative", neg)?,
                    global_avg_return: avg,
                    global_breadth: breadth,
                    signal: parse_label::<MomentumSignal>("momentum_signal", &signal)?,
                })
            })
            .collect()
    }

    pub fn benchmarks(&self, date: NaiveDate) -> Result<Vec<BenchmarkRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date, ticker, name, country, sector, close_price, daily_return, weekly_return
             FROM benchmark_daily
             WHERE date = ?1
             ORDER BY ticker",
        )?;
        let raw = stmt
            .query_map(params![date_label(date)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, Option<f64>>(6)?,
                    row.get::<_, Option<f64>>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(date, ticker, label, region, sector, close, daily, weekly)| {
                Ok(BenchmarkRecord {
                    date: parse_date(&date)?,
                    ticker,
                    label,
                    region,
                    sector: sector.map(|s| parse_label("sector", &s)).transpose()?,
                    close_price: close,
                    daily_return: daily,
                    weekly_return: weekly,
                })
            })
            .collect()
    }

    /// Most recent collection attempts first.
    pub fn collection_log(&self, limit: usize) -> Result<Vec<CollectionLogEntry>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, market, status, total_stocks, filtered_stocks,
                    abnormal_stocks, error_message
             FROM collection_log
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let raw = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(ts, market, status, total, filtered, abnormal, error)| {
                let status = match status.as_str() {
                    "success" => CollectionStatus::Success,
                    "failed" => CollectionStatus::Failed,
                    _ => return Err(StoreError::InvalidValue { column: "status", value: status }),
                };
                Ok(CollectionLogEntry {
                    timestamp: parse_timestamp(&ts)?,
                    market,
                    status,
                    total: to_count("total_stocks", total)?,
                    filtered: to_count("filtered_stocks", filtered)?,
                    abnormal: to_count("abnormal_stocks", abnormal)?,
                    error,
                })
            })
            .collect()
    }

    /// Whether any trend scores exist for `date`.
    pub fn has_trend_scores(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM trend_scores WHERE date = ?1 LIMIT 1",
                params![date_label(date)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

// ── Row conversion ───────────────────────────────────────────────────

struct RawSectorRow {
    date: String,
    country: String,
    sector: String,
    daily_return: Option<f64>,
    weekly_return: Option<f64>,
    breadth: f64,
    volume_change: f64,
    stock_count: i64,
    top_gainers: String,
    top_losers: String,
    collected_at: String,
}

impl RawSectorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            country: row.get(1)?,
            sector: row.get(2)?,
            daily_return: row.get(3)?,
            weekly_return: row.get(4)?,
            breadth: row.get(5)?,
            volume_change: row.get(6)?,
            stock_count: row.get(7)?,
            top_gainers: row.get(8)?,
            top_losers: row.get(9)?,
            collected_at: row.get(10)?,
        })
    }

    fn into_domain(self) -> Result<SectorPerformance, StoreError> {
        Ok(SectorPerformance {
            date: parse_date(&self.date)?,
            market: parse_label("country", &self.country)?,
            sector: parse_label("sector", &self.sector)?,
            daily_return: self.daily_return,
            weekly_return: self.weekly_return,
            breadth: self.breadth,
            volume_change: self.volume_change,
            stock_count: to_count("stock_count", self.stock_count)?,
            top_gainers: serde_json::from_str::<Vec<Mover>>(&self.top_gainers)?,
            top_losers: serde_json::from_str::<Vec<Mover>>(&self.top_losers)?,
            collected_at: parse_timestamp(&self.collected_at)?,
        })
    }
}

struct RawInstrumentRow {
    date: String,
    country: String,
    ticker: String,
    name: String,
    sector: String,
    market_cap: Option<f64>,
    close_price: f64,
    daily_return: Option<f64>,
    volume: Option<f64>,
    avg_volume_20d: Option<f64>,
    is_filtered: bool,
    is_abnormal: bool,
}

impl RawInstrumentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            country: row.get(1)?,
            ticker: row.get(2)?,
            name: row.get(3)?,
            sector: row.get(4)?,
            market_cap: row.get(5)?,
            close_price: row.get(6)?,
            daily_return: row.get(7)?,
            volume: row.get(8)?,
            avg_volume_20d: row.get(9)?,
            is_filtered: row.get(10)?,
            is_abnormal: row.get(11)?,
        })
    }

    fn into_domain(self) -> Result<StoredInstrument, StoreError> {
        Ok(StoredInstrument {
            date: parse_date(&self.date)?,
            market: parse_label("country", &self.country)?,
            record: InstrumentRecord {
                ticker: self.ticker,
                name: self.name,
                sector: parse_label("sector", &self.sector)?,
                market_cap: self.market_cap,
                close_price: self.close_price,
                daily_return: self.daily_return,
                volume: self.volume,
                avg_volume_20d: self.avg_volume_20d,
            },
            flags: FilterFlags {
                is_filtered: self.is_filtered,
                is_abnormal: self.is_abnormal,
            },
        })
    }
}

fn date_label(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| StoreError::InvalidValue {
        column: "date",
        value: value.to_string(),
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidValue {
            column: "timestamp",
            value: value.to_string(),
        })
}

fn parse_label<T: FromStr>(column: &'static str, value: &str) -> Result<T, StoreError> {
    value.parse().map_err(|_| StoreError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

fn to_count(column: &'static str, value: i64) -> Result<usize, StoreError> {
    usize::try_from(value).map_err(|_| StoreError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn screened(ticker: &str, ret: Option<f64>, flags: FilterFlags) -> ScreenedInstrument {
        ScreenedInstrument {
            record: InstrumentRecord {
                market_cap: Some(1e10),
                daily_return: ret,
                volume: Some(1000.0),
                avg_volume_20d: Some(900.0),
                ..InstrumentRecord::new(ticker, format!("{ticker} Inc"), Sector::Energy, 50.0)
            },
            flags,
        }
    }

    fn perf(market: Market, sector: Sector, ret: f64) -> SectorPerformance {
        SectorPerformance {
            date: date(),
            market,
            sector,
            daily_return: Some(ret),
            weekly_return: None,
            breadth: 0.5,
            volume_change: 12.5,
            stock_count: 4,
            top_gainers: vec![Mover { name: "Alpha".into(), daily_return: 3.1 }],
            top_losers: vec![Mover { name: "Omega".into(), daily_return: -2.4 }],
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn instrument_upsert_overwrites_same_key() {
        let store = Store::open_in_memory().unwrap();
        let flags = FilterFlags::default();
        store
            .upsert_instruments(date(), Market::US, &[screened("XOM", Some(1.0), flags)])
            .unwrap();
        store
            .upsert_instruments(date(), Market::US, &[screened("XOM", Some(2.0), flags)])
            .unwrap();

        let rows = store.instruments(date(), Market::US).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.daily_return, Some(2.0));
        assert_eq!(rows[0].record.sector, Sector::Energy);
    }

    #[test]
    fn sector_rows_round_trip_with_movers() {
        let store = Store::open_in_memory().unwrap();
        let row = perf(Market::KR, Sector::Financials, 1.25);
        store.upsert_sector_performance(&[row.clone()]).unwrap();

        let back = store.sector_performance(Some(date()), Some(Market::KR)).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].top_gainers, row.top_gainers);
        assert_eq!(back[0].top_losers, row.top_losers);
        assert_eq!(back[0].stock_count, 4);
        assert_eq!(back[0].market, Market::KR);
    }

    #[test]
    fn movers_are_stored_with_return_key() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_sector_performance(&[perf(Market::US, Sector::Energy, 1.0)])
            .unwrap();
        let json: String = store
            .conn
            .query_row("SELECT top_gainers FROM sector_performance", [], |r| r.get(0))
            .unwrap();
        assert_eq!(json, r#"[{"name":"Alpha","return":3.1}]"#);
    }

    #[test]
    fn latest_date_is_used_when_none_given() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.sector_performance(None, None).unwrap().is_empty());

        let mut older = perf(Market::US, Sector::Energy, 1.0);
        older.date = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
        store
            .upsert_sector_performance(&[older, perf(Market::US, Sector::Energy, 2.0)])
            .unwrap();

        assert_eq!(store.latest_sector_date().unwrap(), Some(date()));
        let rows = store.sector_performance(None, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].daily_return, Some(2.0));
    }

    #[test]
    fn sector_rows_ordered_by_country_then_return() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_sector_performance(&[
                perf(Market::US, Sector::Energy, 0.5),
                perf(Market::US, Sector::Financials, 1.5),
                perf(Market::KR, Sector::Energy, -1.0),
            ])
            .unwrap();
        let rows = store.sector_performance(Some(date()), None).unwrap();
        let order: Vec<_> = rows.iter().map(|r| (r.market, r.sector)).collect();
        assert_eq!(
            order,
            vec![
                (Market::KR, Sector::Energy),
                (Market::US, Sector::Financials),
                (Market::US, Sector::Energy),
            ]
        );
    }

    #[test]
    fn rerun_keeps_externally_populated_weekly_return() {
        let store = Store::open_in_memory().unwrap();
        let mut with_weekly = perf(Market::US, Sector::Energy, 1.0);
        with_weekly.weekly_return = Some(3.5);
        store.upsert_sector_performance(&[with_weekly]).unwrap();
        store
            .upsert_sector_performance(&[perf(Market::US, Sector::Energy, 2.0)])
            .unwrap();

        let rows = store.sector_detail(date(), Sector::Energy).unwrap();
        assert_eq!(rows[0].daily_return, Some(2.0));
        assert_eq!(rows[0].weekly_return, Some(3.5));
    }

    #[test]
    fn benchmark_weekly_fills_matching_sector_rows() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_sector_performance(&[
                perf(Market::US, Sector::Energy, 1.0),
                perf(Market::US, Sector::Financials, 1.0),
            ])
            .unwrap();
        store
            .upsert_benchmarks(&[
                BenchmarkRecord {
                    date: date(),
                    ticker: "XLE".into(),
                    label: "US_ENERGY".into(),
                    region: "US".into(),
                    sector: Some(Sector::Energy),
                    close_price: 90.0,
                    daily_return: Some(0.4),
                    weekly_return: Some(-2.25),
                },
                BenchmarkRecord {
                    date: date(),
                    ticker: "^KS11".into(),
                    label: "KR_KOSPI".into(),
                    region: "KR".into(),
                    sector: None,
                    close_price: 2600.0,
                    daily_return: Some(0.1),
                    weekly_return: Some(1.0),
                },
            ])
            .unwrap();

        assert_eq!(store.apply_benchmark_weekly(date()).unwrap(), 1);
        let rows = store.sector_performance(Some(date()), Some(Market::US)).unwrap();
        let energy = rows.iter().find(|r| r.sector == Sector::Energy).unwrap();
        let fin = rows.iter().find(|r| r.sector == Sector::Financials).unwrap();
        assert_eq!(energy.weekly_return, Some(-2.25));
        assert_eq!(fin.weekly_return, None);

        let benches = store.benchmarks(date()).unwrap();
        assert_eq!(benches.len(), 2);
        assert_eq!(benches[0].ticker, "XLE");
        assert_eq!(benches[1].sector, None);
    }

    #[test]
    fn abnormal_query_defaults_to_latest_abnormal_date() {
        let store = Store::open_in_memory().unwrap();
        let abnormal = FilterFlags { is_filtered: false, is_abnormal: true };
        let both = FilterFlags { is_filtered: true, is_abnormal: true };
        store
            .upsert_instruments(
                date(),
                Market::US,
                &[
                    screened("UP", Some(60.0), abnormal),
                    screened("DOWN", Some(-80.0), both),
                    screened("FLAT", Some(0.1), FilterFlags::default()),
                ],
            )
            .unwrap();

        let rows = store.abnormal_instruments(None).unwrap();
        let tickers: Vec<_> = rows.iter().map(|r| r.record.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["DOWN", "UP"]);
        assert!(rows[0].flags.is_filtered);

        let other_day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(store.abnormal_instruments(Some(other_day)).unwrap().is_empty());
    }

    #[test]
    fn trend_scores_ordered_by_score() {
        let store = Store::open_in_memory().unwrap();
        let score = |sector, score| TrendScore {
            date: date(),
            sector,
            score,
            countries_positive: 2,
            countries_negative: 1,
            global_avg_return: 0.5,
            global_breadth: 0.6667,
            signal: MomentumSignal::from_score(score),
        };
        store
            .upsert_trend_scores(&[score(Sector::Energy, -12.0), score(Sector::Utilities, 44.0)])
            .unwrap();
        store.upsert_trend_scores(&[score(Sector::Energy, 70.0)]).unwrap();

        let rows = store.trend_scores(date()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sector, Sector::Energy);
        assert_eq!(rows[0].signal, MomentumSignal::StrongUp);
        assert!(store.has_trend_scores(date()).unwrap());
    }

    #[test]
    fn collection_log_newest_first() {
        let store = Store::open_in_memory().unwrap();
        store.log_collection(&CollectionLogEntry::success("US", 10, 2, 1)).unwrap();
        store.log_collection(&CollectionLogEntry::failed("KR", "no data")).unwrap();

        let log = store.collection_log(10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].market, "KR");
        assert_eq!(log[0].status, CollectionStatus::Failed);
        assert_eq!(log[0].error.as_deref(), Some("no data"));
        assert_eq!(log[1].total, 10);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<(), StoreError> = store.transaction(|s| {
            s.upsert_sector_performance(&[perf(Market::US, Sector::Energy, 1.0)])?;
            Err(StoreError::InvalidValue { column: "test", value: "abort".into() })
        });
        assert!(result.is_err());
        assert!(store.sector_performance(Some(date()), None).unwrap().is_empty());
    }

    #[test]
    fn open_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/pulse.db");
        let store = Store::open(&path).unwrap();
        store.log_collection(&CollectionLogEntry::success("US", 1, 0, 0)).unwrap();
        assert!(path.exists());
    }
}
