//! Per-market collection: fetch → screen → store instruments → aggregate →
//! store sector rows → audit log.
//!
//! Markets are independent. A failing market is logged (both to tracing and
//! to the collection log) and the run moves on to the next one.

use crate::benchmark::{collect_benchmarks, BenchmarkSummary, BENCHMARK_LOG_LABEL};
use crate::config::AppConfig;
use crate::sources::SourceFactory;
use crate::store::{Store, StoreError};
use chrono::{NaiveDate, Utc};
use sectorpulse_core::data::{SourceAdapter, SourceError};
use sectorpulse_core::domain::{CollectTarget, CollectionLogEntry, Market, MarketSelection};
use sectorpulse_core::{aggregate_sectors, screen, FilterPolicy, FilterSummary};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{market}: {source}")]
    Source {
        market: Market,
        #[source]
        source: SourceError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Counts from one successful market collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSummary {
    pub market: Market,
    pub date: NaiveDate,
    pub filter: FilterSummary,
    /// Sector rows written (never includes Other).
    pub sectors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    Collected(CollectionSummary),
    /// The source had nothing for the date.
    Empty,
}

/// Collect one market for one date.
///
/// Instruments, sector rows and the success log entry commit together.
/// Source failures and empty results are recorded as `failed` entries.
pub fn collect_market(
    adapter: &dyn SourceAdapter,
    date: NaiveDate,
    policy: &FilterPolicy,
    store: &Store,
) -> Result<CollectOutcome, CollectError> {
    let market = adapter.market();
    info!(%market, source = adapter.name(), %date, "collecting");

    let records = match adapter.fetch(date) {
        Ok(records) => records,
        Err(source) => {
            error!(%market, error = %source, "source failed");
            store.log_collection(&CollectionLogEntry::failed(market.code(), source.to_string()))?;
            return Err(CollectError::Source { market, source });
        }
    };

    if records.is_empty() {
        warn!(%market, %date, "no data");
        store.log_collection(&CollectionLogEntry::failed(market.code(), "no data"))?;
        return Ok(CollectOutcome::Empty);
    }

    let screened = screen(&records, policy);
    let filter = FilterSummary::from_screened(&screened);
    let rows = aggregate_sectors(date, market, &screened, Utc::now());

    store.transaction(|s| {
        s.upsert_instruments(date, market, &screened)?;
        s.upsert_sector_performance(&rows)?;
        s.log_collection(&CollectionLogEntry::success(
            market.code(),
            filter.total,
            filter.filtered,
            filter.abnormal,
        ))
    })?;

    info!(
        %market,
        total = filter.total,
        filtered = filter.filtered,
        abnormal = filter.abnormal,
        active = filter.active,
        sectors = rows.len(),
        "market collected"
    );

    Ok(CollectOutcome::Collected(CollectionSummary {
        market,
        date,
        filter,
        sectors: rows.len(),
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetResult {
    Collected(CollectionSummary),
    Empty,
    Benchmarks(BenchmarkSummary),
    Failed(String),
}

impl TargetResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Empty | Self::Failed(_))
    }
}

/// Outcome of a multi-market run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub results: Vec<(CollectTarget, TargetResult)>,
    /// Selector entries that named no known market.
    pub unknown: Vec<String>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_failure()).count()
    }
}

/// Collect every selected target in order, continuing past failures.
pub fn collect_markets(
    selection: &MarketSelection,
    date: NaiveDate,
    config: &AppConfig,
    factory: &dyn SourceFactory,
    store: &Store,
) -> Result<RunReport, StoreError> {
    for code in &selection.unknown {
        warn!(market = %code, "unknown market, skipped");
    }

    let mut report = RunReport {
        results: Vec::with_capacity(selection.targets.len()),
        unknown: selection.unknown.clone(),
    };

    for &target in &selection.targets {
        let result = match target {
            CollectTarget::Benchmark => {
                let feed = factory.benchmark_feed();
                match collect_benchmarks(date, &config.benchmarks, feed.as_ref(), store) {
                    Ok(summary) => TargetResult::Benchmarks(summary),
                    Err(e) => {
                        error!(error = %e, "benchmark collection failed");
                        log_failure(store, BENCHMARK_LOG_LABEL, &e.to_string())?;
                        TargetResult::Failed(e.to_string())
                    }
                }
            }
            CollectTarget::Market(market) => collect_one(market, date, config, factory, store)?,
        };
        report.results.push((target, result));
    }

    info!(
        %date,
        targets = report.results.len(),
        failures = report.failures(),
        "collection run finished"
    );
    Ok(report)
}

fn collect_one(
    market: Market,
    date: NaiveDate,
    config: &AppConfig,
    factory: &dyn SourceFactory,
    store: &Store,
) -> Result<TargetResult, StoreError> {
    let adapter = match factory.adapter(market) {
        Ok(adapter) => adapter,
        Err(e) => {
            error!(%market, error = %e, "source unavailable");
            log_failure(store, market.code(), &e.to_string())?;
            return Ok(TargetResult::Failed(e.to_string()));
        }
    };

    let policy = config.filter_policy(market);
    match collect_market(adapter.as_ref(), date, &policy, store) {
        Ok(CollectOutcome::Collected(summary)) => Ok(TargetResult::Collected(summary)),
        Ok(CollectOutcome::Empty) => Ok(TargetResult::Empty),
        Err(CollectError::Source { source, .. }) => Ok(TargetResult::Failed(source.to_string())),
        Err(CollectError::Store(e)) => {
            // Losing the store mid-run affects every remaining market.
            error!(%market, error = %e, "store write failed");
            Err(e)
        }
    }
}

fn log_failure(store: &Store, label: &str, message: &str) -> Result<(), StoreError> {
    store.log_collection(&CollectionLogEntry::failed(label, message))
}
