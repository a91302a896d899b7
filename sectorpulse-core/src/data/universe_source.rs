//! Source adapter for markets collected ticker by ticker from a universe.
//!
//! Prices, returns and volumes come from a chart feed (Yahoo); market cap
//! comes from a profile feed (Finnhub) when one is configured. A single
//! ticker failing is skipped; a fatal vendor error (breaker tripped, key
//! rejected) or every ticker failing aborts the market.

use super::finnhub::{CompanyProfile, FinnhubClient};
use super::provider::{SourceAdapter, SourceError};
use super::universe::MarketUniverse;
use super::yahoo::{ChartSeries, YahooChartClient};
use crate::domain::{InstrumentRecord, Market};
use crate::taxonomy::Taxonomy;
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Calendar days fetched before the target date: enough for the 20-session
/// volume baseline plus a week of holidays.
pub const LOOKBACK_DAYS: u64 = 40;

/// Anything that can return daily bars for a symbol.
pub trait ChartFeed: Send + Sync {
    fn daily_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<ChartSeries, SourceError>;
}

impl ChartFeed for YahooChartClient {
    fn daily_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<ChartSeries, SourceError> {
        self.fetch_bars(symbol, start, end)
    }
}

/// Anything that can return a company profile for a symbol.
pub trait ProfileFeed: Send + Sync {
    fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, SourceError>;
}

impl ProfileFeed for FinnhubClient {
    fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, SourceError> {
        self.profile(symbol)
    }
}

pub struct UniverseSource {
    universe: MarketUniverse,
    taxonomy: Taxonomy,
    charts: Arc<dyn ChartFeed>,
    profiles: Option<Arc<dyn ProfileFeed>>,
}

impl UniverseSource {
    pub fn new(universe: MarketUniverse, charts: Arc<dyn ChartFeed>) -> Self {
        let taxonomy = Taxonomy::default_for(universe.market);
        Self {
            universe,
            taxonomy,
            charts,
            profiles: None,
        }
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileFeed>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    fn build_record(
        &self,
        ticker: &str,
        vendor_sector: &str,
        date: NaiveDate,
    ) -> Result<Option<InstrumentRecord>, SourceError> {
        let start = date.checked_sub_days(Days::new(LOOKBACK_DAYS)).unwrap_or(date);
        let series = self.charts.daily_bars(ticker, start, date)?;
        let Some(stats) = series.session_stats(date) else {
            return Ok(None);
        };
        if stats.date != date {
            debug!(ticker, session = %stats.date, "no session on target date, using latest");
        }

        let mut sector = self.taxonomy.map(vendor_sector);
        let mut market_cap = None;
        let mut profile_name = None;

        if let Some(profiles) = &self.profiles {
            match profiles.company_profile(ticker) {
                Ok(profile) => {
                    market_cap = profile.market_cap;
                    profile_name = profile.name;
                    if sector.is_other() {
                        if let Some(industry) = profile.industry.as_deref() {
                            sector = Taxonomy::Gics.map(industry);
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!(ticker, error = %e, "profile unavailable"),
            }
        }

        let name = match self.universe.names.get(ticker) {
            Some(name) => name.clone(),
            None => series
                .name
                .or(profile_name)
                .unwrap_or_else(|| ticker.to_string()),
        };

        Ok(Some(InstrumentRecord {
            ticker: ticker.to_string(),
            name,
            sector,
            market_cap,
            close_price: stats.close,
            daily_return: stats.daily_return,
            volume: stats.volume,
            avg_volume_20d: stats.avg_volume_20d,
        }))
    }
}

impl SourceAdapter for UniverseSource {
    fn name(&self) -> &str {
        "universe"
    }

    fn market(&self) -> Market {
        self.universe.market
    }

    fn fetch(&self, date: NaiveDate) -> Result<Vec<InstrumentRecord>, SourceError> {
        let market = self.universe.market;
        let total = self.universe.ticker_count();
        let mut records = Vec::with_capacity(total);
        let mut failed = 0usize;
        let mut last_error = None;

        for (ticker, vendor_sector) in self.universe.entries() {
            match self.build_record(ticker, vendor_sector, date) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(%market, ticker, "no sessions on or before date"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(%market, ticker, error = %e, "skipping ticker");
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if total > 0 && failed == total {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        if failed > 0 {
            warn!(%market, failed, total, "some tickers could not be fetched");
        }
        info!(%market, instruments = records.len(), "universe fetch complete");
        Ok(records)
    }
}
