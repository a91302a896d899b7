//! Builds the source adapter for each market from configuration.

use crate::config::{AppConfig, SourceConfig, SourceKind};
use sectorpulse_core::data::{
    ChartFeed, CircuitBreaker, CsvSnapshotSource, FinnhubClient, MarketUniverse, ProfileFeed,
    SourceAdapter, SourceError, UniverseSource, YahooChartClient,
};
use sectorpulse_core::domain::Market;
use std::sync::Arc;
use tracing::debug;

/// Hands out adapters per market and the chart feed used for benchmarks.
pub trait SourceFactory {
    fn adapter(&self, market: Market) -> Result<Box<dyn SourceAdapter>, SourceError>;

    fn benchmark_feed(&self) -> Arc<dyn ChartFeed>;
}

/// Factory backed by live vendor clients. Yahoo and Finnhub each get their
/// own circuit breaker, shared by every market that uses the vendor.
pub struct ConfiguredSources {
    sources: Vec<(Market, SourceConfig)>,
    charts: Arc<YahooChartClient>,
    profiles: Option<Arc<FinnhubClient>>,
}

impl ConfiguredSources {
    pub fn new(config: &AppConfig) -> Result<Self, SourceError> {
        let charts = Arc::new(YahooChartClient::new(Arc::new(CircuitBreaker::default_provider()))?);
        let profiles = match config.finnhub_api_key.as_deref() {
            Some(key) => Some(Arc::new(FinnhubClient::new(
                key,
                Arc::new(CircuitBreaker::default_provider()),
            )?)),
            None => None,
        };

        Ok(Self {
            sources: Market::ALL.iter().map(|&m| (m, config.source(m))).collect(),
            charts,
            profiles,
        })
    }

    fn source_config(&self, market: Market) -> SourceConfig {
        self.sources
            .iter()
            .find(|(m, _)| *m == market)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| SourceConfig::default_for(market))
    }
}

impl SourceFactory for ConfiguredSources {
    fn adapter(&self, market: Market) -> Result<Box<dyn SourceAdapter>, SourceError> {
        let source = self.source_config(market);
        let charts: Arc<dyn ChartFeed> = self.charts.clone();
        let profiles = self.profiles.clone().map(|p| p as Arc<dyn ProfileFeed>);
        build_adapter(market, &source, charts, profiles)
    }

    fn benchmark_feed(&self) -> Arc<dyn ChartFeed> {
        self.charts.clone()
    }
}

/// Build one market's adapter from its source entry.
pub fn build_adapter(
    market: Market,
    source: &SourceConfig,
    charts: Arc<dyn ChartFeed>,
    profiles: Option<Arc<dyn ProfileFeed>>,
) -> Result<Box<dyn SourceAdapter>, SourceError> {
    match source.kind {
        SourceKind::Csv => {
            let dir = source.csv_dir.clone().ok_or_else(|| {
                SourceError::Other(format!("{market}: csv source without csv_dir"))
            })?;
            let mut adapter = CsvSnapshotSource::new(market, dir);
            if let Some(taxonomy) = source.taxonomy {
                adapter = adapter.with_taxonomy(taxonomy);
            }
            Ok(Box::new(adapter))
        }
        SourceKind::Universe => {
            let universe = match &source.universe {
                Some(path) => MarketUniverse::from_file(path)
                    .map_err(|e| SourceError::Other(format!("{market}: {e}")))?,
                None => MarketUniverse::builtin(market).ok_or_else(|| {
                    SourceError::Other(format!("{market}: no built-in universe, set sources.{market}.universe"))
                })?,
            };
            if universe.market != market {
                return Err(SourceError::Other(format!(
                    "universe file is for {}, configured under {market}",
                    universe.market
                )));
            }
            debug!(%market, tickers = universe.ticker_count(), "universe loaded");

            let mut adapter = UniverseSource::new(universe, charts);
            if let Some(profiles) = profiles {
                adapter = adapter.with_profiles(profiles);
            }
            if let Some(taxonomy) = source.taxonomy {
                adapter = adapter.with_taxonomy(taxonomy);
            }
            Ok(Box::new(adapter))
        }
    }
}
