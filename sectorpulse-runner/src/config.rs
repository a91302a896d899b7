//! Application configuration.
//!
//! One [`AppConfig`] is built at process start (TOML file or defaults, then
//! environment overrides for secrets) and passed by reference to every
//! stage. Market-keyed tables use market codes (`US`, `KR`, ...).
//!
//! ```toml
//! finnhub_api_key = "..."
//!
//! [database]
//! path = "data/sectorpulse.db"
//!
//! [filter]
//! volume_bottom_percentile = 20.0
//! abnormal_return_threshold = 50.0
//!
//! [filter.min_market_cap]
//! US = 500000000.0
//! KR = 100000000000.0
//!
//! [trend.weights]
//! daily_return = 0.4
//! breadth = 0.3
//! momentum = 0.3
//!
//! [sources.KR]
//! kind = "csv"
//! csv_dir = "data/snapshots"
//!
//! [notify.telegram]
//! bot_token = "..."
//! chat_id = "..."
//! ```

use crate::benchmark::{default_benchmarks, BenchmarkTicker};
use sectorpulse_core::domain::Market;
use sectorpulse_core::taxonomy::Taxonomy;
use sectorpulse_core::{FilterPolicy, TrendConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_FINNHUB_API_KEY: &str = "FINNHUB_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Enables Finnhub market caps for universe-driven markets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finnhub_api_key: Option<String>,
    pub database: DatabaseConfig,
    pub filter: FilterConfig,
    pub trend: TrendConfig,
    /// Source per market code. Markets without an entry use
    /// [`SourceConfig::default_for`].
    pub sources: BTreeMap<String, SourceConfig>,
    pub notify: NotifyConfig,
    pub benchmarks: Vec<BenchmarkTicker>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            database: DatabaseConfig::default(),
            filter: FilterConfig::default(),
            trend: TrendConfig::default(),
            sources: Market::ALL
                .iter()
                .map(|&m| (m.code().to_string(), SourceConfig::default_for(m)))
                .collect(),
            notify: NotifyConfig::default(),
            benchmarks: default_benchmarks(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/sectorpulse.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub volume_bottom_percentile: f64,
    pub abnormal_return_threshold: f64,
    /// Market-cap floor per market code, in local currency.
    pub min_market_cap: BTreeMap<String, f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            volume_bottom_percentile: FilterPolicy::DEFAULT_VOLUME_BOTTOM_PERCENTILE,
            abnormal_return_threshold: FilterPolicy::DEFAULT_ABNORMAL_RETURN_THRESHOLD,
            min_market_cap: Market::ALL
                .iter()
                .map(|m| (m.code().to_string(), m.default_min_market_cap()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Ticker universe priced through Yahoo (and Finnhub when keyed).
    Universe,
    /// Daily vendor CSV exports.
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Universe TOML. The built-in universe is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universe: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Taxonomy>,
}

impl SourceConfig {
    /// Markets with a built-in universe collect through Yahoo; the rest
    /// read CSV snapshots from `data/snapshots`.
    pub fn default_for(market: Market) -> Self {
        let kind = match market {
            Market::US | Market::JP | Market::DE | Market::IN => SourceKind::Universe,
            Market::KR | Market::CN | Market::VN => SourceKind::Csv,
        };
        Self {
            kind,
            universe: None,
            csv_dir: (kind == SourceKind::Csv).then(|| PathBuf::from("data/snapshots")),
            taxonomy: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    pub fn is_complete(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

impl AppConfig {
    /// Load from `path` (defaults when `None`), apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.filter.min_market_cap = canonical_keys("filter.min_market_cap", config.filter.min_market_cap)?;
        config.sources = canonical_keys("sources", config.sources)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply secret overrides. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_FINNHUB_API_KEY) {
            self.finnhub_api_key = Some(key);
        }

        let token = get(ENV_TELEGRAM_BOT_TOKEN);
        let chat = get(ENV_TELEGRAM_CHAT_ID);
        if token.is_some() || chat.is_some() {
            let telegram = self.notify.telegram.get_or_insert_with(TelegramConfig::default);
            if let Some(token) = token {
                telegram.bot_token = token;
            }
            if let Some(chat) = chat {
                telegram.chat_id = chat;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.filter;
        if !(0.0..=100.0).contains(&f.volume_bottom_percentile) {
            return Err(ConfigError::Invalid(format!(
                "filter.volume_bottom_percentile must be within [0, 100], got {}",
                f.volume_bottom_percentile
            )));
        }
        if !f.abnormal_return_threshold.is_finite() || f.abnormal_return_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "filter.abnormal_return_threshold must be non-negative, got {}",
                f.abnormal_return_threshold
            )));
        }
        for (code, cap) in &f.min_market_cap {
            check_market_key("filter.min_market_cap", code)?;
            if !cap.is_finite() || *cap < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "filter.min_market_cap.{code} must be non-negative, got {cap}"
                )));
            }
        }

        let t = &self.trend;
        let w = &t.weights;
        if ![w.daily_return, w.breadth, w.momentum].iter().all(|x| x.is_finite()) {
            return Err(ConfigError::Invalid("trend.weights must be finite".into()));
        }
        if !(t.return_scale.is_finite() && t.return_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "trend.return_scale must be positive, got {}",
                t.return_scale
            )));
        }
        if !(t.weekly_scale.is_finite() && t.weekly_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "trend.weekly_scale must be positive, got {}",
                t.weekly_scale
            )));
        }

        for (code, source) in &self.sources {
            check_market_key("sources", code)?;
            if source.kind == SourceKind::Csv && source.csv_dir.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "sources.{code}: kind = \"csv\" requires csv_dir"
                )));
            }
        }
        Ok(())
    }

    /// Filter thresholds for one market. A market missing from the cap
    /// table falls back to its built-in floor.
    pub fn filter_policy(&self, market: Market) -> FilterPolicy {
        FilterPolicy {
            min_market_cap: self
                .filter
                .min_market_cap
                .get(market.code())
                .copied()
                .unwrap_or_else(|| market.default_min_market_cap()),
            volume_bottom_percentile: self.filter.volume_bottom_percentile,
            abnormal_return_threshold: self.filter.abnormal_return_threshold,
        }
    }

    pub fn source(&self, market: Market) -> SourceConfig {
        self.sources
            .get(market.code())
            .cloned()
            .unwrap_or_else(|| SourceConfig::default_for(market))
    }

    /// Telegram settings, only when both token and chat id are present.
    pub fn telegram(&self) -> Option<&TelegramConfig> {
        self.notify.telegram.as_ref().filter(|t| t.is_complete())
    }
}

/// Rewrite market-code keys (`us`, ` Kr `) to their canonical form.
/// Unknown codes are kept for `validate` to report.
fn canonical_keys<V>(table: &str, map: BTreeMap<String, V>) -> Result<BTreeMap<String, V>, ConfigError> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        let canonical = match key.parse::<Market>() {
            Ok(market) => market.code().to_string(),
            Err(_) => key,
        };
        if out.contains_key(&canonical) {
            return Err(ConfigError::Invalid(format!("{table}: duplicate entry for {canonical}")));
        }
        out.insert(canonical, value);
    }
    Ok(out)
}

/// Lookups use `Market::code`, so keys must be exact codes.
fn check_market_key(table: &str, code: &str) -> Result<(), ConfigError> {
    let market = code
        .parse::<Market>()
        .map_err(|e| ConfigError::Invalid(format!("{table}: {e}")))?;
    if market.code() != code {
        return Err(ConfigError::Invalid(format!(
            "{table}: key '{code}' must be written as '{}'",
            market.code()
        )));
    }
    Ok(())
}
