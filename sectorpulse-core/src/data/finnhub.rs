//! Finnhub company-profile client.
//!
//! `/stock/profile2` supplies market capitalization and industry for the
//! universe markets where the chart API has neither. Finnhub reports market
//! cap in millions of the listing currency; [`CompanyProfile::market_cap`]
//! is already scaled to currency units. The free tier allows 60 calls a
//! minute, so calls go through a [`RateLimiter`] set a little below that.

use super::circuit_breaker::CircuitBreaker;
use super::provider::SourceError;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Calls allowed per window.
pub const CALLS_PER_MINUTE: u32 = 55;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile2 {
    name: Option<String>,
    market_capitalization: Option<f64>,
    finnhub_industry: Option<String>,
}

/// Profile fields the pipeline uses.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyProfile {
    pub name: Option<String>,
    /// Currency units (not millions).
    pub market_cap: Option<f64>,
    /// Vendor industry string, mapped later through the market taxonomy.
    pub industry: Option<String>,
}

/// Fixed-window call limiter. Blocks the caller until the window resets.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<(Instant, u32)>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            state: Mutex::new((Instant::now(), 0)),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Take one call slot; returns how long the caller slept.
    pub fn acquire(&self) -> Duration {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let (started, count) = *state;
        let elapsed = started.elapsed();

        if elapsed >= self.window {
            *state = (Instant::now(), 1);
            return Duration::ZERO;
        }
        if count < self.limit {
            state.1 += 1;
            return Duration::ZERO;
        }

        let wait = self.window - elapsed;
        debug!(?wait, "rate limit reached, sleeping");
        std::thread::sleep(wait);
        *state = (Instant::now(), 1);
        wait
    }
}

pub struct FinnhubClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl FinnhubClient {
    pub fn new(api_key: impl Into<String>, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, SourceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::AuthenticationRequired(
                "Finnhub API key is empty".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Other(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            limiter: RateLimiter::per_minute(CALLS_PER_MINUTE),
            circuit_breaker,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Fetch one company profile. No retries; a miss just leaves the
    /// instrument without a market cap.
    pub fn profile(&self, symbol: &str) -> Result<CompanyProfile, SourceError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(SourceError::CircuitBreakerTripped);
        }
        self.limiter.acquire();

        let url = format!("{}/stock/profile2", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .map_err(|e| SourceError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(SourceError::AuthenticationRequired(format!(
                "Finnhub rejected the API key (HTTP {status})"
            )));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            return Err(SourceError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::Other(format!("HTTP {status} for {symbol}")));
        }

        let body = resp
            .text()
            .map_err(|e| SourceError::NetworkUnreachable(e.to_string()))?;
        let profile = parse_profile(symbol, &body)?;
        self.circuit_breaker.record_success();
        Ok(profile)
    }
}

/// Parse a profile2 body. Finnhub answers unknown symbols with `{}`.
pub fn parse_profile(symbol: &str, body: &str) -> Result<CompanyProfile, SourceError> {
    let raw: Profile2 = serde_json::from_str(body).map_err(|e| {
        SourceError::ResponseFormatChanged(format!("failed to parse profile for {symbol}: {e}"))
    })?;

    if raw.name.is_none() && raw.market_capitalization.is_none() && raw.finnhub_industry.is_none() {
        return Err(SourceError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }

    Ok(CompanyProfile {
        name: raw.name.filter(|n| !n.is_empty()),
        market_cap: raw.market_capitalization.map(|m| m * 1_000_000.0),
        industry: raw.finnhub_industry.filter(|i| !i.is_empty()),
    })
}
