//! Yahoo Finance chart client.
//!
//! Fetches daily bars from Yahoo's v8 chart API with retries, exponential
//! backoff and the shared circuit breaker. Used for instrument prices and
//! for sector ETF / index benchmarks.
//!
//! Yahoo has no official API and changes its response shape without notice;
//! the CSV snapshot source is the fallback when it is unavailable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::SourceError;
use crate::stats::mean;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Sessions averaged for the 20-day volume baseline.
pub const VOLUME_WINDOW: usize = 20;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// One trading session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Bars for one symbol, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub symbol: String,
    pub name: Option<String>,
    pub bars: Vec<DailyBar>,
}

/// Values derived from the sessions up to a target date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    pub date: NaiveDate,
    pub close: f64,
    pub daily_return: Option<f64>,
    pub volume: Option<f64>,
    /// Mean volume of up to [`VOLUME_WINDOW`] sessions before `date`.
    pub avg_volume_20d: Option<f64>,
}

impl ChartSeries {
    fn up_to(&self, date: NaiveDate) -> &[DailyBar] {
        let end = self.bars.partition_point(|b| b.date <= date);
        &self.bars[..end]
    }

    /// Percent change of the last close on or before `date` against the
    /// close `sessions` bars earlier.
    pub fn return_over(&self, sessions: usize, date: NaiveDate) -> Option<f64> {
        let bars = self.up_to(date);
        let last = bars.last()?;
        let base = bars.len().checked_sub(sessions + 1).map(|i| bars[i])?;
        (base.close != 0.0).then(|| (last.close / base.close - 1.0) * 100.0)
    }

    /// Statistics for the last session on or before `date`.
    pub fn session_stats(&self, date: NaiveDate) -> Option<SessionStats> {
        let bars = self.up_to(date);
        let (last, history) = bars.split_last()?;
        let window = &history[history.len().saturating_sub(VOLUME_WINDOW)..];
        let volumes: Vec<f64> = window.iter().filter_map(|b| b.volume).collect();

        Some(SessionStats {
            date: last.date,
            close: last.close,
            daily_return: self.return_over(1, date),
            volume: last.volume,
            avg_volume_20d: mean(&volumes),
        })
    }
}

/// Yahoo Finance v8 chart client.
pub struct YahooChartClient {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooChartClient {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| SourceError::Other(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive, so ask for the whole end day.
        let end_ts = end
            .checked_add_days(Days::new(1))
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url
        )
    }

    /// Daily bars from `start` to `end` inclusive.
    pub fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChartSeries, SourceError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(SourceError::CircuitBreakerTripped);
        }

        let url = self.chart_url(symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying chart request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(SourceError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(SourceError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(SourceError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(SourceError::AuthenticationRequired(
                            "Yahoo Finance requires authentication".into(),
                        ));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(SourceError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(SourceError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let body = resp
                        .text()
                        .map_err(|e| SourceError::NetworkUnreachable(e.to_string()))?;
                    let series = parse_chart(symbol, &body)?;
                    self.circuit_breaker.record_success();
                    return Ok(series);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(SourceError::NetworkUnreachable(e.to_string()));
                }
                Err(e) => return Err(SourceError::NetworkUnreachable(e.to_string())),
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::Other("max retries exceeded".into())))
    }
}

/// Parse a chart API body. Sessions without a close are dropped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<ChartSeries, SourceError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
    })?;

    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(SourceError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
        (None, Some(err)) => {
            return Err(SourceError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(SourceError::ResponseFormatChanged(
                "empty result with no error".into(),
            ))
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("result array is empty".into()))?;

    let name = data
        .meta
        .and_then(|m| m.long_name.or(m.short_name));

    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("no quote data".into()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| SourceError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        // Holidays and halted sessions come back as nulls.
        let Some(close) = quote.close.get(i).copied().flatten().filter(|c| c.is_finite()) else {
            continue;
        };
        bars.push(DailyBar {
            date,
            close,
            volume: quote.volume.get(i).copied().flatten().filter(|v| v.is_finite()),
        });
    }

    if bars.is_empty() {
        return Err(SourceError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }

    Ok(ChartSeries {
        symbol: symbol.to_string(),
        name,
        bars,
    })
}
