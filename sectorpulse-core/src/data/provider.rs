//! Source adapter trait and structured error types.
//!
//! One adapter per market turns a vendor's payload into [`InstrumentRecord`]s
//! for a date. The filter/aggregate pipeline lives outside the adapter and
//! only ever sees the normalized records.

use crate::domain::{InstrumentRecord, Market};
use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid row {line}: {reason}")]
    InvalidRow { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source error: {0}")]
    Other(String),
}

impl SourceError {
    /// Errors after which no further request to the same vendor makes sense.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CircuitBreakerTripped | Self::AuthenticationRequired(_)
        )
    }
}

/// A per-market data source.
///
/// Implementations map vendor sector strings into [`crate::domain::Sector`]
/// before returning; records with a missing ticker or close price are
/// rejected here rather than downstream.
pub trait SourceAdapter: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Market this source produces records for.
    fn market(&self) -> Market;

    /// Fetch every instrument for one trading date. An empty vector means the
    /// vendor had nothing for that date.
    fn fetch(&self, date: NaiveDate) -> Result<Vec<InstrumentRecord>, SourceError>;
}
