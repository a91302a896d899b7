//! Markets (countries) covered by the collector and the market selector
//! accepted on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An equity market, one per country.
///
/// Variant order is the fixed display order used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    US,
    KR,
    CN,
    JP,
    VN,
    IN,
    DE,
}

impl Market {
    /// All markets in report display order.
    pub const ALL: [Market; 7] = [
        Market::US,
        Market::KR,
        Market::CN,
        Market::JP,
        Market::VN,
        Market::IN,
        Market::DE,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::US => "US",
            Self::KR => "KR",
            Self::CN => "CN",
            Self::JP => "JP",
            Self::VN => "VN",
            Self::IN => "IN",
            Self::DE => "DE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::US => "United States",
            Self::KR => "South Korea",
            Self::CN => "China",
            Self::JP => "Japan",
            Self::VN => "Vietnam",
            Self::IN => "India",
            Self::DE => "Germany",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Self::US => "\u{1f1fa}\u{1f1f8}",
            Self::KR => "\u{1f1f0}\u{1f1f7}",
            Self::CN => "\u{1f1e8}\u{1f1f3}",
            Self::JP => "\u{1f1ef}\u{1f1f5}",
            Self::VN => "\u{1f1fb}\u{1f1f3}",
            Self::IN => "\u{1f1ee}\u{1f1f3}",
            Self::DE => "\u{1f1e9}\u{1f1ea}",
        }
    }

    pub fn currency(&self) -> &'static str {
        match self {
            Self::US => "USD",
            Self::KR => "KRW",
            Self::CN => "CNY",
            Self::JP => "JPY",
            Self::VN => "VND",
            Self::IN => "INR",
            Self::DE => "EUR",
        }
    }

    /// Minimum market cap in local currency units. Thresholds are absolute
    /// per market and are not converted between currencies.
    pub fn default_min_market_cap(&self) -> f64 {
        match self {
            Self::US => 500_000_000.0,
            Self::KR => 100_000_000_000.0,
            Self::CN => 5_000_000_000.0,
            Self::JP => 50_000_000_000.0,
            Self::VN => 5_000_000_000_000.0,
            Self::IN => 50_000_000_000.0,
            Self::DE => 500_000_000.0,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported market '{0}' (valid: US, KR, CN, JP, VN, IN, DE, BENCHMARK, ALL)")]
pub struct UnknownMarket(pub String);

impl FromStr for Market {
    type Err = UnknownMarket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Market::ALL
            .iter()
            .find(|m| m.code().eq_ignore_ascii_case(code))
            .copied()
            .ok_or_else(|| UnknownMarket(s.to_string()))
    }
}

/// One target of a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectTarget {
    Market(Market),
    /// Sector ETFs and composite indices, stored separately from instruments.
    Benchmark,
}

impl fmt::Display for CollectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market(m) => write!(f, "{m}"),
            Self::Benchmark => f.write_str("BENCHMARK"),
        }
    }
}

/// Parsed `--market` argument: `ALL`, a single code, or a comma list.
///
/// Unknown codes are kept aside rather than rejecting the whole selection,
/// so one typo does not stop the other markets from running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSelection {
    pub targets: Vec<CollectTarget>,
    pub unknown: Vec<String>,
}

impl MarketSelection {
    pub fn parse(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("ALL") {
            return Self {
                targets: Market::ALL.iter().copied().map(CollectTarget::Market).collect(),
                unknown: Vec::new(),
            };
        }

        let mut targets = Vec::new();
        let mut unknown = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let target = if part.eq_ignore_ascii_case("BENCHMARK") {
                Some(CollectTarget::Benchmark)
            } else {
                part.parse::<Market>().ok().map(CollectTarget::Market)
            };
            match target {
                Some(t) if !targets.contains(&t) => targets.push(t),
                Some(_) => {}
                None => unknown.push(part.to_uppercase()),
            }
        }
        Self { targets, unknown }
    }
}
