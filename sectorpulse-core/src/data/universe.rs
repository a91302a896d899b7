//! Market universe — vendor-sector-organized ticker lists for one market.
//!
//! Stored as TOML. Sector keys are vendor strings (mapped through the
//! market taxonomy when records are built), so a universe file can be
//! pasted straight from a vendor screener export.
//!
//! ```toml
//! market = "US"
//!
//! [sectors]
//! Technology = ["AAPL", "MSFT"]
//! Energy = ["XOM"]
//!
//! [names]
//! AAPL = "Apple"
//! ```

use crate::domain::Market;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUniverse {
    pub market: Market,
    /// Vendor sector name → tickers.
    pub sectors: BTreeMap<String, Vec<String>>,
    /// Optional display names by ticker.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub names: BTreeMap<String, String>,
}

impl MarketUniverse {
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// `(ticker, vendor sector)` pairs in file order within each sector.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sectors.iter().flat_map(|(sector, tickers)| {
            tickers.iter().map(move |t| (t.as_str(), sector.as_str()))
        })
    }

    pub fn display_name<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.names.get(ticker).map(String::as_str).unwrap_or(ticker)
    }

    pub fn ticker_count(&self) -> usize {
        self.sectors.values().map(Vec::len).sum()
    }

    /// Starter universe for markets served by the chart API. Markets with
    /// their own vendor feeds (KR, CN, VN) have none.
    pub fn builtin(market: Market) -> Option<Self> {
        let table = match market {
            Market::US => BUILTIN_US,
            Market::JP => BUILTIN_JP,
            Market::DE => BUILTIN_DE,
            Market::IN => BUILTIN_IN,
            Market::KR | Market::CN | Market::VN => return None,
        };

        let sectors = table
            .iter()
            .map(|(sector, tickers)| {
                (
                    sector.to_string(),
                    tickers.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();

        Some(Self {
            market,
            sectors,
            names: BTreeMap::new(),
        })
    }
}

const BUILTIN_US: &[(&str, &[&str])] = &[
    ("Technology", &["AAPL", "MSFT", "NVDA", "AVGO", "ORCL", "CRM", "ADBE", "AMD"]),
    ("Financial Services", &["JPM", "BAC", "WFC", "GS", "MS", "V", "MA", "AXP"]),
    ("Healthcare", &["LLY", "UNH", "JNJ", "ABBV", "MRK", "PFE", "TMO", "ABT"]),
    ("Consumer Cyclical", &["AMZN", "TSLA", "HD", "MCD", "NKE", "SBUX", "LOW"]),
    ("Consumer Defensive", &["WMT", "PG", "KO", "PEP", "COST", "PM"]),
    ("Industrials", &["GE", "CAT", "HON", "UNP", "RTX", "BA", "DE"]),
    ("Energy", &["XOM", "CVX", "COP", "SLB", "EOG", "MPC", "PSX"]),
    ("Basic Materials", &["LIN", "SHW", "APD", "FCX", "NEM", "DOW"]),
    ("Utilities", &["NEE", "SO", "DUK", "AEP", "D", "EXC"]),
    ("Real Estate", &["PLD", "AMT", "EQIX", "SPG", "O", "PSA"]),
    ("Communication Services", &["GOOGL", "META", "NFLX", "DIS", "T", "VZ", "TMUS"]),
];

const BUILTIN_JP: &[(&str, &[&str])] = &[
    ("Technology", &["6758.T", "6861.T", "8035.T", "6501.T", "6702.T"]),
    ("Financial Services", &["8306.T", "8316.T", "8411.T", "8766.T"]),
    ("Healthcare", &["4502.T", "4568.T", "4519.T", "4503.T"]),
    ("Consumer Cyclical", &["7203.T", "7267.T", "9983.T", "6902.T"]),
    ("Consumer Defensive", &["2914.T", "2502.T", "4452.T"]),
    ("Industrials", &["6301.T", "8058.T", "8031.T", "7011.T"]),
    ("Energy", &["5020.T", "1605.T"]),
    ("Basic Materials", &["4063.T", "5401.T", "3407.T"]),
    ("Utilities", &["9501.T", "9503.T", "9531.T"]),
    ("Real Estate", &["8801.T", "8802.T", "8830.T"]),
    ("Communication Services", &["9432.T", "9433.T", "9984.T", "7974.T"]),
];

const BUILTIN_DE: &[(&str, &[&str])] = &[
    ("Technology", &["SAP.DE", "IFX.DE"]),
    ("Financial Services", &["ALV.DE", "DBK.DE", "MUV2.DE", "CBK.DE"]),
    ("Healthcare", &["BAYN.DE", "MRK.DE", "SHL.DE", "FRE.DE"]),
    ("Consumer Cyclical", &["MBG.DE", "BMW.DE", "VOW3.DE", "ADS.DE"]),
    ("Consumer Defensive", &["BEI.DE", "HEN3.DE"]),
    ("Industrials", &["SIE.DE", "AIR.DE", "DHL.DE", "MTX.DE", "RHM.DE"]),
    ("Basic Materials", &["BAS.DE", "HEI.DE"]),
    ("Utilities", &["EOAN.DE", "RWE.DE"]),
    ("Real Estate", &["VNA.DE"]),
    ("Communication Services", &["DTE.DE"]),
];

const BUILTIN_IN: &[(&str, &[&str])] = &[
    ("Technology", &["TCS.NS", "INFY.NS", "HCLTECH.NS", "WIPRO.NS", "TECHM.NS"]),
    ("Financial Services", &["HDFCBANK.NS", "ICICIBANK.NS", "SBIN.NS", "KOTAKBANK.NS", "BAJFINANCE.NS"]),
    ("Healthcare", &["SUNPHARMA.NS", "DRREDDY.NS", "CIPLA.NS"]),
    ("Consumer Cyclical", &["MARUTI.NS", "TATAMOTORS.NS", "M&M.NS", "TITAN.NS"]),
    ("Consumer Defensive", &["HINDUNILVR.NS", "ITC.NS", "NESTLEIND.NS"]),
    ("Industrials", &["LT.NS", "ADANIPORTS.NS"]),
    ("Energy", &["RELIANCE.NS", "ONGC.NS", "COALINDIA.NS"]),
    ("Basic Materials", &["TATASTEEL.NS", "JSWSTEEL.NS", "ULTRACEMCO.NS"]),
    ("Utilities", &["NTPC.NS", "POWERGRID.NS"]),
    ("Communication Services", &["BHARTIARTL.NS"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sectors_and_names() {
        let u = MarketUniverse::from_toml(
            r#"
            market = "JP"

            [sectors]
            Technology = ["6758.T", "8035.T"]
            Energy = ["5020.T"]

            [names]
            "6758.T" = "Sony Group"
            "#,
        )
        .unwrap();
        assert_eq!(u.market, Market::JP);
        assert_eq!(u.ticker_count(), 3);
        assert_eq!(u.display_name("6758.T"), "Sony Group");
        assert_eq!(u.display_name("5020.T"), "5020.T");

        let entries: Vec<_> = u.entries().collect();
        assert_eq!(entries[0], ("5020.T", "Energy"));
        assert_eq!(entries[1], ("6758.T", "Technology"));
    }

    #[test]
    fn builtin_round_trips_through_toml() {
        let u = MarketUniverse::builtin(Market::US).unwrap();
        let parsed = MarketUniverse::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(u, parsed);
        assert!(u.ticker_count() > 50);
    }

    #[test]
    fn no_builtin_for_vendor_feed_markets() {
        assert!(MarketUniverse::builtin(Market::KR).is_none());
        assert!(MarketUniverse::builtin(Market::VN).is_none());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = MarketUniverse::from_file(Path::new("/nonexistent/us.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/us.toml"));
    }
}
