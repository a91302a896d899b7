//! Cross-country trend scores and their categorical momentum signal.

use super::sector::Sector;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Banded label derived from a trend score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumSignal {
    StrongUp,
    Up,
    Neutral,
    Down,
    StrongDown,
}

impl MomentumSignal {
    /// Classify a score into five bands split at ±30 and ±60.
    ///
    /// A score sitting exactly on a boundary falls into the band closer to
    /// zero (60.0 is `Up`, -30.0 is `Neutral`, -60.0 is `Down`).
    pub fn from_score(score: f64) -> Self {
        if score > 60.0 {
            Self::StrongUp
        } else if score > 30.0 {
            Self::Up
        } else if score >= -30.0 {
            Self::Neutral
        } else if score >= -60.0 {
            Self::Down
        } else {
            Self::StrongDown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongUp => "STRONG_UP",
            Self::Up => "UP",
            Self::Neutral => "NEUTRAL",
            Self::Down => "DOWN",
            Self::StrongDown => "STRONG_DOWN",
        }
    }
}

impl fmt::Display for MomentumSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown momentum signal '{0}'")]
pub struct UnknownSignal(pub String);

impl FromStr for MomentumSignal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRONG_UP" => Ok(Self::StrongUp),
            "UP" => Ok(Self::Up),
            "NEUTRAL" => Ok(Self::Neutral),
            "DOWN" => Ok(Self::Down),
            "STRONG_DOWN" => Ok(Self::StrongDown),
            other => Err(UnknownSignal(other.to_string())),
        }
    }
}

/// Composite cross-country score for one sector on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendScore {
    pub date: NaiveDate,
    pub sector: Sector,
    /// Roughly within [-100, 100]; 2 decimals.
    pub score: f64,
    pub countries_positive: usize,
    pub countries_negative: usize,
    /// Mean of the countries' sector returns (percent, 4 decimals).
    pub global_avg_return: f64,
    /// Share of reporting countries with a positive return (4 decimals).
    pub global_breadth: f64,
    pub signal: MomentumSignal,
}
