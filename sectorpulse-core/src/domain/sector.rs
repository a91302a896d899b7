//! Sector taxonomy — the fixed GICS-like categories shared by every market.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the 11 GICS-like sectors, or `Other` for anything a vendor
/// taxonomy could not place.
///
/// Variant order is the canonical output order for aggregated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    InformationTechnology,
    Financials,
    HealthCare,
    ConsumerDiscretionary,
    ConsumerStaples,
    Industrials,
    Energy,
    Materials,
    Utilities,
    RealEstate,
    CommunicationServices,
    Other,
}

impl Sector {
    /// The 11 real sectors (excludes `Other`).
    pub const ALL: [Sector; 11] = [
        Sector::InformationTechnology,
        Sector::Financials,
        Sector::HealthCare,
        Sector::ConsumerDiscretionary,
        Sector::ConsumerStaples,
        Sector::Industrials,
        Sector::Energy,
        Sector::Materials,
        Sector::Utilities,
        Sector::RealEstate,
        Sector::CommunicationServices,
    ];

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InformationTechnology => "information_technology",
            Self::Financials => "financials",
            Self::HealthCare => "health_care",
            Self::ConsumerDiscretionary => "consumer_discretionary",
            Self::ConsumerStaples => "consumer_staples",
            Self::Industrials => "industrials",
            Self::Energy => "energy",
            Self::Materials => "materials",
            Self::Utilities => "utilities",
            Self::RealEstate => "real_estate",
            Self::CommunicationServices => "communication_services",
            Self::Other => "other",
        }
    }

    /// Human-readable label used in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::InformationTechnology => "Information Technology",
            Self::Financials => "Financials",
            Self::HealthCare => "Health Care",
            Self::ConsumerDiscretionary => "Consumer Discretionary",
            Self::ConsumerStaples => "Consumer Staples",
            Self::Industrials => "Industrials",
            Self::Energy => "Energy",
            Self::Materials => "Materials",
            Self::Utilities => "Utilities",
            Self::RealEstate => "Real Estate",
            Self::CommunicationServices => "Communication Services",
            Self::Other => "Other",
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, Self::Other)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sector '{0}'")]
pub struct UnknownSector(pub String);

impl FromStr for Sector {
    type Err = UnknownSector;

    /// Accepts the storage label or the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Sector::ALL
            .iter()
            .chain(std::iter::once(&Sector::Other))
            .find(|sector| {
                sector.as_str().eq_ignore_ascii_case(needle)
                    || sector.display_name().eq_ignore_ascii_case(needle)
            })
            .copied()
            .ok_or_else(|| UnknownSector(s.to_string()))
    }
}
