//! Trend scorer — combines every market's sector performance into one
//! cross-country score per sector.
//!
//! ```text
//! score = norm_return * w_return + norm_breadth * w_breadth + norm_momentum * w_momentum
//!
//! norm_return   = clamp(avg_return / return_scale * 100, -100, 100)
//! norm_breadth  = (breadth - 0.5) * 200
//! norm_momentum = clamp(avg_weekly / weekly_scale * 100, -100, 100)   (0 without weekly data)
//! ```
//!
//! Missing markets simply shrink the sample; partial data is never an error.

use crate::domain::{MomentumSignal, Sector, SectorPerformance, TrendScore};
use crate::stats::{mean, round_to};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weights of the three score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendWeights {
    pub daily_return: f64,
    pub breadth: f64,
    pub momentum: f64,
}

impl Default for TrendWeights {
    fn default() -> Self {
        Self {
            daily_return: 0.4,
            breadth: 0.3,
            momentum: 0.3,
        }
    }
}

/// Scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub weights: TrendWeights,
    /// Average daily return (percent) mapped to the full ±100 scale.
    pub return_scale: f64,
    /// Average weekly return (percent) mapped to the full ±100 scale.
    pub weekly_scale: f64,
    /// Breadth measured over fewer reporting countries than this is
    /// treated as neutral (0.5).
    pub min_breadth_countries: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            weights: TrendWeights::default(),
            return_scale: 5.0,
            weekly_scale: 10.0,
            min_breadth_countries: 2,
        }
    }
}

/// Intermediate values for one sector, before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub avg_return: f64,
    pub breadth: f64,
    pub countries_positive: usize,
    pub countries_negative: usize,
    pub norm_return: f64,
    pub norm_breadth: f64,
    pub norm_momentum: f64,
    pub score: f64,
}

impl ScoreBreakdown {
    /// Score one sector from its per-market rows.
    ///
    /// Returns `None` when no row carries a daily return.
    pub fn compute(entries: &[&SectorPerformance], config: &TrendConfig) -> Option<Self> {
        let returns: Vec<f64> = entries.iter().filter_map(|e| e.daily_return).collect();
        let avg_return = mean(&returns)?;

        let countries_positive = returns.iter().filter(|&&r| r > 0.0).count();
        let countries_negative = returns.iter().filter(|&&r| r < 0.0).count();
        let breadth = if returns.is_empty() || returns.len() < config.min_breadth_countries {
            0.5
        } else {
            countries_positive as f64 / returns.len() as f64
        };

        let norm_return = (avg_return / config.return_scale * 100.0).clamp(-100.0, 100.0);
        let norm_breadth = (breadth - 0.5) * 200.0;

        // Any recorded weekly return counts, including an exact 0.0.
        let weekly: Vec<f64> = entries.iter().filter_map(|e| e.weekly_return).collect();
        let norm_momentum = mean(&weekly)
            .map_or(0.0, |w| (w / config.weekly_scale * 100.0).clamp(-100.0, 100.0));

        let w = &config.weights;
        let score = norm_return * w.daily_return + norm_breadth * w.breadth + norm_momentum * w.momentum;

        Some(Self {
            avg_return,
            breadth,
            countries_positive,
            countries_negative,
            norm_return,
            norm_breadth,
            norm_momentum,
            score,
        })
    }
}

/// Score every sector present in `performance` for `date`.
///
/// Rows for other dates and for [`Sector::Other`] are ignored. Output is
/// ordered by score, highest first.
pub fn score_sectors(
    date: NaiveDate,
    performance: &[SectorPerformance],
    config: &TrendConfig,
) -> Vec<TrendScore> {
    let mut by_sector: BTreeMap<Sector, Vec<&SectorPerformance>> = BTreeMap::new();
    for row in performance.iter().filter(|r| r.date == date && !r.sector.is_other()) {
        by_sector.entry(row.sector).or_default().push(row);
    }

    let mut scores: Vec<TrendScore> = by_sector
        .into_iter()
        .filter_map(|(sector, entries)| {
            let b = ScoreBreakdown::compute(&entries, config)?;
            // Band the stored value so score and signal always agree.
            let score = round_to(b.score, 2);
            Some(TrendScore {
                date,
                sector,
                score,
                countries_positive: b.countries_positive,
                countries_negative: b.countries_negative,
                global_avg_return: round_to(b.avg_return, 4),
                global_breadth: round_to(b.breadth, 4),
                signal: MomentumSignal::from_score(score),
            })
        })
        .collect();

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores
}
