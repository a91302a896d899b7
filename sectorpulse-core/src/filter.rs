//! Filter engine — decides which instruments feed sector aggregation.
//!
//! Three independent checks run per market per day:
//! 1. Market-cap floor (absolute, local currency).
//! 2. Volume floor: the bottom percentile of volume among cap-filter
//!    survivors. The threshold is computed over survivors only, so removing
//!    a small-cap name never moves the bar for the others.
//! 3. Abnormal move: |daily return| above a fixed threshold. Runs on every
//!    instrument, including ones already excluded by 1 or 2.
//!
//! Screening is pure: records are copied into [`ScreenedInstrument`]s and
//! the input slice is left untouched.

use crate::domain::{FilterFlags, InstrumentRecord, ScreenedInstrument};
use crate::stats::percentile;
use serde::{Deserialize, Serialize};

/// Per-market filter thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Market-cap floor in local currency. `0.0` disables the cap filter.
    pub min_market_cap: f64,
    /// Volume percentile (0-100) below which survivors are excluded.
    pub volume_bottom_percentile: f64,
    /// Absolute daily return (percent) above which a move is abnormal.
    pub abnormal_return_threshold: f64,
}

impl FilterPolicy {
    pub const DEFAULT_VOLUME_BOTTOM_PERCENTILE: f64 = 20.0;
    pub const DEFAULT_ABNORMAL_RETURN_THRESHOLD: f64 = 50.0;

    pub fn with_min_market_cap(min_market_cap: f64) -> Self {
        Self {
            min_market_cap,
            ..Self::default()
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            min_market_cap: 0.0,
            volume_bottom_percentile: Self::DEFAULT_VOLUME_BOTTOM_PERCENTILE,
            abnormal_return_threshold: Self::DEFAULT_ABNORMAL_RETURN_THRESHOLD,
        }
    }
}

/// Counts produced by one screening pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub total: usize,
    pub filtered: usize,
    pub abnormal: usize,
    pub active: usize,
}

impl FilterSummary {
    pub fn from_screened(screened: &[ScreenedInstrument]) -> Self {
        Self {
            total: screened.len(),
            filtered: screened.iter().filter(|s| s.flags.is_filtered).count(),
            abnormal: screened.iter().filter(|s| s.flags.is_abnormal).count(),
            active: screened.iter().filter(|s| s.is_active()).count(),
        }
    }
}

/// Screen one market's instruments for one date.
///
/// Output order matches input order.
pub fn screen(records: &[InstrumentRecord], policy: &FilterPolicy) -> Vec<ScreenedInstrument> {
    let mut flags = vec![FilterFlags::default(); records.len()];

    // 1) Market-cap floor. Missing cap counts as zero.
    if policy.min_market_cap > 0.0 {
        for (flag, record) in flags.iter_mut().zip(records) {
            if record.market_cap.unwrap_or(0.0) < policy.min_market_cap {
                flag.is_filtered = true;
            }
        }
    }

    // 2) Volume floor over cap-filter survivors. Missing volume counts as zero.
    let survivor_volumes: Vec<f64> = records
        .iter()
        .zip(&flags)
        .filter(|(_, flag)| !flag.is_filtered)
        .map(|(record, _)| record.volume.unwrap_or(0.0))
        .collect();

    if let Some(threshold) = percentile(
        &survivor_volumes,
        policy.volume_bottom_percentile / 100.0,
    ) {
        for (flag, record) in flags.iter_mut().zip(records) {
            if !flag.is_filtered && record.volume.unwrap_or(0.0) < threshold {
                flag.is_filtered = true;
            }
        }
    }

    // 3) Abnormal move, independent of 1 and 2.
    for (flag, record) in flags.iter_mut().zip(records) {
        if let Some(ret) = record.daily_return {
            if ret.abs() > policy.abnormal_return_threshold {
                flag.is_abnormal = true;
            }
        }
    }

    records
        .iter()
        .cloned()
        .zip(flags)
        .map(|(record, flags)| ScreenedInstrument { record, flags })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sector;

    fn rec(ticker: &str, cap: Option<f64>, volume: Option<f64>, ret: Option<f64>) -> InstrumentRecord {
        InstrumentRecord {
            market_cap: cap,
            volume,
            daily_return: ret,
            ..InstrumentRecord::new(ticker, ticker, Sector::Energy, 10.0)
        }
    }

    fn flags_of(screened: &[ScreenedInstrument], ticker: &str) -> FilterFlags {
        screened
            .iter()
            .find(|s| s.record.ticker == ticker)
            .map(|s| s.flags)
            .unwrap()
    }

    #[test]
    fn cap_filter_treats_missing_cap_as_zero() {
        let records = vec![
            rec("BIG", Some(1e9), Some(100.0), Some(1.0)),
            rec("NOCAP", None, Some(100.0), Some(1.0)),
            rec("SMALL", Some(1e6), Some(100.0), Some(1.0)),
        ];
        let out = screen(&records, &FilterPolicy::with_min_market_cap(5e8));
        assert!(!flags_of(&out, "BIG").is_filtered);
        assert!(flags_of(&out, "NOCAP").is_filtered);
        assert!(flags_of(&out, "SMALL").is_filtered);
    }

    #[test]
    fn zero_threshold_disables_cap_filter() {
        let records = vec![rec("A", None, Some(10.0), None), rec("B", None, Some(10.0), None)];
        let out = screen(&records, &FilterPolicy::default());
        assert!(out.iter().all(|s| !s.flags.is_filtered));
    }

    #[test]
    fn volume_filter_uses_survivor_percentile() {
        // Survivors' volumes: 100..=500 → 20th pct = 180. Only 100 is below.
        let records = vec![
            rec("V100", Some(1e9), Some(100.0), None),
            rec("V200", Some(1e9), Some(200.0), None),
            rec("V300", Some(1e9), Some(300.0), None),
            rec("V400", Some(1e9), Some(400.0), None),
            rec("V500", Some(1e9), Some(500.0), None),
            rec("TINY", Some(1.0), Some(1.0), None),
        ];
        let out = screen(&records, &FilterPolicy::with_min_market_cap(5e8));
        assert!(flags_of(&out, "V100").is_filtered);
        assert!(!flags_of(&out, "V200").is_filtered);
        assert!(flags_of(&out, "TINY").is_filtered);
    }

    #[test]
    fn missing_volume_counts_as_zero() {
        let records = vec![
            rec("NOVOL", None, None, None),
            rec("A", None, Some(10.0), None),
            rec("B", None, Some(20.0), None),
        ];
        let out = screen(&records, &FilterPolicy::default());
        assert!(flags_of(&out, "NOVOL").is_filtered);
    }

    #[test]
    fn no_survivors_skips_volume_filter() {
        let records = vec![rec("A", None, Some(10.0), Some(70.0))];
        let out = screen(&records, &FilterPolicy::with_min_market_cap(5e8));
        assert!(out[0].flags.is_filtered);
        assert!(out[0].flags.is_abnormal);
    }

    #[test]
    fn abnormal_flag_is_independent_of_filtering() {
        let records = vec![
            rec("UP", Some(1e9), Some(500.0), Some(55.0)),
            rec("DOWN", Some(1.0), Some(500.0), Some(-60.0)),
            rec("EDGE", Some(1e9), Some(500.0), Some(50.0)),
            rec("NULL", Some(1e9), Some(500.0), None),
        ];
        let out = screen(&records, &FilterPolicy::with_min_market_cap(5e8));
        assert!(flags_of(&out, "UP").is_abnormal);
        assert!(!flags_of(&out, "UP").is_filtered);
        assert!(flags_of(&out, "DOWN").is_abnormal);
        assert!(flags_of(&out, "DOWN").is_filtered);
        assert!(!flags_of(&out, "EDGE").is_abnormal);
        assert!(!flags_of(&out, "NULL").is_abnormal);
    }

    #[test]
    fn all_null_returns_flag_nothing_abnormal() {
        let records = vec![rec("A", None, Some(1.0), None), rec("B", None, Some(2.0), None)];
        let out = screen(&records, &FilterPolicy::default());
        assert!(out.iter().all(|s| !s.flags.is_abnormal));
    }

    #[test]
    fn preserves_input_order_and_leaves_input_untouched() {
        let records = vec![
            rec("C", None, Some(3.0), None),
            rec("A", None, Some(1.0), None),
            rec("B", None, Some(2.0), None),
        ];
        let before = records.clone();
        let out = screen(&records, &FilterPolicy::default());
        let tickers: Vec<_> = out.iter().map(|s| s.record.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["C", "A", "B"]);
        assert_eq!(records, before);
    }

    #[test]
    fn summary_counts() {
        let records = vec![
            rec("A", Some(1e9), Some(100.0), Some(80.0)),
            rec("B", Some(1.0), Some(100.0), Some(1.0)),
            rec("C", Some(1e9), Some(100.0), Some(1.0)),
        ];
        let out = screen(&records, &FilterPolicy::with_min_market_cap(5e8));
        let summary = FilterSummary::from_screened(&out);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.abnormal, 1);
        assert_eq!(summary.active, 1);
    }
}
