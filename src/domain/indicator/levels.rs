//! Central Pivot Range and classic floor-trader pivot levels.
//!
//! Both are single-bar calculators: levels for bar `i` are built from the
//! high, low and close of bar `i - 1`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CprLevels {
    pub pivot: f64,
    /// Bottom central pivot.
    pub bc: f64,
    /// Top central pivot.
    pub tc: f64,
}

impl CprLevels {
    pub fn from_hlc(high: f64, low: f64, close: f64) -> Self {
        let pivot = (high + low + close) / 3.0;
        let bc = (high + low) / 2.0;
        let tc = 2.0 * pivot - bc;
        Self { pivot, bc, tc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotLevels {
    pub fn from_hlc(high: f64, low: f64, close: f64) -> Self {
        let pivot = (high + low + close) / 3.0;
        let range = high - low;
        Self {
            pivot,
            r1: 2.0 * pivot - low,
            r2: pivot + range,
            r3: high + 2.0 * (pivot - low),
            s1: 2.0 * pivot - high,
            s2: pivot - range,
            s3: low - 2.0 * (high - pivot),
        }
    }

    pub fn resistances(&self) -> [f64; 3] {
        [self.r1, self.r2, self.r3]
    }

    /// True when `price` lies within `threshold` relative distance of any
    /// resistance level.
    pub fn near_resistance(&self, price: f64, threshold: f64) -> bool {
        self.resistances()
            .iter()
            .any(|&level| is_near(price, level, threshold))
    }
}

/// |price - level| / level < threshold. A zero level is never "near".
pub fn is_near(price: f64, level: f64, threshold: f64) -> bool {
    if level == 0.0 {
        return false;
    }
    ((price - level) / level).abs() < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cpr_symmetric_bar_collapses() {
        let cpr = CprLevels::from_hlc(100.0, 90.0, 95.0);
        assert_relative_eq!(cpr.pivot, 95.0);
        assert_relative_eq!(cpr.bc, 95.0);
        assert_relative_eq!(cpr.tc, 95.0);
    }

    #[test]
    fn cpr_close_near_high_lifts_tc() {
        let cpr = CprLevels::from_hlc(110.0, 90.0, 108.0);
        // pivot = 308/3, bc = 100
        assert_relative_eq!(cpr.bc, 100.0);
        assert!(cpr.tc > cpr.pivot);
        assert!(cpr.pivot > cpr.bc);
    }

    #[test]
    fn pivot_levels_classic() {
        let p = PivotLevels::from_hlc(110.0, 90.0, 100.0);
        assert_relative_eq!(p.pivot, 100.0);
        assert_relative_eq!(p.r1, 110.0);
        assert_relative_eq!(p.r2, 120.0);
        assert_relative_eq!(p.r3, 130.0);
        assert_relative_eq!(p.s1, 90.0);
        assert_relative_eq!(p.s2, 80.0);
        assert_relative_eq!(p.s3, 70.0);
    }

    #[test]
    fn near_uses_relative_distance() {
        assert!(is_near(100.05, 100.0, 0.001));
        assert!(!is_near(100.2, 100.0, 0.001));
        assert!(is_near(99.95, 100.0, 0.001));
        assert!(!is_near(1.0, 0.0, 0.5));
    }

    #[test]
    fn near_resistance_checks_all_three() {
        let p = PivotLevels::from_hlc(110.0, 90.0, 100.0);
        assert!(p.near_resistance(110.05, 0.001));
        assert!(p.near_resistance(120.0, 0.001));
        assert!(p.near_resistance(129.9, 0.001));
        assert!(!p.near_resistance(115.0, 0.001));
    }
}
