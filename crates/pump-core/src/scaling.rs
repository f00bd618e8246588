//! Raw-to-engineering-unit conversion.

use serde::{Deserialize, Serialize};

/// Linear interpolation of `raw` from `[raw_min, raw_max]` onto
/// `[eng_min, eng_max]`. The raw value is clamped to its range first; a
/// degenerate raw range yields `eng_min`.
pub fn scale(raw: f64, raw_min: f64, raw_max: f64, eng_min: f64, eng_max: f64) -> f64 {
    let clamped = raw.min(raw_max).max(raw_min);

    let raw_range = raw_max - raw_min;
    if raw_range == 0.0 {
        return eng_min;
    }

    (clamped - raw_min) / raw_range * (eng_max - eng_min) + eng_min
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    pub raw_min: f64,
    pub raw_max: f64,
    pub eng_min: f64,
    pub eng_max: f64,
}

impl ScalingConfig {
    /// Signed 16-bit register spanning 0..100 %.
    pub const INT16_FULL: ScalingConfig = ScalingConfig {
        raw_min: -32768.0,
        raw_max: 32767.0,
        eng_min: 0.0,
        eng_max: 100.0,
    };

    /// 4-20 mA loop on a 12-bit ADC (about 6400 counts at 4 mA).
    pub const ANALOG_4_20MA: ScalingConfig = ScalingConfig {
        raw_min: 6400.0,
        raw_max: 32000.0,
        eng_min: 0.0,
        eng_max: 100.0,
    };

    pub const fn new(raw_min: f64, raw_max: f64, eng_min: f64, eng_max: f64) -> Self {
        Self {
            raw_min,
            raw_max,
            eng_min,
            eng_max,
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        scale(raw, self.raw_min, self.raw_max, self.eng_min, self.eng_max)
    }

    /// Inverse mapping, used to synthesize raw counts from a plant model.
    pub fn to_raw(&self, eng: f64) -> f64 {
        scale(eng, self.eng_min, self.eng_max, self.raw_min, self.raw_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_of_station_range() {
        assert_eq!(scale(16000.0, 0.0, 32000.0, 0.0, 100.0), 50.0);
    }

    #[test]
    fn clamps_below_and_above() {
        assert_eq!(scale(-500.0, 0.0, 32000.0, 0.0, 100.0), 0.0);
        assert_eq!(scale(40000.0, 0.0, 32000.0, 0.0, 100.0), 100.0);
    }

    #[test]
    fn degenerate_range_returns_eng_min() {
        assert_eq!(scale(1234.0, 5.0, 5.0, 50.0, 150.0), 50.0);
        assert_eq!(scale(-1.0, 5.0, 5.0, 50.0, 150.0), 50.0);
    }

    #[test]
    fn inverted_raw_range_clamps_to_raw_min() {
        assert_eq!(scale(5.0, 10.0, 0.0, 0.0, 100.0), 0.0);
    }

    #[test]
    fn offset_engineering_range() {
        let temp = ScalingConfig::new(0.0, 32000.0, 50.0, 150.0);
        assert_eq!(temp.apply(0.0), 50.0);
        assert_eq!(temp.apply(32000.0), 150.0);
        assert_eq!(temp.apply(16000.0), 100.0);
    }

    #[test]
    fn four_to_twenty_live_zero() {
        let cfg = ScalingConfig::ANALOG_4_20MA;
        assert_eq!(cfg.apply(6400.0), 0.0);
        assert_eq!(cfg.apply(0.0), 0.0);
        assert_eq!(cfg.apply(19200.0), 50.0);
    }

    #[test]
    fn to_raw_inverts_apply() {
        let cfg = ScalingConfig::new(0.0, 32000.0, 0.0, 200.0);
        assert_eq!(cfg.to_raw(50.0), 8000.0);
        assert_eq!(cfg.apply(cfg.to_raw(120.0)), 120.0);
    }
}
