//! Test-design enums shared by the statistical components

use serde::{Deserialize, Serialize};

/// Whether a hypothesis test looks at one or both tails
///
/// One-sided tests use H1: treatment rate > control rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sidedness {
    OneSided,
    #[default]
    TwoSided,
}

impl Sidedness {
    /// Upper-tail probability whose normal quantile is the critical value
    pub fn critical_quantile(&self, alpha: f64) -> f64 {
        match self {
            Self::OneSided => 1.0 - alpha,
            Self::TwoSided => 1.0 - alpha / 2.0,
        }
    }
}

/// How a minimum detectable effect is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MdeMode {
    /// Percentage-point change: `p2 = p1 + mde`
    #[default]
    Absolute,
    /// Fractional change: `p2 = p1 * (1 + mde)`
    Relative,
}

impl MdeMode {
    /// Treatment rate implied by a baseline and an effect
    pub fn treatment_rate(&self, baseline: f64, mde: f64) -> f64 {
        match self {
            Self::Absolute => baseline + mde,
            Self::Relative => baseline * (1.0 + mde),
        }
    }
}

/// Ordering of segments in a stratified analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentOrder {
    /// Largest combined sample size first
    #[default]
    SampleSizeDescending,
    /// Alphabetical by segment value, missing values last
    SegmentAscending,
    /// Largest signed difference first, harmful segments toward the end;
    /// failed segments last
    UpliftDescending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_quantile() {
        assert!((Sidedness::TwoSided.critical_quantile(0.05) - 0.975).abs() < 1e-12);
        assert!((Sidedness::OneSided.critical_quantile(0.05) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_mde_modes() {
        assert!((MdeMode::Absolute.treatment_rate(0.10, 0.02) - 0.12).abs() < 1e-12);
        assert!((MdeMode::Relative.treatment_rate(0.10, 0.20) - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Sidedness::default(), Sidedness::TwoSided);
        assert_eq!(MdeMode::default(), MdeMode::Absolute);
        assert_eq!(SegmentOrder::default(), SegmentOrder::SampleSizeDescending);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&SegmentOrder::UpliftDescending).unwrap();
        assert_eq!(json, "\"uplift_descending\"");
        let parsed: Sidedness = serde_json::from_str("\"one_sided\"").unwrap();
        assert_eq!(parsed, Sidedness::OneSided);
    }
}
