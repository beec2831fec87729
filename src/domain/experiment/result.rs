//! Typed results returned by the statistical components

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::counts::AggregateCounts;
use super::observation::Variant;
use super::params::{SegmentOrder, Sidedness};
use crate::domain::DomainError;

// ============================================================================
// Warning
// ============================================================================

/// Diagnostic attached to a result; never changes the decision itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Significant before the planned per-arm sample size was reached
    EarlyStoppingRisk { realized: u64, planned: u64 },
    /// At least one arm is below the reliability floor
    LowSampleSize { smallest_arm: u64, floor: u64 },
    /// Control rate is zero so relative uplift has no value
    UndefinedRelativeUplift,
    /// Observed allocation does not match the intended split
    SampleRatioMismatch { p_value: f64, threshold: f64 },
    /// Shorter than a week: novelty effects and weekly seasonality
    ShortExperiment { days: u64 },
    /// Longer than about two months
    LongExperiment { days: u64 },
}

// ============================================================================
// Planning
// ============================================================================

/// Required sample size for a planned experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSizeResult {
    pub baseline_rate: f64,
    pub treatment_rate: f64,
    /// Effect in percentage points
    pub absolute_mde: f64,
    /// Effect as a fraction of the baseline
    pub relative_mde: f64,
    /// Cohen's h between baseline and treatment rate
    pub effect_size: f64,
    pub alpha: f64,
    pub power: f64,
    pub sidedness: Sidedness,
    /// Treatment units per control unit
    pub allocation_ratio: f64,
    pub n_control: u64,
    pub n_treatment: u64,
    pub total: u64,
}

/// One point of the sample-size sensitivity curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub mde: f64,
    pub n_per_variant: u64,
    pub total: u64,
}

/// Experiment duration estimate at a given traffic level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub required_total: u64,
    pub daily_traffic: u64,
    pub days: u64,
    pub weeks: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_end: Option<NaiveDate>,
    pub warnings: Vec<Warning>,
}

// ============================================================================
// SRM
// ============================================================================

/// Observed versus expected allocation for one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationDiagnostic {
    pub variant: Variant,
    pub observed: u64,
    pub expected: f64,
    pub expected_share: f64,
    pub observed_share: f64,
    /// `(observed - expected) / expected * 100`
    pub deviation_pct: f64,
}

/// Sample ratio mismatch check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrmResult {
    pub total: u64,
    pub chi_square: f64,
    pub degrees_of_freedom: u64,
    pub p_value: f64,
    pub threshold: f64,
    pub srm_detected: bool,
    pub allocations: Vec<AllocationDiagnostic>,
    pub warnings: Vec<Warning>,
}

// ============================================================================
// Frequentist
// ============================================================================

/// Two-proportion z-test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZTestResult {
    pub counts: AggregateCounts,
    pub control_rate: f64,
    pub treatment_rate: f64,
    /// `treatment_rate - control_rate`
    pub difference: f64,
    /// `difference / control_rate`; `None` when the control rate is zero
    pub relative_uplift: Option<f64>,
    pub z_statistic: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub alpha: f64,
    pub sidedness: Sidedness,
    pub significant: bool,
    pub winner: Option<Variant>,
    /// Post-hoc power. Descriptive only.
    pub achieved_power: f64,
    pub warnings: Vec<Warning>,
}

impl ZTestResult {
    /// Relative uplift, or a typed error when the control rate is zero
    pub fn require_relative_uplift(&self) -> Result<f64, DomainError> {
        self.relative_uplift.ok_or_else(|| {
            DomainError::numerical_instability(
                "relative_uplift",
                "control conversion rate is zero",
            )
        })
    }

    /// Whether the confidence interval excludes zero
    pub fn interval_excludes_zero(&self) -> bool {
        self.ci_lower > 0.0 || self.ci_upper < 0.0
    }
}

// ============================================================================
// Bayesian
// ============================================================================

/// Beta distribution parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParams {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaParams {
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

impl Default for BetaParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

/// Percentile interval estimated from posterior samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CredibleInterval {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Which variant the expected-loss rule favours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Control,
    Treatment,
    Inconclusive,
}

impl Recommendation {
    pub fn variant(&self) -> Option<Variant> {
        match self {
            Self::Control => Some(Variant::Control),
            Self::Treatment => Some(Variant::Treatment),
            Self::Inconclusive => None,
        }
    }
}

/// Beta-Binomial posterior comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianResult {
    pub counts: AggregateCounts,
    pub prior: BetaParams,
    pub control_posterior: BetaParams,
    pub treatment_posterior: BetaParams,
    pub posterior_mean_control: f64,
    pub posterior_mean_treatment: f64,
    pub prob_treatment_better: f64,
    pub prob_control_better: f64,
    /// Interval of `(treatment - control) / control`
    pub relative_uplift_interval: CredibleInterval,
    /// Interval of `treatment - control`
    pub difference_interval: CredibleInterval,
    pub expected_loss_treatment: f64,
    pub expected_loss_control: f64,
    pub loss_tolerance: f64,
    pub recommendation: Recommendation,
    pub draws: usize,
    /// Seed used; `None` means the run is not reproducible
    pub seed: Option<u64>,
    pub warnings: Vec<Warning>,
}

// ============================================================================
// Segments
// ============================================================================

/// Point estimate and interval for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEstimate {
    pub control_rate: f64,
    pub treatment_rate: f64,
    pub difference: f64,
    pub relative_uplift: Option<f64>,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub p_value: f64,
    pub significant: bool,
    pub warnings: Vec<Warning>,
}

impl From<ZTestResult> for SegmentEstimate {
    fn from(result: ZTestResult) -> Self {
        Self {
            control_rate: result.control_rate,
            treatment_rate: result.treatment_rate,
            difference: result.difference,
            relative_uplift: result.relative_uplift,
            ci_lower: result.ci_lower,
            ci_upper: result.ci_upper,
            p_value: result.p_value,
            significant: result.significant,
            warnings: result.warnings,
        }
    }
}

/// Outcome of evaluating one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentOutcome {
    Evaluated(SegmentEstimate),
    Failed { error: DomainError },
}

impl SegmentOutcome {
    pub fn estimate(&self) -> Option<&SegmentEstimate> {
        match self {
            Self::Evaluated(estimate) => Some(estimate),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&DomainError> {
        match self {
            Self::Evaluated(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// One stratum of a segment analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    /// Attribute value; `None` groups units that lack the attribute
    pub segment: Option<String>,
    pub counts: AggregateCounts,
    pub outcome: SegmentOutcome,
}

impl SegmentResult {
    pub fn sample_size(&self) -> u64 {
        self.counts.total()
    }
}

/// Stratified comparison across the values of one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAnalysis {
    pub attribute: String,
    pub order: SegmentOrder,
    pub total_observations: u64,
    pub segments: Vec<SegmentResult>,
}

impl SegmentAnalysis {
    pub fn significant_segments(&self) -> impl Iterator<Item = &SegmentResult> {
        self.segments.iter().filter(|segment| {
            segment
                .outcome
                .estimate()
                .is_some_and(|estimate| estimate.significant)
        })
    }

    pub fn failed_segments(&self) -> impl Iterator<Item = &SegmentResult> {
        self.segments
            .iter()
            .filter(|segment| segment.outcome.error().is_some())
    }
}

// ============================================================================
// TestResult
// ============================================================================

/// Any result produced by the engine, tagged by test kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestResult {
    Srm(SrmResult),
    ZTest(ZTestResult),
    Bayesian(BayesianResult),
    Segment(SegmentAnalysis),
}

impl TestResult {
    /// The decision flag of the underlying test
    ///
    /// SRM: violation detected. Z-test: significant. Bayesian: a variant is
    /// recommended. Segments: at least one segment is significant.
    pub fn decision(&self) -> bool {
        match self {
            Self::Srm(result) => result.srm_detected,
            Self::ZTest(result) => result.significant,
            Self::Bayesian(result) => result.recommendation != Recommendation::Inconclusive,
            Self::Segment(result) => result.significant_segments().next().is_some(),
        }
    }

    /// Diagnostic warnings, flattened across segments
    pub fn warnings(&self) -> Vec<&Warning> {
        match self {
            Self::Srm(result) => result.warnings.iter().collect(),
            Self::ZTest(result) => result.warnings.iter().collect(),
            Self::Bayesian(result) => result.warnings.iter().collect(),
            Self::Segment(result) => result
                .segments
                .iter()
                .filter_map(|segment| segment.outcome.estimate())
                .flat_map(|estimate| estimate.warnings.iter())
                .collect(),
        }
    }
}

impl From<SrmResult> for TestResult {
    fn from(result: SrmResult) -> Self {
        Self::Srm(result)
    }
}

impl From<ZTestResult> for TestResult {
    fn from(result: ZTestResult) -> Self {
        Self::ZTest(result)
    }
}

impl From<BayesianResult> for TestResult {
    fn from(result: BayesianResult) -> Self {
        Self::Bayesian(result)
    }
}

impl From<SegmentAnalysis> for TestResult {
    fn from(result: SegmentAnalysis) -> Self {
        Self::Segment(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn z_result(control_rate: f64, relative_uplift: Option<f64>) -> ZTestResult {
        ZTestResult {
            counts: AggregateCounts::from_parts(100, 0, 100, 5).unwrap(),
            control_rate,
            treatment_rate: 0.05,
            difference: 0.05 - control_rate,
            relative_uplift,
            z_statistic: 2.3,
            p_value: 0.02,
            ci_lower: 0.01,
            ci_upper: 0.09,
            alpha: 0.05,
            sidedness: Sidedness::TwoSided,
            significant: true,
            winner: Some(Variant::Treatment),
            achieved_power: 0.6,
            warnings: vec![Warning::UndefinedRelativeUplift],
        }
    }

    mod z_test_result_tests {
        use super::*;

        #[test]
        fn test_require_relative_uplift_missing() {
            let result = z_result(0.0, None);
            let err = result.require_relative_uplift().unwrap_err();
            assert_eq!(err.subject(), Some("relative_uplift"));
        }

        #[test]
        fn test_require_relative_uplift_present() {
            let result = z_result(0.04, Some(0.25));
            assert_eq!(result.require_relative_uplift().unwrap(), 0.25);
        }

        #[test]
        fn test_interval_excludes_zero() {
            let mut result = z_result(0.04, Some(0.25));
            assert!(result.interval_excludes_zero());
            result.ci_lower = -0.01;
            assert!(!result.interval_excludes_zero());
        }
    }

    mod test_result_tests {
        use super::*;

        #[test]
        fn test_tagged_serialization() {
            let result = TestResult::from(z_result(0.0, None));
            let json = serde_json::to_value(&result).unwrap();
            assert_eq!(json["kind"], "z_test");
            assert_eq!(json["warnings"][0]["kind"], "undefined_relative_uplift");
        }

        #[test]
        fn test_decision_and_warnings() {
            let result = TestResult::from(z_result(0.0, None));
            assert!(result.decision());
            assert_eq!(result.warnings().len(), 1);
        }

        #[test]
        fn test_segment_warnings_flattened() {
            let estimate = SegmentEstimate::from(z_result(0.0, None));
            let analysis = SegmentAnalysis {
                attribute: "device".to_string(),
                order: SegmentOrder::default(),
                total_observations: 200,
                segments: vec![
                    SegmentResult {
                        segment: Some("mobile".to_string()),
                        counts: AggregateCounts::default(),
                        outcome: SegmentOutcome::Evaluated(estimate),
                    },
                    SegmentResult {
                        segment: None,
                        counts: AggregateCounts::default(),
                        outcome: SegmentOutcome::Failed {
                            error: DomainError::insufficient_data("empty arm"),
                        },
                    },
                ],
            };

            assert_eq!(analysis.significant_segments().count(), 1);
            assert_eq!(analysis.failed_segments().count(), 1);

            let result = TestResult::from(analysis);
            assert!(result.decision());
            assert_eq!(result.warnings().len(), 1);

            let json = serde_json::to_value(&result).unwrap();
            assert_eq!(json["segments"][0]["outcome"]["status"], "evaluated");
            assert_eq!(json["segments"][1]["outcome"]["status"], "failed");
            assert_eq!(
                json["segments"][1]["outcome"]["error"]["kind"],
                "insufficient_data"
            );
        }
    }

    #[test]
    fn test_beta_params_mean() {
        let params = BetaParams {
            alpha: 3.0,
            beta: 7.0,
        };
        assert!((params.mean() - 0.3).abs() < 1e-12);
        assert_eq!(BetaParams::default().mean(), 0.5);
    }

    #[test]
    fn test_recommendation_variant() {
        assert_eq!(Recommendation::Treatment.variant(), Some(Variant::Treatment));
        assert_eq!(Recommendation::Inconclusive.variant(), None);
    }
}
