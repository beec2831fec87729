//! Sample ratio mismatch detection
//!
//! Chi-square goodness-of-fit of the observed allocation against the intended
//! split. SRM signals broken randomization or logging, so the default threshold
//! is stricter than the experiment's own alpha.

use tracing::{debug, warn};

use super::distribution::chi_square_sf;
use crate::domain::experiment::{
    validate_open_unit, AggregateCounts, AllocationDiagnostic, SrmResult, Variant, Warning,
};
use crate::domain::DomainError;

/// Default p-value below which an SRM is flagged
pub const DEFAULT_SRM_THRESHOLD: f64 = 0.01;

/// Default intended share of units in treatment
pub const DEFAULT_TREATMENT_SHARE: f64 = 0.5;

const RATIO_SUM_TOLERANCE: f64 = 1e-9;

/// Chi-square goodness-of-fit statistic
#[derive(Debug, Clone, PartialEq)]
pub struct GoodnessOfFit {
    pub total: u64,
    pub expected: Vec<f64>,
    pub chi_square: f64,
    pub degrees_of_freedom: u64,
    pub p_value: f64,
}

/// Goodness-of-fit of `observed` counts against expected `ratios`
///
/// `ratios` must be in (0, 1), match `observed` in length, and sum to 1.
pub fn goodness_of_fit(observed: &[u64], ratios: &[f64]) -> Result<GoodnessOfFit, DomainError> {
    if observed.len() != ratios.len() {
        return Err(DomainError::invalid_parameter(
            "ratios",
            ratios.len(),
            format!("expected one ratio per variant ({})", observed.len()),
        ));
    }
    if observed.len() < 2 {
        return Err(DomainError::invalid_parameter(
            "observed",
            observed.len(),
            "at least two variants are required",
        ));
    }
    for (i, &ratio) in ratios.iter().enumerate() {
        validate_open_unit(&format!("ratios[{i}]"), ratio)?;
    }
    let ratio_sum: f64 = ratios.iter().sum();
    if (ratio_sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
        return Err(DomainError::invalid_parameter(
            "ratios",
            ratio_sum,
            "allocation ratios must sum to 1",
        ));
    }

    let total: u64 = observed.iter().sum();
    if total == 0 {
        return Err(DomainError::insufficient_data(
            "no units observed in any variant",
        ));
    }

    let expected: Vec<f64> = ratios.iter().map(|r| total as f64 * r).collect();
    let chi_square = observed
        .iter()
        .zip(&expected)
        .map(|(&o, &e)| (o as f64 - e).powi(2) / e)
        .sum::<f64>();
    let degrees_of_freedom = (observed.len() - 1) as u64;
    let p_value = chi_square_sf(chi_square, degrees_of_freedom)?;

    Ok(GoodnessOfFit {
        total,
        expected,
        chi_square,
        degrees_of_freedom,
        p_value,
    })
}

/// Validator for the control/treatment allocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrmValidator {
    threshold: f64,
    treatment_share: f64,
}

impl Default for SrmValidator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SRM_THRESHOLD,
            treatment_share: DEFAULT_TREATMENT_SHARE,
        }
    }
}

impl SrmValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Intended fraction of units assigned to treatment
    pub fn with_treatment_share(mut self, share: f64) -> Self {
        self.treatment_share = share;
        self
    }

    /// Check the allocation of aggregate counts
    pub fn validate(&self, counts: &AggregateCounts) -> Result<SrmResult, DomainError> {
        self.validate_observed(counts.control.n(), counts.treatment.n())
    }

    /// Check raw per-variant unit counts
    pub fn validate_observed(
        &self,
        control_n: u64,
        treatment_n: u64,
    ) -> Result<SrmResult, DomainError> {
        validate_open_unit("threshold", self.threshold)?;
        let treatment_share = validate_open_unit("treatment_share", self.treatment_share)?;

        let variants = [Variant::Control, Variant::Treatment];
        let observed = [control_n, treatment_n];
        let ratios = [1.0 - treatment_share, treatment_share];

        let fit = goodness_of_fit(&observed, &ratios)?;

        let allocations = variants
            .iter()
            .zip(observed)
            .zip(ratios)
            .zip(&fit.expected)
            .map(|(((&variant, observed), expected_share), &expected)| AllocationDiagnostic {
                variant,
                observed,
                expected,
                expected_share,
                observed_share: observed as f64 / fit.total as f64,
                deviation_pct: (observed as f64 - expected) / expected * 100.0,
            })
            .collect();

        let srm_detected = fit.p_value < self.threshold;
        let mut warnings = Vec::new();
        if srm_detected {
            warn!(
                control_n,
                treatment_n,
                p_value = fit.p_value,
                threshold = self.threshold,
                "Sample ratio mismatch detected"
            );
            warnings.push(Warning::SampleRatioMismatch {
                p_value: fit.p_value,
                threshold: self.threshold,
            });
        } else {
            debug!(control_n, treatment_n, p_value = fit.p_value, "Allocation consistent");
        }

        Ok(SrmResult {
            total: fit.total,
            chi_square: fit.chi_square,
            degrees_of_freedom: fit.degrees_of_freedom,
            p_value: fit.p_value,
            threshold: self.threshold,
            srm_detected,
            allocations,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod goodness_of_fit_tests {
        use super::*;

        #[test]
        fn test_three_variants() {
            let fit = goodness_of_fit(&[100, 100, 100], &[0.25, 0.25, 0.5]).unwrap();
            assert_eq!(fit.degrees_of_freedom, 2);
            assert_eq!(fit.expected, vec![75.0, 75.0, 150.0]);
            assert!(fit.p_value < 0.001);
        }

        #[test]
        fn test_invalid_ratios() {
            assert!(goodness_of_fit(&[10, 10], &[0.5]).is_err());
            assert!(goodness_of_fit(&[10, 10], &[0.6, 0.6]).is_err());
            assert!(goodness_of_fit(&[10, 10], &[0.0, 1.0]).is_err());
            assert!(goodness_of_fit(&[10], &[1.0]).is_err());
        }

        #[test]
        fn test_zero_total() {
            let err = goodness_of_fit(&[0, 0], &[0.5, 0.5]).unwrap_err();
            assert!(matches!(err, DomainError::InsufficientData { .. }));
        }
    }

    mod srm_validator_tests {
        use super::*;

        #[test]
        fn test_exact_match_has_zero_statistic() {
            let result = SrmValidator::new().validate_observed(5_000, 5_000).unwrap();
            assert_eq!(result.chi_square, 0.0);
            assert_eq!(result.p_value, 1.0);
            assert!(!result.srm_detected);
            assert!(result.warnings.is_empty());
            assert!(result.allocations.iter().all(|a| a.deviation_pct == 0.0));
        }

        #[test]
        fn test_exact_match_uneven_split() {
            let result = SrmValidator::new()
                .with_treatment_share(0.2)
                .validate_observed(800, 200)
                .unwrap();
            assert!(result.chi_square.abs() < 1e-9);
            assert!((result.p_value - 1.0).abs() < 1e-9);
        }

        #[test]
        fn test_tenfold_inflation_flagged() {
            // Expected 950 / 50; treatment observed at 10x its expectation
            let result = SrmValidator::new()
                .with_treatment_share(0.05)
                .validate_observed(500, 500)
                .unwrap();

            assert!(result.srm_detected);
            assert!(result.p_value < DEFAULT_SRM_THRESHOLD);
            let treatment = &result.allocations[1];
            assert_eq!(treatment.variant, Variant::Treatment);
            assert!((treatment.deviation_pct - 900.0).abs() < 1e-9);
            assert!(matches!(
                result.warnings[0],
                Warning::SampleRatioMismatch { .. }
            ));
        }

        #[test]
        fn test_severe_mismatch() {
            let result = SrmValidator::new().validate_observed(700, 300).unwrap();
            assert!(result.srm_detected);
            assert!((result.chi_square - 160.0).abs() < 1e-9);
            assert!((result.allocations[0].observed_share - 0.7).abs() < 1e-12);
        }

        #[test]
        fn test_small_deviation_not_flagged() {
            let result = SrmValidator::new().validate_observed(5_030, 4_970).unwrap();
            assert!(!result.srm_detected);
            assert!(result.p_value > 0.5);
        }

        #[test]
        fn test_threshold_is_configurable() {
            // chi2 = 4.096 -> p ~ 0.043
            let strict = SrmValidator::new().validate_observed(532, 468).unwrap();
            let lenient = SrmValidator::new()
                .with_threshold(0.05)
                .validate_observed(532, 468)
                .unwrap();
            assert!(!strict.srm_detected);
            assert!(lenient.srm_detected);
        }

        #[test]
        fn test_zero_total_is_insufficient() {
            let err = SrmValidator::new().validate_observed(0, 0).unwrap_err();
            assert!(matches!(err, DomainError::InsufficientData { .. }));
        }

        #[test]
        fn test_validate_counts() {
            let counts = AggregateCounts::from_parts(1_000, 100, 1_000, 120).unwrap();
            let result = SrmValidator::new().validate(&counts).unwrap();
            assert_eq!(result.total, 2_000);
            assert!(!result.srm_detected);
        }
    }
}
