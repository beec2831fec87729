//! Two-proportion z-test

use tracing::{debug, warn};

use super::distribution::{critical_z, normal_sf};
use super::effect_size::{cohens_h, effective_n, normal_power};
use crate::domain::experiment::{
    validate_open_unit, AggregateCounts, Sidedness, Variant, Warning, ZTestResult,
};
use crate::domain::DomainError;

/// Default significance level
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Frequentist tester for control/treatment conversion rates
///
/// The pooled standard error drives the test statistic; the unpooled one
/// drives the confidence interval for the difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequentistTester {
    alpha: f64,
    sidedness: Sidedness,
    planned_per_arm: Option<u64>,
}

impl Default for FrequentistTester {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            sidedness: Sidedness::TwoSided,
            planned_per_arm: None,
        }
    }
}

impl FrequentistTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_sidedness(mut self, sidedness: Sidedness) -> Self {
        self.sidedness = sidedness;
        self
    }

    /// Per-arm sample size the experiment was planned for
    ///
    /// Significant results reached before this size carry an early-stopping
    /// warning.
    pub fn with_planned_sample_size(mut self, per_arm: u64) -> Self {
        self.planned_per_arm = Some(per_arm);
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn sidedness(&self) -> Sidedness {
        self.sidedness
    }

    /// Test raw `(n, conversions)` pairs
    pub fn test_raw(
        &self,
        control_n: u64,
        control_conversions: u64,
        treatment_n: u64,
        treatment_conversions: u64,
    ) -> Result<ZTestResult, DomainError> {
        let counts = AggregateCounts::from_parts(
            control_n,
            control_conversions,
            treatment_n,
            treatment_conversions,
        )?;
        self.test(&counts)
    }

    /// Run the z-test on aggregate counts
    pub fn test(&self, counts: &AggregateCounts) -> Result<ZTestResult, DomainError> {
        let alpha = validate_open_unit("alpha", self.alpha)?;

        let (p1, n1) = arm_rate(counts, Variant::Control)?;
        let (p2, n2) = arm_rate(counts, Variant::Treatment)?;

        let pooled = (counts.control.conversions() + counts.treatment.conversions()) as f64
            / (n1 + n2) as f64;
        let pooled_se = (pooled * (1.0 - pooled) * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
        if pooled_se == 0.0 || !pooled_se.is_finite() {
            return Err(DomainError::numerical_instability(
                "pooled_standard_error",
                format!("pooled conversion rate {pooled} leaves no variance to test against"),
            ));
        }

        let difference = p2 - p1;
        let z_statistic = difference / pooled_se;
        let p_value = match self.sidedness {
            Sidedness::OneSided => normal_sf(z_statistic)?,
            Sidedness::TwoSided => (2.0 * normal_sf(z_statistic.abs())?).min(1.0),
        };

        let unpooled_se =
            (p1 * (1.0 - p1) / n1 as f64 + p2 * (1.0 - p2) / n2 as f64).sqrt();
        let margin = critical_z(alpha, self.sidedness)? * unpooled_se;

        let significant = p_value < alpha;
        let winner = match (significant, difference) {
            (true, d) if d > 0.0 => Some(Variant::Treatment),
            (true, d) if d < 0.0 => Some(Variant::Control),
            _ => None,
        };

        let mut warnings = Vec::new();

        let relative_uplift = if p1 > 0.0 {
            Some(difference / p1)
        } else {
            warnings.push(Warning::UndefinedRelativeUplift);
            None
        };

        let achieved_power = normal_power(
            cohens_h(p1, p2),
            effective_n(n1, n2),
            alpha,
            self.sidedness,
        )?;

        if let Some(planned) = self.planned_per_arm {
            let realized = counts.smallest_arm();
            if significant && realized < planned {
                warn!(realized, planned, p_value, "Significant before planned sample size");
                warnings.push(Warning::EarlyStoppingRisk { realized, planned });
            }
        }

        debug!(
            control_rate = p1,
            treatment_rate = p2,
            z_statistic,
            p_value,
            significant,
            "Computed two-proportion z-test"
        );

        Ok(ZTestResult {
            counts: *counts,
            control_rate: p1,
            treatment_rate: p2,
            difference,
            relative_uplift,
            z_statistic,
            p_value,
            ci_lower: difference - margin,
            ci_upper: difference + margin,
            alpha,
            sidedness: self.sidedness,
            significant,
            winner,
            achieved_power,
            warnings,
        })
    }
}

fn arm_rate(counts: &AggregateCounts, variant: Variant) -> Result<(f64, u64), DomainError> {
    let arm = counts.get(variant);
    match arm.rate() {
        Some(rate) => Ok((rate, arm.n())),
        None => Err(DomainError::insufficient_data(format!(
            "{variant} arm has no trials"
        ))),
    }
}
