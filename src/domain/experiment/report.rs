//! Business-facing summary built on top of the statistical results

use serde::{Deserialize, Serialize};

use super::counts::AggregateCounts;
use super::observation::{ExperimentObservation, Variant};
use super::result::{BayesianResult, SrmResult, ZTestResult};
use super::validation::validate_non_negative;
use crate::domain::DomainError;

// ============================================================================
// Verdict
// ============================================================================

/// Deployment recommendation for the experiment as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Treatment is significantly better
    Ship,
    /// Treatment is significantly worse
    DoNotShip,
    /// No significant difference yet
    KeepTesting,
    /// Allocation is broken; the comparison cannot be trusted
    InvestigateRandomization,
}

impl Verdict {
    /// Combine the integrity gate with the hypothesis test
    pub fn decide(srm: &SrmResult, z_test: &ZTestResult) -> Self {
        if srm.srm_detected {
            return Self::InvestigateRandomization;
        }

        match (z_test.significant, z_test.winner) {
            (true, Some(Variant::Treatment)) => Self::Ship,
            (true, Some(Variant::Control)) => Self::DoNotShip,
            _ => Self::KeepTesting,
        }
    }
}

// ============================================================================
// Revenue
// ============================================================================

/// Revenue observed per variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantRevenue {
    pub units: u64,
    pub converters: u64,
    pub total_revenue: f64,
    /// Mean revenue across converted units
    pub avg_order_value: Option<f64>,
    /// Mean revenue across all units
    pub revenue_per_unit: Option<f64>,
}

impl VariantRevenue {
    fn record(&mut self, observation: &ExperimentObservation) {
        self.units += 1;
        if observation.converted() {
            self.converters += 1;
            self.total_revenue += observation.revenue().unwrap_or(0.0);
        }
    }

    fn finish(mut self) -> Self {
        if self.converters > 0 {
            self.avg_order_value = Some(self.total_revenue / self.converters as f64);
        }
        if self.units > 0 {
            self.revenue_per_unit = Some(self.total_revenue / self.units as f64);
        }
        self
    }
}

/// Revenue figures derived from the optional per-unit revenue field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub control: VariantRevenue,
    pub treatment: VariantRevenue,
}

impl RevenueSummary {
    pub fn from_observations<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = &'a ExperimentObservation>,
    {
        let mut summary = Self::default();
        for observation in observations {
            match observation.variant() {
                Variant::Control => summary.control.record(observation),
                Variant::Treatment => summary.treatment.record(observation),
            }
        }
        summary.control = summary.control.finish();
        summary.treatment = summary.treatment.finish();
        summary
    }

    /// Average order value across both variants' converters
    pub fn pooled_avg_order_value(&self) -> Option<f64> {
        let converters = self.control.converters + self.treatment.converters;
        if converters == 0 {
            None
        } else {
            Some((self.control.total_revenue + self.treatment.total_revenue) / converters as f64)
        }
    }
}

/// Projected monthly and annual revenue if treatment ships
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenueImpact {
    pub avg_order_value: f64,
    pub monthly_visitors: u64,
    pub baseline_monthly: f64,
    pub treatment_monthly: f64,
    pub monthly_uplift: f64,
    pub annual_uplift: f64,
}

impl RevenueImpact {
    pub fn project(
        control_rate: f64,
        treatment_rate: f64,
        avg_order_value: f64,
        monthly_visitors: u64,
    ) -> Result<Self, DomainError> {
        validate_rate("control_rate", control_rate)?;
        validate_rate("treatment_rate", treatment_rate)?;
        validate_non_negative("avg_order_value", avg_order_value)?;

        let visitors = monthly_visitors as f64;
        let baseline_monthly = control_rate * visitors * avg_order_value;
        let treatment_monthly = treatment_rate * visitors * avg_order_value;
        let monthly_uplift = treatment_monthly - baseline_monthly;

        Ok(Self {
            avg_order_value,
            monthly_visitors,
            baseline_monthly,
            treatment_monthly,
            monthly_uplift,
            annual_uplift: monthly_uplift * 12.0,
        })
    }
}

fn validate_rate(name: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(DomainError::invalid_parameter(name, value, "must lie in [0, 1]"));
    }
    Ok(())
}

// ============================================================================
// ExperimentReport
// ============================================================================

/// Everything the reporting layer needs for one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub counts: AggregateCounts,
    pub srm: SrmResult,
    pub z_test: ZTestResult,
    pub bayesian: BayesianResult,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<RevenueSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_impact: Option<RevenueImpact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod revenue_impact_tests {
        use super::*;

        #[test]
        fn test_projection() {
            let impact = RevenueImpact::project(0.10, 0.12, 50.0, 100_000).unwrap();
            assert!((impact.baseline_monthly - 500_000.0).abs() < 1e-6);
            assert!((impact.treatment_monthly - 600_000.0).abs() < 1e-6);
            assert!((impact.monthly_uplift - 100_000.0).abs() < 1e-6);
            assert!((impact.annual_uplift - 1_200_000.0).abs() < 1e-6);
        }

        #[test]
        fn test_negative_uplift() {
            let impact = RevenueImpact::project(0.12, 0.10, 10.0, 1_000).unwrap();
            assert!(impact.monthly_uplift < 0.0);
        }

        #[test]
        fn test_invalid_inputs() {
            assert!(RevenueImpact::project(1.2, 0.1, 10.0, 10).is_err());
            assert!(RevenueImpact::project(0.1, 0.1, -10.0, 10).is_err());
        }
    }

    mod revenue_summary_tests {
        use super::*;

        #[test]
        fn test_summary_from_observations() {
            let observations = vec![
                ExperimentObservation::new("a", Variant::Control, true)
                    .with_revenue(80.0)
                    .unwrap(),
                ExperimentObservation::new("b", Variant::Control, false),
                ExperimentObservation::new("c", Variant::Treatment, true)
                    .with_revenue(100.0)
                    .unwrap(),
                ExperimentObservation::new("d", Variant::Treatment, true)
                    .with_revenue(60.0)
                    .unwrap(),
            ];

            let summary = RevenueSummary::from_observations(&observations);

            assert_eq!(summary.control.units, 2);
            assert_eq!(summary.control.avg_order_value, Some(80.0));
            assert_eq!(summary.control.revenue_per_unit, Some(40.0));
            assert_eq!(summary.treatment.avg_order_value, Some(80.0));
            assert_eq!(summary.pooled_avg_order_value(), Some(80.0));
        }

        #[test]
        fn test_summary_without_converters() {
            let observations = vec![ExperimentObservation::new("a", Variant::Control, false)];
            let summary = RevenueSummary::from_observations(&observations);
            assert_eq!(summary.control.avg_order_value, None);
            assert_eq!(summary.treatment.revenue_per_unit, None);
            assert_eq!(summary.pooled_avg_order_value(), None);
        }
    }
}
