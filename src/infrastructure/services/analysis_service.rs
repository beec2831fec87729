//! Analysis service for two-variant experiments
//!
//! Wires the statistical components together from configuration and
//! assembles the experiment report: allocation check, frequentist test,
//! Bayesian comparison, verdict and optional revenue projection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::domain::experiment::{
    AggregateCounts, BayesianResult, ExperimentObservation, ExperimentReport, MdeMode,
    RevenueImpact, RevenueSummary, SampleSizeResult, SegmentAnalysis, SensitivityPoint,
    SrmResult, Timeline, Verdict, ZTestResult,
};
use crate::domain::DomainError;
use crate::infrastructure::statistics::{
    BayesianTester, FrequentistTester, SampleSizeCalculator, SegmentAnalyzer, SrmValidator,
};

// ============================================================================
// Request Types
// ============================================================================

/// Inputs for planning a new experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub baseline_rate: f64,
    pub mde: f64,
    #[serde(default)]
    pub mde_mode: MdeMode,
    /// Treatment units per control unit
    #[serde(default)]
    pub allocation_ratio: Option<f64>,
    /// Expected eligible units per day, enables the timeline
    #[serde(default)]
    pub daily_traffic: Option<u64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Extra MDEs to evaluate for the sensitivity curve
    #[serde(default)]
    pub sensitivity_mdes: Vec<f64>,
}

/// Planning output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentPlan {
    pub sample_size: SampleSizeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sensitivity: Vec<SensitivityPoint>,
}

/// Business inputs for the revenue projection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Overrides the average order value derived from observations
    pub avg_order_value: Option<f64>,
    pub monthly_visitors: Option<u64>,
}

// ============================================================================
// Analysis Service
// ============================================================================

/// Service running every analysis with one shared configuration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisService {
    calculator: SampleSizeCalculator,
    srm: SrmValidator,
    frequentist: FrequentistTester,
    bayesian: BayesianTester,
    segments: SegmentAnalyzer,
}

impl AnalysisService {
    /// Build every component from validated configuration
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let calculator = SampleSizeCalculator::new()
            .with_alpha(config.alpha)
            .with_power(config.power)
            .with_sidedness(config.sidedness);

        let srm = SrmValidator::new()
            .with_threshold(config.srm_threshold)
            .with_treatment_share(config.treatment_share);

        let mut frequentist = FrequentistTester::new()
            .with_alpha(config.alpha)
            .with_sidedness(config.sidedness);
        if let Some(planned) = config.planned_sample_size {
            frequentist = frequentist.with_planned_sample_size(planned);
        }

        let bayesian = BayesianTester::new()
            .with_prior(config.prior_alpha, config.prior_beta)
            .with_draws(config.draws)
            .with_optional_seed(config.seed)
            .with_loss_tolerance(config.loss_tolerance)
            .with_credible_percentiles(config.credible_lower, config.credible_upper)
            .with_reliability_floor(config.reliability_floor);

        let segments = SegmentAnalyzer::new()
            .with_tester(frequentist)
            .with_reliability_floor(config.reliability_floor)
            .with_order(config.segment_order);

        debug!(
            alpha = config.alpha,
            srm_threshold = config.srm_threshold,
            draws = config.draws,
            seeded = config.seed.is_some(),
            "Analysis service configured"
        );

        Ok(Self {
            calculator,
            srm,
            frequentist,
            bayesian,
            segments,
        })
    }

    /// Sample size, optional timeline and sensitivity curve
    pub fn plan(&self, request: &PlanRequest) -> Result<ExperimentPlan, DomainError> {
        let mut calculator = self.calculator.with_mde_mode(request.mde_mode);
        if let Some(ratio) = request.allocation_ratio {
            calculator = calculator.with_allocation_ratio(ratio);
        }

        let sample_size = calculator.required_sample_size(request.baseline_rate, request.mde)?;

        let timeline = match request.daily_traffic {
            Some(daily_traffic) => Some(SampleSizeCalculator::timeline(
                sample_size.total,
                daily_traffic,
                request.start_date,
            )?),
            None => None,
        };

        let sensitivity = calculator.sensitivity(request.baseline_rate, &request.sensitivity_mdes)?;

        info!(
            baseline_rate = request.baseline_rate,
            n_control = sample_size.n_control,
            n_treatment = sample_size.n_treatment,
            days = timeline.as_ref().map(|t| t.days),
            "Experiment planned"
        );

        Ok(ExperimentPlan {
            sample_size,
            timeline,
            sensitivity,
        })
    }

    pub fn check_allocation(&self, counts: &AggregateCounts) -> Result<SrmResult, DomainError> {
        self.srm.validate(counts)
    }

    pub fn z_test(&self, counts: &AggregateCounts) -> Result<ZTestResult, DomainError> {
        self.frequentist.test(counts)
    }

    pub fn bayesian(&self, counts: &AggregateCounts) -> Result<BayesianResult, DomainError> {
        self.bayesian.test(counts)
    }

    pub fn segments(
        &self,
        observations: &[ExperimentObservation],
        attribute: &str,
    ) -> Result<SegmentAnalysis, DomainError> {
        self.segments.analyze(observations, attribute)
    }

    /// Full report from unit-level observations
    ///
    /// Revenue recorded on the observations supplies the average order value
    /// unless `options` overrides it.
    pub fn report_from_observations(
        &self,
        observations: &[ExperimentObservation],
        options: ReportOptions,
    ) -> Result<ExperimentReport, DomainError> {
        let counts = AggregateCounts::from_observations(observations)?;
        let revenue = observations
            .iter()
            .any(|o| o.revenue().is_some())
            .then(|| RevenueSummary::from_observations(observations));

        self.report(&counts, revenue, options)
    }

    /// Full report from aggregate counts
    pub fn report(
        &self,
        counts: &AggregateCounts,
        revenue: Option<RevenueSummary>,
        options: ReportOptions,
    ) -> Result<ExperimentReport, DomainError> {
        let srm = self.srm.validate(counts)?;
        if srm.srm_detected {
            warn!(
                p_value = srm.p_value,
                "Allocation mismatch; treat the comparison below with suspicion"
            );
        }

        let z_test = self.frequentist.test(counts)?;
        let bayesian = self.bayesian.test(counts)?;
        let verdict = Verdict::decide(&srm, &z_test);

        let avg_order_value = options
            .avg_order_value
            .or_else(|| revenue.as_ref().and_then(RevenueSummary::pooled_avg_order_value));

        let revenue_impact = match (avg_order_value, options.monthly_visitors) {
            (Some(aov), Some(visitors)) => Some(RevenueImpact::project(
                z_test.control_rate,
                z_test.treatment_rate,
                aov,
                visitors,
            )?),
            _ => None,
        };

        info!(
            ?verdict,
            p_value = z_test.p_value,
            prob_treatment_better = bayesian.prob_treatment_better,
            srm_detected = srm.srm_detected,
            "Experiment report assembled"
        );

        Ok(ExperimentReport {
            counts: *counts,
            srm,
            z_test,
            bayesian,
            verdict,
            revenue,
            revenue_impact,
        })
    }
}
