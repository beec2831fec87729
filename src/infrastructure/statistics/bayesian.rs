//! Beta-Binomial posterior comparison by Monte Carlo sampling

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use tracing::debug;

use super::segment::DEFAULT_RELIABILITY_FLOOR;
use crate::domain::experiment::{
    validate_percentiles, validate_positive, AggregateCounts, BayesianResult, BetaParams,
    CredibleInterval, Recommendation, VariantCounts, Warning,
};
use crate::domain::DomainError;

/// Default number of paired posterior draws
pub const DEFAULT_DRAWS: usize = 100_000;

/// Default expected-loss tolerance, in conversion-rate units
pub const DEFAULT_LOSS_TOLERANCE: f64 = 1e-4;

/// Default credible interval percentiles
pub const DEFAULT_LOWER_PERCENTILE: f64 = 2.5;
pub const DEFAULT_UPPER_PERCENTILE: f64 = 97.5;

/// Bayesian tester with independent Beta priors per variant
///
/// Without a seed every call draws from a freshly seeded generator, so
/// results are not reproducible. Set a seed for published reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BayesianTester {
    prior: BetaParams,
    draws: usize,
    seed: Option<u64>,
    lower_percentile: f64,
    upper_percentile: f64,
    loss_tolerance: f64,
    reliability_floor: u64,
}

impl Default for BayesianTester {
    fn default() -> Self {
        Self {
            prior: BetaParams::default(),
            draws: DEFAULT_DRAWS,
            seed: None,
            lower_percentile: DEFAULT_LOWER_PERCENTILE,
            upper_percentile: DEFAULT_UPPER_PERCENTILE,
            loss_tolerance: DEFAULT_LOSS_TOLERANCE,
            reliability_floor: DEFAULT_RELIABILITY_FLOOR,
        }
    }
}

impl BayesianTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prior(mut self, alpha: f64, beta: f64) -> Self {
        self.prior = BetaParams { alpha, beta };
        self
    }

    pub fn with_draws(mut self, draws: usize) -> Self {
        self.draws = draws;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed or clear the seed; `None` makes runs non-reproducible
    pub fn with_optional_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_credible_percentiles(mut self, lower: f64, upper: f64) -> Self {
        self.lower_percentile = lower;
        self.upper_percentile = upper;
        self
    }

    pub fn with_loss_tolerance(mut self, tolerance: f64) -> Self {
        self.loss_tolerance = tolerance;
        self
    }

    pub fn with_reliability_floor(mut self, floor: u64) -> Self {
        self.reliability_floor = floor;
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        validate_positive("prior_alpha", self.prior.alpha)?;
        validate_positive("prior_beta", self.prior.beta)?;
        validate_positive("loss_tolerance", self.loss_tolerance)?;
        validate_percentiles(self.lower_percentile, self.upper_percentile)?;
        if self.draws == 0 {
            return Err(DomainError::invalid_parameter(
                "draws",
                self.draws,
                "at least one posterior draw is required",
            ));
        }
        Ok(())
    }

    /// Test raw `(n, conversions)` pairs
    pub fn test_raw(
        &self,
        control_n: u64,
        control_conversions: u64,
        treatment_n: u64,
        treatment_conversions: u64,
    ) -> Result<BayesianResult, DomainError> {
        let counts = AggregateCounts::from_parts(
            control_n,
            control_conversions,
            treatment_n,
            treatment_conversions,
        )?;
        self.test(&counts)
    }

    /// Compare posteriors for aggregate counts
    ///
    /// Empty arms are valid: their posterior is the prior.
    pub fn test(&self, counts: &AggregateCounts) -> Result<BayesianResult, DomainError> {
        self.validate()?;

        let control_posterior = self.posterior(&counts.control);
        let treatment_posterior = self.posterior(&counts.treatment);
        let control_dist = beta_distribution("control_posterior", control_posterior)?;
        let treatment_dist = beta_distribution("treatment_posterior", treatment_posterior)?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut differences = Vec::with_capacity(self.draws);
        let mut uplifts = Vec::with_capacity(self.draws);
        let mut treatment_wins = 0usize;
        let mut loss_treatment = 0.0;
        let mut loss_control = 0.0;

        for _ in 0..self.draws {
            let control = control_dist.sample(&mut rng);
            let treatment = treatment_dist.sample(&mut rng);
            let difference = treatment - control;

            if treatment > control {
                treatment_wins += 1;
            }
            loss_treatment += (-difference).max(0.0);
            loss_control += difference.max(0.0);
            differences.push(difference);
            if control > 0.0 {
                uplifts.push(difference / control);
            }
        }

        if uplifts.is_empty() {
            return Err(DomainError::numerical_instability(
                "relative_uplift",
                "every control draw was zero",
            ));
        }

        differences.sort_unstable_by(f64::total_cmp);
        uplifts.sort_unstable_by(f64::total_cmp);

        let draws = self.draws as f64;
        let prob_treatment_better = treatment_wins as f64 / draws;
        let expected_loss_treatment = loss_treatment / draws;
        let expected_loss_control = loss_control / draws;

        let recommendation = self.recommend(expected_loss_treatment, expected_loss_control);

        let mut warnings = Vec::new();
        let smallest_arm = counts.smallest_arm();
        if smallest_arm < self.reliability_floor {
            warnings.push(Warning::LowSampleSize {
                smallest_arm,
                floor: self.reliability_floor,
            });
        }

        debug!(
            prob_treatment_better,
            expected_loss_treatment,
            expected_loss_control,
            ?recommendation,
            draws = self.draws,
            seeded = self.seed.is_some(),
            "Computed Bayesian posterior comparison"
        );

        Ok(BayesianResult {
            counts: *counts,
            prior: self.prior,
            control_posterior,
            treatment_posterior,
            posterior_mean_control: control_posterior.mean(),
            posterior_mean_treatment: treatment_posterior.mean(),
            prob_treatment_better,
            prob_control_better: 1.0 - prob_treatment_better,
            relative_uplift_interval: self.interval(&uplifts),
            difference_interval: self.interval(&differences),
            expected_loss_treatment,
            expected_loss_control,
            loss_tolerance: self.loss_tolerance,
            recommendation,
            draws: self.draws,
            seed: self.seed,
            warnings,
        })
    }

    fn posterior(&self, counts: &VariantCounts) -> BetaParams {
        BetaParams {
            alpha: self.prior.alpha + counts.conversions() as f64,
            beta: self.prior.beta + counts.failures() as f64,
        }
    }

    fn interval(&self, sorted: &[f64]) -> CredibleInterval {
        CredibleInterval {
            lower_percentile: self.lower_percentile,
            upper_percentile: self.upper_percentile,
            lower: percentile(sorted, self.lower_percentile),
            upper: percentile(sorted, self.upper_percentile),
        }
    }

    fn recommend(&self, loss_treatment: f64, loss_control: f64) -> Recommendation {
        let treatment_ok = loss_treatment < self.loss_tolerance;
        let control_ok = loss_control < self.loss_tolerance;

        match (treatment_ok, control_ok) {
            (true, true) if loss_control < loss_treatment => Recommendation::Control,
            (true, _) => Recommendation::Treatment,
            (false, true) => Recommendation::Control,
            (false, false) => Recommendation::Inconclusive,
        }
    }
}

fn beta_distribution(name: &str, params: BetaParams) -> Result<Beta<f64>, DomainError> {
    Beta::new(params.alpha, params.beta)
        .map_err(|e| DomainError::numerical_instability(name, e.to_string()))
}

/// Percentile of sorted data with linear interpolation between order statistics
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        len => {
            let rank = q / 100.0 * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}
