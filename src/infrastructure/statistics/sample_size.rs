//! Sample size, sensitivity and duration planning for two-proportion tests

use chrono::{Days, NaiveDate};
use tracing::debug;

use super::distribution::{critical_z, normal_quantile};
use super::effect_size::cohens_h;
use super::frequentist::DEFAULT_ALPHA;
use crate::domain::experiment::{
    validate_open_unit, validate_positive, MdeMode, SampleSizeResult, SensitivityPoint, Sidedness,
    Timeline, Warning,
};
use crate::domain::DomainError;

/// Default target power
pub const DEFAULT_POWER: f64 = 0.80;

/// Experiments shorter than this miss a full weekly cycle
pub const MIN_RECOMMENDED_DAYS: u64 = 7;

/// Experiments longer than this should reconsider their MDE or traffic
pub const MAX_RECOMMENDED_DAYS: u64 = 60;

/// Planner for the per-variant sample size of a two-proportion test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSizeCalculator {
    alpha: f64,
    power: f64,
    sidedness: Sidedness,
    allocation_ratio: f64,
    mde_mode: MdeMode,
}

impl Default for SampleSizeCalculator {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            power: DEFAULT_POWER,
            sidedness: Sidedness::TwoSided,
            allocation_ratio: 1.0,
            mde_mode: MdeMode::Absolute,
        }
    }
}

impl SampleSizeCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_sidedness(mut self, sidedness: Sidedness) -> Self {
        self.sidedness = sidedness;
        self
    }

    /// Treatment units per control unit (1.0 = even split)
    pub fn with_allocation_ratio(mut self, ratio: f64) -> Self {
        self.allocation_ratio = ratio;
        self
    }

    pub fn with_mde_mode(mut self, mode: MdeMode) -> Self {
        self.mde_mode = mode;
        self
    }

    /// Required sample size to detect `mde` over `baseline_rate`
    pub fn required_sample_size(
        &self,
        baseline_rate: f64,
        mde: f64,
    ) -> Result<SampleSizeResult, DomainError> {
        let p1 = validate_open_unit("baseline_rate", baseline_rate)?;
        validate_positive("mde", mde)?;
        validate_open_unit("alpha", self.alpha)?;
        validate_open_unit("power", self.power)?;
        let ratio = validate_positive("allocation_ratio", self.allocation_ratio)?;

        let p2 = self.mde_mode.treatment_rate(p1, mde);
        if !p2.is_finite() || p2 <= 0.0 || p2 >= 1.0 {
            return Err(DomainError::invalid_parameter(
                "mde",
                mde,
                format!("implied treatment rate {p2} must lie strictly between 0 and 1"),
            ));
        }

        let z_alpha = critical_z(self.alpha, self.sidedness)?;
        let z_beta = normal_quantile(self.power)?;
        let delta = p2 - p1;

        let variance = p1 * (1.0 - p1) + p2 * (1.0 - p2) / ratio;
        let raw = (z_alpha + z_beta).powi(2) * variance / delta.powi(2);
        if !raw.is_finite() {
            return Err(DomainError::numerical_instability(
                "required_sample_size",
                format!("sample size is not finite for effect {delta}"),
            ));
        }

        let n_control = to_count(raw.ceil())?;
        let n_treatment = to_count((n_control as f64 * ratio).ceil())?;
        let total = n_control.checked_add(n_treatment).ok_or_else(|| {
            DomainError::numerical_instability(
                "required_sample_size",
                format!("total of {n_control} and {n_treatment} overflows"),
            )
        })?;

        debug!(
            baseline_rate = p1,
            treatment_rate = p2,
            n_control,
            n_treatment,
            "Computed required sample size"
        );

        Ok(SampleSizeResult {
            baseline_rate: p1,
            treatment_rate: p2,
            absolute_mde: delta,
            relative_mde: delta / p1,
            effect_size: cohens_h(p1, p2),
            alpha: self.alpha,
            power: self.power,
            sidedness: self.sidedness,
            allocation_ratio: ratio,
            n_control,
            n_treatment,
            total,
        })
    }

    /// Required sample size for each MDE in `mdes`, in input order
    pub fn sensitivity(
        &self,
        baseline_rate: f64,
        mdes: &[f64],
    ) -> Result<Vec<SensitivityPoint>, DomainError> {
        mdes.iter()
            .map(|&mde| {
                let result = self.required_sample_size(baseline_rate, mde)?;
                Ok(SensitivityPoint {
                    mde,
                    n_per_variant: result.n_control,
                    total: result.total,
                })
            })
            .collect()
    }

    /// Days needed to enrol `required_total` units at `daily_traffic` per day
    pub fn timeline(
        required_total: u64,
        daily_traffic: u64,
        start: Option<NaiveDate>,
    ) -> Result<Timeline, DomainError> {
        if daily_traffic == 0 {
            return Err(DomainError::invalid_parameter(
                "daily_traffic",
                daily_traffic,
                "must be greater than 0",
            ));
        }

        let days = required_total.div_ceil(daily_traffic);

        let mut warnings = Vec::new();
        if days < MIN_RECOMMENDED_DAYS {
            warnings.push(Warning::ShortExperiment { days });
        } else if days > MAX_RECOMMENDED_DAYS {
            warnings.push(Warning::LongExperiment { days });
        }

        let estimated_end = match start {
            Some(date) => Some(date.checked_add_days(Days::new(days)).ok_or_else(|| {
                DomainError::invalid_parameter(
                    "start_date",
                    date,
                    format!("adding {days} days overflows the calendar"),
                )
            })?),
            None => None,
        };

        Ok(Timeline {
            required_total,
            daily_traffic,
            days,
            weeks: days as f64 / 7.0,
            estimated_end,
            warnings,
        })
    }
}

fn to_count(value: f64) -> Result<u64, DomainError> {
    if !value.is_finite() || value >= u64::MAX as f64 {
        return Err(DomainError::numerical_instability(
            "required_sample_size",
            format!("sample size {value} exceeds the representable range"),
        ));
    }
    Ok(value as u64)
}
