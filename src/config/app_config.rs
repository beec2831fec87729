use serde::{Deserialize, Serialize};

use crate::domain::experiment::{
    validate_open_unit, validate_percentiles, validate_positive, SegmentOrder, Sidedness,
};
use crate::domain::DomainError;
use crate::infrastructure::statistics::{
    DEFAULT_ALPHA, DEFAULT_POWER, DEFAULT_RELIABILITY_FLOOR, DEFAULT_SRM_THRESHOLD,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Defaults applied by every analysis the CLI runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub alpha: f64,
    pub power: f64,
    pub sidedness: Sidedness,
    pub srm_threshold: f64,
    /// Intended share of units in treatment
    pub treatment_share: f64,
    pub draws: usize,
    /// Monte Carlo seed; unset means non-reproducible runs
    pub seed: Option<u64>,
    pub loss_tolerance: f64,
    pub prior_alpha: f64,
    pub prior_beta: f64,
    pub credible_lower: f64,
    pub credible_upper: f64,
    pub reliability_floor: u64,
    /// Planned units per arm, enables the early-stopping warning
    pub planned_sample_size: Option<u64>,
    pub segment_order: SegmentOrder,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            power: DEFAULT_POWER,
            sidedness: Sidedness::TwoSided,
            srm_threshold: DEFAULT_SRM_THRESHOLD,
            treatment_share: 0.5,
            draws: 100_000,
            seed: None,
            loss_tolerance: 1e-4,
            prior_alpha: 1.0,
            prior_beta: 1.0,
            credible_lower: 2.5,
            credible_upper: 97.5,
            reliability_floor: DEFAULT_RELIABILITY_FLOOR,
            planned_sample_size: None,
            segment_order: SegmentOrder::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reject out-of-range settings before any analysis runs
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_open_unit("alpha", self.alpha)?;
        validate_open_unit("power", self.power)?;
        validate_open_unit("srm_threshold", self.srm_threshold)?;
        validate_open_unit("treatment_share", self.treatment_share)?;
        validate_positive("loss_tolerance", self.loss_tolerance)?;
        validate_positive("prior_alpha", self.prior_alpha)?;
        validate_positive("prior_beta", self.prior_beta)?;
        validate_percentiles(self.credible_lower, self.credible_upper)?;

        if self.draws == 0 {
            return Err(DomainError::invalid_parameter(
                "draws",
                self.draws,
                "at least one posterior draw is required",
            ));
        }
        if self.planned_sample_size == Some(0) {
            return Err(DomainError::invalid_parameter(
                "planned_sample_size",
                0,
                "must be greater than 0 when set",
            ));
        }

        Ok(())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("ABTEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
