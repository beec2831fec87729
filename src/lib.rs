//! A/B experiment inference engine
//!
//! Statistical analysis for two-variant conversion experiments:
//! - Sample size and duration planning
//! - Sample ratio mismatch detection
//! - Two-proportion z-test with confidence intervals
//! - Bayesian Beta-Binomial comparison with expected loss
//! - Per-segment breakdowns
//! - Experiment reports with verdict and revenue projection

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use infrastructure::services::AnalysisService;
