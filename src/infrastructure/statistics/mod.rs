//! Statistical components for two-variant experiments
//!
//! Each component is a small `Copy` configuration value with builder-style
//! setters; every operation is a pure function of its inputs (plus the seed
//! for the Bayesian tester).

pub mod bayesian;
pub mod distribution;
pub mod effect_size;
pub mod frequentist;
pub mod sample_size;
pub mod segment;
pub mod srm;

pub use bayesian::{percentile, BayesianTester};
pub use effect_size::{cohens_h, effective_n, normal_power};
pub use frequentist::{FrequentistTester, DEFAULT_ALPHA};
pub use sample_size::{SampleSizeCalculator, DEFAULT_POWER};
pub use segment::{SegmentAnalyzer, DEFAULT_RELIABILITY_FLOOR};
pub use srm::{goodness_of_fit, GoodnessOfFit, SrmValidator, DEFAULT_SRM_THRESHOLD};
