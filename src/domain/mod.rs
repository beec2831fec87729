//! Domain layer - Experiment data model, results and errors

pub mod error;
pub mod experiment;

pub use error::DomainError;
pub use experiment::{
    AggregateCounts, BayesianResult, ExperimentObservation, ExperimentReport, SegmentAnalysis,
    SrmResult, TestResult, Variant, VariantCounts, ZTestResult,
};
