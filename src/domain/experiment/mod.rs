//! Experiment domain module for two-variant conversion tests
//!
//! This module provides the observation and count types consumed by the
//! statistical components, and the typed results they return.

mod counts;
mod observation;
mod params;
mod report;
mod result;
mod validation;

// Re-export all public types
pub use counts::{AggregateCounts, VariantCounts};
pub use observation::{ExperimentObservation, ObservationRecord, Variant};
pub use params::{MdeMode, SegmentOrder, Sidedness};
pub use report::{ExperimentReport, RevenueImpact, RevenueSummary, VariantRevenue, Verdict};
pub use result::{
    AllocationDiagnostic, BayesianResult, BetaParams, CredibleInterval, Recommendation,
    SampleSizeResult, SegmentAnalysis, SegmentEstimate, SegmentOutcome, SegmentResult,
    SensitivityPoint, SrmResult, TestResult, Timeline, Warning, ZTestResult,
};
pub use validation::{
    validate_counts, validate_non_negative, validate_open_unit, validate_percentiles,
    validate_positive, validate_unique_units,
};
