//! Infrastructure services

mod analysis_service;

pub use analysis_service::{AnalysisService, ExperimentPlan, PlanRequest, ReportOptions};
