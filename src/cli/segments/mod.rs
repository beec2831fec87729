//! Segments command - per-segment z-tests over one attribute

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::info;

use super::common::{bootstrap, read_json, write_json, CommonArgs};
use crate::domain::experiment::{ExperimentObservation, SegmentOrder, TestResult};
use crate::infrastructure::services::AnalysisService;

/// Ordering of the segment table
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderArg {
    /// Largest combined sample size first
    SampleSize,
    /// Alphabetical by segment value
    Segment,
    /// Largest treatment-minus-control difference first
    Uplift,
}

impl From<OrderArg> for SegmentOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::SampleSize => Self::SampleSizeDescending,
            OrderArg::Segment => Self::SegmentAscending,
            OrderArg::Uplift => Self::UpliftDescending,
        }
    }
}

/// Arguments for the segments command
#[derive(Args, Clone, Debug)]
pub struct SegmentsArgs {
    /// JSON array of observations ("-" for stdin)
    #[arg(long, short)]
    pub input: PathBuf,

    /// Segment attribute to split on, e.g. "device"
    #[arg(long, short)]
    pub attribute: String,

    /// Row ordering (overrides config)
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,

    /// Smallest arm size considered reliable (overrides config)
    #[arg(long)]
    pub reliability_floor: Option<u64>,
}

/// Run the segments command
pub fn run(common: &CommonArgs, args: SegmentsArgs) -> anyhow::Result<()> {
    let mut config = bootstrap(common)?;
    if let Some(order) = args.order {
        config.analysis.segment_order = order.into();
    }
    if let Some(floor) = args.reliability_floor {
        config.analysis.reliability_floor = floor;
    }

    let observations: Vec<ExperimentObservation> = read_json(&args.input)?;
    let service = AnalysisService::from_config(&config.analysis)?;
    let analysis = service.segments(&observations, &args.attribute)?;

    info!(
        attribute = %analysis.attribute,
        segments = analysis.segments.len(),
        failed = analysis.failed_segments().count(),
        "Segment analysis complete"
    );

    write_json(&TestResult::from(analysis), common.compact)
}
