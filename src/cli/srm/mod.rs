//! SRM command - checks the observed allocation against the intended split

use clap::Args;

use super::common::{bootstrap, write_json, CommonArgs, CountsArgs};
use crate::infrastructure::services::AnalysisService;

/// Arguments for the srm command
#[derive(Args, Clone, Debug)]
pub struct SrmArgs {
    #[command(flatten)]
    pub counts: CountsArgs,

    /// p-value below which a mismatch is flagged (overrides config)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Intended share of units in treatment (overrides config)
    #[arg(long)]
    pub treatment_share: Option<f64>,
}

/// Run the srm command
pub fn run(common: &CommonArgs, args: SrmArgs) -> anyhow::Result<()> {
    let mut config = bootstrap(common)?;
    if let Some(threshold) = args.threshold {
        config.analysis.srm_threshold = threshold;
    }
    if let Some(share) = args.treatment_share {
        config.analysis.treatment_share = share;
    }

    let counts = args.counts.resolve()?;
    let service = AnalysisService::from_config(&config.analysis)?;
    let result = service.check_allocation(&counts)?;

    write_json(&result, common.compact)
}
