//! Z-test command - two-proportion test on conversion counts

use clap::Args;

use super::common::{bootstrap, write_json, CommonArgs, CountsArgs};
use crate::domain::experiment::{Sidedness, TestResult};
use crate::infrastructure::services::AnalysisService;

/// Arguments for the ztest command
#[derive(Args, Clone, Debug)]
pub struct ZTestArgs {
    #[command(flatten)]
    pub counts: CountsArgs,

    /// Test H1: treatment > control
    #[arg(long)]
    pub one_sided: bool,

    /// Planned units per arm, flags significance reached before it
    #[arg(long)]
    pub planned: Option<u64>,
}

/// Run the ztest command
pub fn run(common: &CommonArgs, args: ZTestArgs) -> anyhow::Result<()> {
    let mut config = bootstrap(common)?;
    if args.one_sided {
        config.analysis.sidedness = Sidedness::OneSided;
    }
    if args.planned.is_some() {
        config.analysis.planned_sample_size = args.planned;
    }

    let counts = args.counts.resolve()?;
    let service = AnalysisService::from_config(&config.analysis)?;
    let result = TestResult::from(service.z_test(&counts)?);

    write_json(&result, common.compact)
}
