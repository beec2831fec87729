//! Report command - full experiment readout with verdict

use clap::Args;

use super::common::{bootstrap, read_json, write_json, CommonArgs, CountsArgs, CountsSource};
use crate::infrastructure::services::{AnalysisService, ReportOptions};

/// Arguments for the report command
#[derive(Args, Clone, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub counts: CountsArgs,

    /// Average order value for the revenue projection
    #[arg(long)]
    pub aov: Option<f64>,

    /// Monthly visitors for the revenue projection
    #[arg(long)]
    pub monthly_visitors: Option<u64>,
}

/// Run the report command
pub fn run(common: &CommonArgs, args: ReportArgs) -> anyhow::Result<()> {
    let config = bootstrap(common)?;
    let service = AnalysisService::from_config(&config.analysis)?;

    let options = ReportOptions {
        avg_order_value: args.aov,
        monthly_visitors: args.monthly_visitors,
    };

    // Observations carry revenue; aggregates do not
    let report = match &args.counts.input {
        Some(path) => match read_json::<CountsSource>(path)? {
            CountsSource::Observations(observations) => {
                service.report_from_observations(&observations, options)?
            }
            CountsSource::Counts(counts) => service.report(&counts, None, options)?,
        },
        None => service.report(&args.counts.resolve()?, None, options)?,
    };

    write_json(&report, common.compact)
}
