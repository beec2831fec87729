//! Bayes command - Beta-Binomial posterior comparison

use clap::Args;

use super::common::{bootstrap, write_json, CommonArgs, CountsArgs};
use crate::domain::experiment::TestResult;
use crate::infrastructure::services::AnalysisService;

/// Arguments for the bayes command
#[derive(Args, Clone, Debug)]
pub struct BayesArgs {
    #[command(flatten)]
    pub counts: CountsArgs,

    /// Prior alpha shared by both variants (overrides config)
    #[arg(long)]
    pub prior_alpha: Option<f64>,

    /// Prior beta shared by both variants (overrides config)
    #[arg(long)]
    pub prior_beta: Option<f64>,

    /// Expected-loss tolerance for a recommendation (overrides config)
    #[arg(long)]
    pub loss_tolerance: Option<f64>,
}

/// Run the bayes command
pub fn run(common: &CommonArgs, args: BayesArgs) -> anyhow::Result<()> {
    let mut config = bootstrap(common)?;
    if let Some(alpha) = args.prior_alpha {
        config.analysis.prior_alpha = alpha;
    }
    if let Some(beta) = args.prior_beta {
        config.analysis.prior_beta = beta;
    }
    if let Some(tolerance) = args.loss_tolerance {
        config.analysis.loss_tolerance = tolerance;
    }

    let counts = args.counts.resolve()?;
    let service = AnalysisService::from_config(&config.analysis)?;
    let result = TestResult::from(service.bayesian(&counts)?);

    write_json(&result, common.compact)
}
