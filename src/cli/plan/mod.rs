//! Plan command - required sample size, duration and sensitivity curve

use chrono::NaiveDate;
use clap::Args;

use super::common::{bootstrap, write_json, CommonArgs};
use crate::domain::experiment::{MdeMode, Sidedness};
use crate::infrastructure::services::{AnalysisService, PlanRequest};

/// Arguments for the plan command
#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Baseline conversion rate, e.g. 0.05
    #[arg(long)]
    pub baseline: f64,

    /// Minimum detectable effect (absolute unless --relative)
    #[arg(long)]
    pub mde: f64,

    /// Interpret the MDE as a fraction of the baseline
    #[arg(long)]
    pub relative: bool,

    /// Target power (overrides config)
    #[arg(long)]
    pub power: Option<f64>,

    /// Plan a one-sided test
    #[arg(long)]
    pub one_sided: bool,

    /// Treatment units per control unit
    #[arg(long)]
    pub allocation_ratio: Option<f64>,

    /// Eligible units per day
    #[arg(long)]
    pub daily_traffic: Option<u64>,

    /// Launch date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Comma-separated MDEs for the sensitivity curve
    #[arg(long, value_delimiter = ',')]
    pub sensitivity: Vec<f64>,
}

impl PlanArgs {
    fn request(&self) -> PlanRequest {
        PlanRequest {
            baseline_rate: self.baseline,
            mde: self.mde,
            mde_mode: if self.relative {
                MdeMode::Relative
            } else {
                MdeMode::Absolute
            },
            allocation_ratio: self.allocation_ratio,
            daily_traffic: self.daily_traffic,
            start_date: self.start_date,
            sensitivity_mdes: self.sensitivity.clone(),
        }
    }
}

/// Run the plan command
pub fn run(common: &CommonArgs, args: PlanArgs) -> anyhow::Result<()> {
    let mut config = bootstrap(common)?;
    if let Some(power) = args.power {
        config.analysis.power = power;
    }
    if args.one_sided {
        config.analysis.sidedness = Sidedness::OneSided;
    }

    let service = AnalysisService::from_config(&config.analysis)?;
    let plan = service.plan(&args.request())?;

    write_json(&plan, common.compact)
}
