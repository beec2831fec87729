//! CLI module for the experiment analysis engine
//!
//! Every subcommand reads JSON or inline counts and prints JSON:
//! - `plan`: sample size, duration and sensitivity
//! - `srm`: sample ratio mismatch check
//! - `ztest`: two-proportion z-test
//! - `bayes`: Bayesian posterior comparison
//! - `segments`: per-segment breakdown
//! - `report`: full readout with verdict and revenue projection

pub mod bayes;
pub mod common;
pub mod plan;
pub mod report;
pub mod segments;
pub mod srm;
pub mod ztest;

use clap::{Parser, Subcommand};

use common::CommonArgs;

/// Statistical analysis for two-variant conversion experiments
#[derive(Parser)]
#[command(name = "abtest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan sample size and duration
    Plan(plan::PlanArgs),

    /// Check the allocation for sample ratio mismatch
    Srm(srm::SrmArgs),

    /// Run the two-proportion z-test
    Ztest(ztest::ZTestArgs),

    /// Compare Beta posteriors by Monte Carlo
    Bayes(bayes::BayesArgs),

    /// Break results down by a segment attribute
    Segments(segments::SegmentsArgs),

    /// Produce the full experiment report
    Report(report::ReportArgs),
}

/// Dispatch the parsed command
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let common = cli.common;
    match cli.command {
        Command::Plan(args) => plan::run(&common, args),
        Command::Srm(args) => srm::run(&common, args),
        Command::Ztest(args) => ztest::run(&common, args),
        Command::Bayes(args) => bayes::run(&common, args),
        Command::Segments(args) => segments::run(&common, args),
        Command::Report(args) => report::run(&common, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::SegmentOrder;
    use clap::CommandFactory;
    use segments::OrderArg;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from([
            "abtest",
            "plan",
            "--baseline",
            "0.05",
            "--mde",
            "0.1",
            "--relative",
            "--sensitivity",
            "0.05,0.1,0.2",
            "--start-date",
            "2024-03-01",
        ])
        .unwrap();

        match cli.command {
            Command::Plan(args) => {
                assert!(args.relative);
                assert_eq!(args.sensitivity, vec![0.05, 0.1, 0.2]);
                assert!(args.start_date.is_some());
            }
            _ => panic!("expected plan"),
        }
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "abtest",
            "bayes",
            "--control-n",
            "100",
            "--control-conversions",
            "10",
            "--treatment-n",
            "100",
            "--seed",
            "7",
            "--compact",
        ])
        .unwrap();

        assert_eq!(cli.common.seed, Some(7));
        assert!(cli.common.compact);
        match cli.command {
            Command::Bayes(args) => {
                assert_eq!(args.counts.control_conversions, 10);
                assert_eq!(args.counts.treatment_conversions, 0);
            }
            _ => panic!("expected bayes"),
        }
    }

    #[test]
    fn test_input_conflicts_with_inline_counts() {
        let result = Cli::try_parse_from([
            "abtest",
            "ztest",
            "--input",
            "counts.json",
            "--control-n",
            "10",
            "--treatment-n",
            "10",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_segments_order() {
        let cli = Cli::try_parse_from([
            "abtest", "segments", "-i", "obs.json", "-a", "device", "--order", "uplift",
        ])
        .unwrap();
        match cli.command {
            Command::Segments(args) => {
                assert_eq!(args.order, Some(OrderArg::Uplift));
                assert_eq!(
                    SegmentOrder::from(OrderArg::Uplift),
                    SegmentOrder::UpliftDescending
                );
            }
            _ => panic!("expected segments"),
        }
    }
}
