//! Shared plumbing for the analysis subcommands
//!
//! Configuration bootstrap, JSON input resolution and JSON output.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::domain::experiment::{AggregateCounts, ExperimentObservation};
use crate::domain::DomainError;
use crate::infrastructure::logging;

/// Options every subcommand accepts
#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    /// Significance level (overrides config)
    #[arg(long, global = true)]
    pub alpha: Option<f64>,

    /// Monte Carlo seed (overrides config)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Monte Carlo draws (overrides config)
    #[arg(long, global = true)]
    pub draws: Option<usize>,

    /// Print compact JSON instead of pretty-printed JSON
    #[arg(long, global = true)]
    pub compact: bool,
}

/// Load `.env`, configuration and logging, then apply command-line overrides
pub fn bootstrap(common: &CommonArgs) -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    if let Some(alpha) = common.alpha {
        config.analysis.alpha = alpha;
    }
    if let Some(seed) = common.seed {
        config.analysis.seed = Some(seed);
    }
    if let Some(draws) = common.draws {
        config.analysis.draws = draws;
    }

    Ok(config)
}

/// Per-variant counts given inline or through a JSON file
#[derive(Args, Clone, Debug, Default)]
pub struct CountsArgs {
    /// JSON file with aggregate counts or an array of observations ("-" for stdin)
    #[arg(long, short, conflicts_with_all = ["control_n", "treatment_n"])]
    pub input: Option<PathBuf>,

    /// Units in control
    #[arg(long, requires = "treatment_n")]
    pub control_n: Option<u64>,

    /// Conversions in control
    #[arg(long, default_value_t = 0)]
    pub control_conversions: u64,

    /// Units in treatment
    #[arg(long, requires = "control_n")]
    pub treatment_n: Option<u64>,

    /// Conversions in treatment
    #[arg(long, default_value_t = 0)]
    pub treatment_conversions: u64,
}

impl CountsArgs {
    pub fn resolve(&self) -> anyhow::Result<AggregateCounts> {
        if let Some(path) = &self.input {
            let source: CountsSource = read_json(path)?;
            return Ok(source.into_counts()?);
        }

        match (self.control_n, self.treatment_n) {
            (Some(control_n), Some(treatment_n)) => Ok(AggregateCounts::from_parts(
                control_n,
                self.control_conversions,
                treatment_n,
                self.treatment_conversions,
            )?),
            _ => bail!("Provide either --input or both --control-n and --treatment-n"),
        }
    }
}

/// Accepted JSON shapes for count-based commands
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CountsSource {
    Counts(AggregateCounts),
    Observations(Vec<ExperimentObservation>),
}

impl CountsSource {
    pub fn into_counts(self) -> Result<AggregateCounts, DomainError> {
        match self {
            Self::Counts(counts) => Ok(counts),
            Self::Observations(observations) => AggregateCounts::from_observations(&observations),
        }
    }
}

/// Read JSON from `path`, or stdin when `path` is "-"
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let mut buffer = String::new();
    if path == Path::new("-") {
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read JSON from stdin")?;
    } else {
        BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )
        .read_to_string(&mut buffer)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    }

    debug!(path = %path.display(), bytes = buffer.len(), "Read input");

    serde_json::from_str(&buffer).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Write a result to stdout as JSON
pub fn write_json<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    if compact {
        serde_json::to_writer(&mut stdout, value)?;
    } else {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_source_accepts_aggregates() {
        let json = r#"{
            "control": { "n": 1000, "conversions": 100 },
            "treatment": { "n": 1000, "conversions": 120 }
        }"#;
        let counts = serde_json::from_str::<CountsSource>(json)
            .unwrap()
            .into_counts()
            .unwrap();
        assert_eq!(counts.treatment.conversions(), 120);
    }

    #[test]
    fn test_counts_source_accepts_observations() {
        let json = r#"[
            { "unit_id": "a", "variant": "control", "converted": true },
            { "unit_id": "b", "variant": "treatment", "converted": false },
            { "unit_id": "c", "variant": "treatment", "converted": true }
        ]"#;
        let counts = serde_json::from_str::<CountsSource>(json)
            .unwrap()
            .into_counts()
            .unwrap();
        assert_eq!(counts.control.n(), 1);
        assert_eq!(counts.treatment.n(), 2);
        assert_eq!(counts.treatment.conversions(), 1);
    }

    #[test]
    fn test_counts_source_rejects_repeated_unit() {
        let json = r#"[
            { "unit_id": "a", "variant": "control", "converted": true },
            { "unit_id": "a", "variant": "treatment", "converted": false }
        ]"#;
        let err = serde_json::from_str::<CountsSource>(json)
            .unwrap()
            .into_counts()
            .unwrap_err();
        assert_eq!(err.subject(), Some("unit_id"));
    }

    #[test]
    fn test_counts_source_rejects_invalid_counts() {
        let json = r#"{
            "control": { "n": 10, "conversions": 11 },
            "treatment": { "n": 10, "conversions": 1 }
        }"#;
        assert!(serde_json::from_str::<CountsSource>(json).is_err());
    }

    #[test]
    fn test_inline_counts() {
        let args = CountsArgs {
            control_n: Some(500),
            control_conversions: 50,
            treatment_n: Some(480),
            treatment_conversions: 60,
            ..Default::default()
        };
        let counts = args.resolve().unwrap();
        assert_eq!(counts.total(), 980);
    }

    #[test]
    fn test_missing_counts() {
        assert!(CountsArgs::default().resolve().is_err());
    }

    #[test]
    fn test_read_json_file() {
        let path = std::env::temp_dir().join(format!("abtest-counts-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"control": {"n": 10, "conversions": 1}, "treatment": {"n": 12, "conversions": 3}}"#,
        )
        .unwrap();

        let args = CountsArgs {
            input: Some(path.clone()),
            ..Default::default()
        };
        let counts = args.resolve().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(counts.treatment.n(), 12);
    }

    #[test]
    fn test_read_json_missing_file() {
        let err = read_json::<CountsSource>(Path::new("/nonexistent/abtest.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
