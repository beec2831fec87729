//! Aggregate trial/success counts per variant

use serde::{Deserialize, Serialize};

use super::observation::{ExperimentObservation, Variant};
use super::validation::{validate_counts, validate_unique_units};
use crate::domain::DomainError;

// ============================================================================
// VariantCounts
// ============================================================================

/// Trials and successes for one variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCounts")]
pub struct VariantCounts {
    n: u64,
    conversions: u64,
}

#[derive(Deserialize)]
struct RawCounts {
    n: u64,
    conversions: u64,
}

impl TryFrom<RawCounts> for VariantCounts {
    type Error = DomainError;

    fn try_from(raw: RawCounts) -> Result<Self, Self::Error> {
        Self::new(raw.n, raw.conversions)
    }
}

impl VariantCounts {
    /// Create counts, rejecting more conversions than trials
    pub fn new(n: u64, conversions: u64) -> Result<Self, DomainError> {
        validate_counts("counts", n, conversions)?;
        Ok(Self { n, conversions })
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    pub fn failures(&self) -> u64 {
        self.n - self.conversions
    }

    /// Observed conversion rate, `None` when there are no trials
    pub fn rate(&self) -> Option<f64> {
        if self.n == 0 {
            None
        } else {
            Some(self.conversions as f64 / self.n as f64)
        }
    }

    fn record(&mut self, converted: bool) {
        self.n += 1;
        if converted {
            self.conversions += 1;
        }
    }
}

// ============================================================================
// AggregateCounts
// ============================================================================

/// Per-variant counts for a paired control/treatment comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounts {
    pub control: VariantCounts,
    pub treatment: VariantCounts,
}

impl AggregateCounts {
    pub fn new(control: VariantCounts, treatment: VariantCounts) -> Self {
        Self { control, treatment }
    }

    /// Build from raw `(n, conversions)` pairs, naming the offending arm on error
    pub fn from_parts(
        control_n: u64,
        control_conversions: u64,
        treatment_n: u64,
        treatment_conversions: u64,
    ) -> Result<Self, DomainError> {
        validate_counts("control", control_n, control_conversions)?;
        validate_counts("treatment", treatment_n, treatment_conversions)?;

        Ok(Self {
            control: VariantCounts {
                n: control_n,
                conversions: control_conversions,
            },
            treatment: VariantCounts {
                n: treatment_n,
                conversions: treatment_conversions,
            },
        })
    }

    /// Sum observations into per-variant counts
    ///
    /// Each unit may appear once; a repeated `unit_id` is rejected.
    pub fn from_observations(observations: &[ExperimentObservation]) -> Result<Self, DomainError> {
        validate_unique_units(observations)?;
        Ok(Self::tally(observations))
    }

    /// Sum observations already known to be unique per unit
    pub(crate) fn tally<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = &'a ExperimentObservation>,
    {
        let mut counts = Self::default();
        for observation in observations {
            counts
                .get_mut(observation.variant())
                .record(observation.converted());
        }
        counts
    }

    pub fn get(&self, variant: Variant) -> &VariantCounts {
        match variant {
            Variant::Control => &self.control,
            Variant::Treatment => &self.treatment,
        }
    }

    fn get_mut(&mut self, variant: Variant) -> &mut VariantCounts {
        match variant {
            Variant::Control => &mut self.control,
            Variant::Treatment => &mut self.treatment,
        }
    }

    /// Combined number of trials across both variants
    pub fn total(&self) -> u64 {
        self.control.n + self.treatment.n
    }

    /// Size of the smaller arm
    pub fn smallest_arm(&self) -> u64 {
        self.control.n.min(self.treatment.n)
    }
}
