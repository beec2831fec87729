//! Per-segment z-tests over one observation attribute

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::frequentist::FrequentistTester;
use crate::domain::experiment::{
    validate_unique_units, AggregateCounts, ExperimentObservation, SegmentAnalysis,
    SegmentEstimate, SegmentOrder, SegmentOutcome, SegmentResult, Warning,
};
use crate::domain::DomainError;

/// Arms smaller than this get a low sample size warning
pub const DEFAULT_RELIABILITY_FLOOR: u64 = 30;

/// Stratified analyzer
///
/// Every segment is tested independently with the wrapped tester. A segment
/// that cannot be tested is reported as failed rather than aborting the
/// whole analysis. No multiple-comparison correction is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentAnalyzer {
    tester: FrequentistTester,
    reliability_floor: u64,
    order: SegmentOrder,
}

impl Default for SegmentAnalyzer {
    fn default() -> Self {
        Self {
            tester: FrequentistTester::default(),
            reliability_floor: DEFAULT_RELIABILITY_FLOOR,
            order: SegmentOrder::default(),
        }
    }
}

impl SegmentAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tester(mut self, tester: FrequentistTester) -> Self {
        self.tester = tester;
        self
    }

    pub fn with_reliability_floor(mut self, floor: u64) -> Self {
        self.reliability_floor = floor;
        self
    }

    pub fn with_order(mut self, order: SegmentOrder) -> Self {
        self.order = order;
        self
    }

    /// Split `observations` by the value of `attribute` and test each group
    ///
    /// Units without the attribute form their own `None` segment.
    pub fn analyze(
        &self,
        observations: &[ExperimentObservation],
        attribute: &str,
    ) -> Result<SegmentAnalysis, DomainError> {
        if attribute.trim().is_empty() {
            return Err(DomainError::invalid_parameter(
                "attribute",
                attribute,
                "segment attribute name cannot be empty",
            ));
        }
        if observations.is_empty() {
            return Err(DomainError::insufficient_data("no observations to segment"));
        }
        validate_unique_units(observations)?;

        let mut groups: BTreeMap<Option<&str>, Vec<&ExperimentObservation>> = BTreeMap::new();
        for observation in observations {
            groups
                .entry(observation.segment(attribute))
                .or_default()
                .push(observation);
        }

        if groups.keys().all(Option::is_none) {
            return Err(DomainError::insufficient_data(format!(
                "no observation carries segment attribute '{attribute}'"
            )));
        }

        let mut segments: Vec<SegmentResult> = groups
            .into_iter()
            .map(|(segment, members)| self.evaluate(segment, members))
            .collect();

        sort_segments(&mut segments, self.order);

        debug!(
            attribute,
            segments = segments.len(),
            observations = observations.len(),
            "Completed segment analysis"
        );

        Ok(SegmentAnalysis {
            attribute: attribute.to_string(),
            order: self.order,
            total_observations: observations.len() as u64,
            segments,
        })
    }

    fn evaluate(&self, segment: Option<&str>, members: Vec<&ExperimentObservation>) -> SegmentResult {
        let counts = AggregateCounts::tally(members);

        let outcome = match self.tester.test(&counts) {
            Ok(result) => {
                let mut estimate = SegmentEstimate::from(result);
                let smallest_arm = counts.smallest_arm();
                if smallest_arm < self.reliability_floor {
                    estimate.warnings.push(Warning::LowSampleSize {
                        smallest_arm,
                        floor: self.reliability_floor,
                    });
                }
                SegmentOutcome::Evaluated(estimate)
            }
            Err(error) => {
                warn!(segment = ?segment, error = %error, "Segment could not be evaluated");
                SegmentOutcome::Failed { error }
            }
        };

        SegmentResult {
            segment: segment.map(str::to_string),
            counts,
            outcome,
        }
    }
}

fn sort_segments(segments: &mut [SegmentResult], order: SegmentOrder) {
    segments.sort_by(|a, b| {
        let primary = match order {
            SegmentOrder::SampleSizeDescending => b.sample_size().cmp(&a.sample_size()),
            SegmentOrder::SegmentAscending => Ordering::Equal,
            SegmentOrder::UpliftDescending => {
                match (a.outcome.estimate(), b.outcome.estimate()) {
                    (Some(x), Some(y)) => y.difference.total_cmp(&x.difference),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        };
        primary.then_with(|| segment_value_order(&a.segment, &b.segment))
    });
}

/// Ascending by value with the missing-attribute segment last
fn segment_value_order(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
