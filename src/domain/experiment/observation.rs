//! Experimental units and variant labels

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::validation::validate_non_negative;
use crate::domain::DomainError;

// ============================================================================
// Variant
// ============================================================================

/// Arm of a two-variant experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Baseline experience
    Control,
    /// Experience under evaluation
    Treatment,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Treatment => "treatment",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Variant {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "control" => Ok(Self::Control),
            "treatment" => Ok(Self::Treatment),
            other => Err(DomainError::invalid_parameter(
                "variant",
                other,
                "expected 'control' or 'treatment'",
            )),
        }
    }
}

// ============================================================================
// ExperimentObservation
// ============================================================================

/// A single experimental unit and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObservationRecord", into = "ObservationRecord")]
pub struct ExperimentObservation {
    unit_id: String,
    variant: Variant,
    converted: bool,
    revenue: Option<f64>,
    segments: BTreeMap<String, String>,
}

impl ExperimentObservation {
    /// Create a new observation without revenue or segment attributes
    pub fn new(unit_id: impl Into<String>, variant: Variant, converted: bool) -> Self {
        Self {
            unit_id: unit_id.into(),
            variant,
            converted,
            revenue: None,
            segments: BTreeMap::new(),
        }
    }

    /// Attach revenue; negative or non-finite amounts are rejected
    pub fn with_revenue(mut self, revenue: f64) -> Result<Self, DomainError> {
        self.revenue = Some(validate_non_negative("revenue", revenue)?);
        Ok(self)
    }

    /// Attach a segment attribute (e.g. `device` = `mobile`)
    pub fn with_segment(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.segments.insert(attribute.into(), value.into());
        self
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn converted(&self) -> bool {
        self.converted
    }

    pub fn revenue(&self) -> Option<f64> {
        self.revenue
    }

    /// Value of a segment attribute, if this unit carries it
    pub fn segment(&self, attribute: &str) -> Option<&str> {
        self.segments.get(attribute).map(String::as_str)
    }

    pub fn segments(&self) -> &BTreeMap<String, String> {
        &self.segments
    }
}

/// Wire shape of an observation, validated on conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub unit_id: String,
    pub variant: Variant,
    pub converted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub segments: BTreeMap<String, String>,
}

impl TryFrom<ObservationRecord> for ExperimentObservation {
    type Error = DomainError;

    fn try_from(record: ObservationRecord) -> Result<Self, Self::Error> {
        if record.unit_id.trim().is_empty() {
            return Err(DomainError::invalid_parameter(
                "unit_id",
                "\"\"",
                "unit identifier cannot be empty",
            ));
        }

        let mut observation = Self::new(record.unit_id, record.variant, record.converted);
        if let Some(revenue) = record.revenue {
            observation = observation.with_revenue(revenue)?;
        }
        observation.segments = record.segments;
        Ok(observation)
    }
}

impl From<ExperimentObservation> for ObservationRecord {
    fn from(observation: ExperimentObservation) -> Self {
        Self {
            unit_id: observation.unit_id,
            variant: observation.variant,
            converted: observation.converted,
            revenue: observation.revenue,
            segments: observation.segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod variant_tests {
        use super::*;

        #[test]
        fn test_variant_parse() {
            assert_eq!("control".parse::<Variant>().unwrap(), Variant::Control);
            assert_eq!(" Treatment ".parse::<Variant>().unwrap(), Variant::Treatment);
            assert!("holdout".parse::<Variant>().is_err());
        }

        #[test]
        fn test_variant_serialization() {
            let json = serde_json::to_string(&Variant::Treatment).unwrap();
            assert_eq!(json, "\"treatment\"");
        }
    }

    mod observation_tests {
        use super::*;

        #[test]
        fn test_builder() {
            let obs = ExperimentObservation::new("u-1", Variant::Control, true)
                .with_revenue(42.5)
                .unwrap()
                .with_segment("device", "mobile");

            assert_eq!(obs.unit_id(), "u-1");
            assert_eq!(obs.variant(), Variant::Control);
            assert!(obs.converted());
            assert_eq!(obs.revenue(), Some(42.5));
            assert_eq!(obs.segment("device"), Some("mobile"));
            assert_eq!(obs.segment("country"), None);
        }

        #[test]
        fn test_negative_revenue_rejected() {
            let result = ExperimentObservation::new("u-1", Variant::Control, true).with_revenue(-1.0);
            assert!(matches!(result, Err(DomainError::InvalidParameter { .. })));
        }

        #[test]
        fn test_deserialize_validates() {
            let json = r#"{"unit_id":"u-9","variant":"treatment","converted":false,
                "segments":{"country":"CO"}}"#;
            let obs: ExperimentObservation = serde_json::from_str(json).unwrap();
            assert_eq!(obs.variant(), Variant::Treatment);
            assert_eq!(obs.segment("country"), Some("CO"));

            let bad = r#"{"unit_id":"u-9","variant":"treatment","converted":true,"revenue":-3.0}"#;
            assert!(serde_json::from_str::<ExperimentObservation>(bad).is_err());

            let empty_id = r#"{"unit_id":"  ","variant":"control","converted":true}"#;
            assert!(serde_json::from_str::<ExperimentObservation>(empty_id).is_err());
        }

        #[test]
        fn test_serialize_omits_empty_fields() {
            let obs = ExperimentObservation::new("u-2", Variant::Control, false);
            let json = serde_json::to_value(&obs).unwrap();
            assert!(json.get("revenue").is_none());
            assert!(json.get("segments").is_none());
        }
    }
}
