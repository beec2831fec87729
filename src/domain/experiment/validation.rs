//! Boundary validation for numeric experiment inputs

use std::collections::HashSet;

use super::observation::ExperimentObservation;
use crate::domain::DomainError;

/// Validate a probability-like parameter that must lie strictly inside (0, 1)
///
/// Used for alpha, target power and baseline conversion rates.
pub fn validate_open_unit(name: &str, value: f64) -> Result<f64, DomainError> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(DomainError::invalid_parameter(
            name,
            value,
            "must lie strictly between 0 and 1",
        ));
    }
    Ok(value)
}

/// Validate a strictly positive, finite parameter
pub fn validate_positive(name: &str, value: f64) -> Result<f64, DomainError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DomainError::invalid_parameter(
            name,
            value,
            "must be a finite number greater than 0",
        ));
    }
    Ok(value)
}

/// Validate a non-negative, finite parameter
pub fn validate_non_negative(name: &str, value: f64) -> Result<f64, DomainError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::invalid_parameter(
            name,
            value,
            "must be a finite number greater than or equal to 0",
        ));
    }
    Ok(value)
}

/// Validate a trials/successes pair
pub fn validate_counts(arm: &str, n: u64, conversions: u64) -> Result<(), DomainError> {
    if conversions > n {
        return Err(DomainError::invalid_parameter(
            format!("{arm}.conversions"),
            conversions,
            format!("conversions cannot exceed trials (n = {n})"),
        ));
    }
    Ok(())
}

/// Validate a pair of percentiles used for credible intervals
pub fn validate_percentiles(lower: f64, upper: f64) -> Result<(), DomainError> {
    if !lower.is_finite() || !(0.0..=100.0).contains(&lower) {
        return Err(DomainError::invalid_parameter(
            "lower_percentile",
            lower,
            "must lie in [0, 100]",
        ));
    }
    if !upper.is_finite() || !(0.0..=100.0).contains(&upper) {
        return Err(DomainError::invalid_parameter(
            "upper_percentile",
            upper,
            "must lie in [0, 100]",
        ));
    }
    if lower >= upper {
        return Err(DomainError::invalid_parameter(
            "lower_percentile",
            lower,
            format!("must be below the upper percentile ({upper})"),
        ));
    }
    Ok(())
}

/// Reject observation sets that count the same unit more than once
pub fn validate_unique_units<'a, I>(observations: I) -> Result<(), DomainError>
where
    I: IntoIterator<Item = &'a ExperimentObservation>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    for observation in observations {
        if !seen.insert(observation.unit_id()) {
            return Err(DomainError::invalid_parameter(
                "unit_id",
                observation.unit_id(),
                "unit identifiers must be unique",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_unit_accepts_interior() {
        assert_eq!(validate_open_unit("alpha", 0.05).unwrap(), 0.05);
        assert!(validate_open_unit("power", 0.999).is_ok());
    }

    #[test]
    fn test_open_unit_rejects_bounds() {
        assert!(validate_open_unit("alpha", 0.0).is_err());
        assert!(validate_open_unit("alpha", 1.0).is_err());
        assert!(validate_open_unit("alpha", -0.1).is_err());
        assert!(validate_open_unit("alpha", f64::NAN).is_err());
    }

    #[test]
    fn test_open_unit_names_parameter() {
        let err = validate_open_unit("power", 1.2).unwrap_err();
        assert_eq!(err.subject(), Some("power"));
    }

    #[test]
    fn test_positive() {
        assert!(validate_positive("mde", 0.01).is_ok());
        assert!(validate_positive("mde", 0.0).is_err());
        assert!(validate_positive("mde", -0.02).is_err());
        assert!(validate_positive("mde", f64::INFINITY).is_err());
    }

    #[test]
    fn test_non_negative() {
        assert!(validate_non_negative("revenue", 0.0).is_ok());
        assert!(validate_non_negative("revenue", -1.0).is_err());
    }

    #[test]
    fn test_counts() {
        assert!(validate_counts("control", 10, 10).is_ok());
        assert!(validate_counts("control", 0, 0).is_ok());

        let err = validate_counts("treatment", 10, 11).unwrap_err();
        assert_eq!(err.subject(), Some("treatment.conversions"));
    }

    #[test]
    fn test_percentiles() {
        assert!(validate_percentiles(2.5, 97.5).is_ok());
        assert!(validate_percentiles(97.5, 2.5).is_err());
        assert!(validate_percentiles(-1.0, 50.0).is_err());
        assert!(validate_percentiles(5.0, 101.0).is_err());
    }

    #[test]
    fn test_unique_units() {
        use crate::domain::experiment::Variant;

        let distinct = [
            ExperimentObservation::new("a", Variant::Control, true),
            ExperimentObservation::new("b", Variant::Treatment, false),
        ];
        assert!(validate_unique_units(&distinct).is_ok());
        assert!(validate_unique_units(&Vec::<ExperimentObservation>::new()).is_ok());

        let repeated = [
            ExperimentObservation::new("a", Variant::Control, true),
            ExperimentObservation::new("b", Variant::Treatment, false),
            ExperimentObservation::new("a", Variant::Treatment, true),
        ];
        let err = validate_unique_units(&repeated).unwrap_err();
        assert_eq!(err.subject(), Some("unit_id"));
        assert!(err.to_string().contains("a"));
    }
}
