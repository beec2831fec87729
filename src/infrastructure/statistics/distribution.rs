//! Normal and chi-square helpers backed by `statrs`

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::domain::experiment::{validate_open_unit, Sidedness};
use crate::domain::DomainError;

fn standard_normal() -> Result<Normal, DomainError> {
    Normal::new(0.0, 1.0)
        .map_err(|e| DomainError::numerical_instability("standard_normal", e.to_string()))
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(x: f64) -> Result<f64, DomainError> {
    Ok(standard_normal()?.cdf(x))
}

/// Standard normal upper-tail probability `P(Z > x)`
pub fn normal_sf(x: f64) -> Result<f64, DomainError> {
    Ok(standard_normal()?.sf(x))
}

/// Inverse of the standard normal CDF for `p` in (0, 1)
pub fn normal_quantile(p: f64) -> Result<f64, DomainError> {
    validate_open_unit("quantile", p)?;
    Ok(standard_normal()?.inverse_cdf(p))
}

/// Critical z value for a test at level `alpha`
pub fn critical_z(alpha: f64, sidedness: Sidedness) -> Result<f64, DomainError> {
    validate_open_unit("alpha", alpha)?;
    normal_quantile(sidedness.critical_quantile(alpha))
}

/// Chi-square survival function `P(X > statistic)`
pub fn chi_square_sf(statistic: f64, degrees_of_freedom: u64) -> Result<f64, DomainError> {
    if degrees_of_freedom == 0 {
        return Err(DomainError::invalid_parameter(
            "degrees_of_freedom",
            degrees_of_freedom,
            "must be at least 1",
        ));
    }
    if !statistic.is_finite() || statistic < 0.0 {
        return Err(DomainError::numerical_instability(
            "chi_square",
            format!("statistic {statistic} is not a finite non-negative number"),
        ));
    }
    if statistic == 0.0 {
        return Ok(1.0);
    }

    let distribution = ChiSquared::new(degrees_of_freedom as f64)
        .map_err(|e| DomainError::numerical_instability("chi_square", e.to_string()))?;
    Ok(distribution.sf(statistic).clamp(0.0, 1.0))
}
