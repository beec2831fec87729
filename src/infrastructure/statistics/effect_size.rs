//! Effect size and normal-approximation power for two proportions

use super::distribution::{critical_z, normal_cdf};
use crate::domain::experiment::Sidedness;
use crate::domain::DomainError;

/// Cohen's h between two proportions: `2·asin(√p2) − 2·asin(√p1)`
///
/// Positive when `p2 > p1`. 0.2 / 0.5 / 0.8 are the conventional
/// small / medium / large thresholds.
pub fn cohens_h(p1: f64, p2: f64) -> f64 {
    2.0 * p2.sqrt().asin() - 2.0 * p1.sqrt().asin()
}

/// Harmonic-mean effective per-arm size for unequal arms
pub fn effective_n(n1: u64, n2: u64) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 0.0;
    }
    2.0 / (1.0 / n1 as f64 + 1.0 / n2 as f64)
}

/// Power of a two-sample proportion test for effect `h` with `n` units per arm
///
/// One-sided power is for H1: treatment > control, so a negative `h` yields
/// power below alpha.
pub fn normal_power(h: f64, n: f64, alpha: f64, sidedness: Sidedness) -> Result<f64, DomainError> {
    let z_crit = critical_z(alpha, sidedness)?;
    let shift = h * (n / 2.0).sqrt();

    let power = match sidedness {
        Sidedness::OneSided => normal_cdf(shift - z_crit)?,
        Sidedness::TwoSided => normal_cdf(shift - z_crit)? + normal_cdf(-shift - z_crit)?,
    };

    Ok(power.clamp(0.0, 1.0))
}
