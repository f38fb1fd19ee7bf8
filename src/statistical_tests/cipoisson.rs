//! statistical_tests::cipoisson — confidence limits for a Poisson rate.
//!
//! Purpose
//! -------
//! Given an observed count `k` over exposure `time`, return a two-sided
//! confidence interval for the rate `λ = E[k] / time`.
//!
//! Key behaviors
//! -------------
//! - `exact` inverts the Poisson tail via the Gamma–Poisson identity:
//!   `lower = G⁻¹(α/2; k)`, `upper = G⁻¹(1 − α/2; k + 1)`, with `G` the
//!   unit-rate Gamma CDF and `lower = 0` when `k = 0`.
//! - `anscombe` uses the variance-stabilizing square-root transform:
//!   `(√(k − 1/8) ∓ z/2)²` for the lower / `(√(k + 7/8) + z/2)²` for the
//!   upper limit, `z = Φ⁻¹(1 − α/2)`. A lower limit that would cross zero
//!   is clamped to 0.
//!
//! Invariants & assumptions
//! ------------------------
//! - `k ≥ 0` (non-integer counts are accepted, as for weighted data),
//!   `time > 0`, `0 < p < 1`.
//! - `0 ≤ lower ≤ upper` always.

use std::str::FromStr;

use statrs::distribution::{ContinuousCDF, Gamma, Normal};

use crate::core::{
    errors::{SurvError, SurvResult},
    validation::check_len,
};

/// PoissonMethod — interval construction for [`cipoisson`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoissonMethod {
    #[default]
    Exact,
    Anscombe,
}

impl FromStr for PoissonMethod {
    type Err = SurvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(PoissonMethod::Exact),
            "anscombe" => Ok(PoissonMethod::Anscombe),
            _ => Err(SurvError::InvalidMethod {
                name: s.to_string(),
                reason: "Expected \"exact\" or \"anscombe\".",
            }),
        }
    }
}

/// Confidence limits for a Poisson rate.
///
/// Parameters
/// ----------
/// - `k`: `f64`
///   Observed count, `k ≥ 0`.
/// - `time`: `f64`
///   Exposure, `time > 0`.
/// - `p`: `f64`
///   Coverage probability in `(0, 1)`, e.g. 0.95.
/// - `method`: `&str`
///   `"exact"` or `"anscombe"` (case-insensitive).
///
/// Returns
/// -------
/// `SurvResult<(f64, f64)>` as `(lower, upper)`.
///
/// Errors
/// ------
/// - `InvalidMethod` for an unknown method name.
/// - `InvalidValue` when `k`, `time` or `p` is out of range.
///
/// Examples
/// --------
/// ```rust
/// use rust_survival::statistical_tests::cipoisson;
///
/// let (lo, hi) = cipoisson(5.0, 10.0, 0.95, "exact").unwrap();
/// assert!(lo < 0.5 && 0.5 < hi);
/// ```
pub fn cipoisson(k: f64, time: f64, p: f64, method: &str) -> SurvResult<(f64, f64)> {
    let method: PoissonMethod = method.parse()?;
    cipoisson_with(k, time, p, method)
}

/// [`cipoisson`] with an already-parsed method.
pub fn cipoisson_with(k: f64, time: f64, p: f64, method: PoissonMethod) -> SurvResult<(f64, f64)> {
    if !k.is_finite() || k < 0.0 {
        return Err(SurvError::InvalidValue { name: "k", value: k, reason: "Count must be ≥ 0." });
    }
    if !time.is_finite() || time <= 0.0 {
        return Err(SurvError::InvalidValue {
            name: "time",
            value: time,
            reason: "Exposure must be > 0.",
        });
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(SurvError::InvalidValue {
            name: "p",
            value: p,
            reason: "Coverage must lie in (0, 1).",
        });
    }
    let alpha = 1.0 - p;

    let (lower, upper) = match method {
        PoissonMethod::Exact => {
            let lower = if k == 0.0 { 0.0 } else { gamma_quantile(k, alpha / 2.0)? };
            let upper = gamma_quantile(k + 1.0, 1.0 - alpha / 2.0)?;
            (lower, upper)
        }
        PoissonMethod::Anscombe => {
            let z = Normal::new(0.0, 1.0)
                .map_err(|e| SurvError::BackendError { text: e.to_string() })?
                .inverse_cdf(1.0 - alpha / 2.0);
            let root: f64 = (k - 0.125).max(0.0).sqrt();
            let lower = if k > 0.0 && root > z / 2.0 { (root - z / 2.0).powi(2) } else { 0.0 };
            let upper = ((k + 0.875).sqrt() + z / 2.0).powi(2);
            (lower, upper)
        }
    };
    Ok((lower / time, upper / time))
}

/// Exact limits from Gamma quantiles.
pub fn cipoisson_exact(k: f64, time: f64, p: f64) -> SurvResult<(f64, f64)> {
    cipoisson_with(k, time, p, PoissonMethod::Exact)
}

/// Limits from Anscombe's square-root approximation.
pub fn cipoisson_anscombe(k: f64, time: f64, p: f64) -> SurvResult<(f64, f64)> {
    cipoisson_with(k, time, p, PoissonMethod::Anscombe)
}

/// Vectorized [`cipoisson`]; `k` and `time` must have equal length.
pub fn cipoisson_many(
    k: &[f64], time: &[f64], p: f64, method: &str,
) -> SurvResult<Vec<(f64, f64)>> {
    check_len("time", k.len(), time.len())?;
    let method: PoissonMethod = method.parse()?;
    k.iter().zip(time).map(|(&k, &t)| cipoisson_with(k, t, p, method)).collect()
}

fn gamma_quantile(shape: f64, prob: f64) -> SurvResult<f64> {
    let dist = Gamma::new(shape, 1.0).map_err(|e| SurvError::BackendError { text: e.to_string() })?;
    Ok(dist.inverse_cdf(prob))
}
