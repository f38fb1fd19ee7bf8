//! core::validation — shared input guards for survival routines.
//!
//! Purpose
//! -------
//! Centralize the checks every public routine performs before touching its
//! data: parallel-length agreement, finiteness, status coding, permutation
//! validity, ascending processing order and contiguous strata. Routines
//! call these once up front so the numerical kernels can index without
//! re-checking.
//!
//! Key behaviors
//! -------------
//! - Resolve optional inputs to their defaults (unit weights, a single
//!   stratum) instead of failing.
//! - Report the first offending position, using the 0-based index into the
//!   argument (or into the processing order for order checks).
//!
//! Invariants & assumptions
//! ------------------------
//! - Strata are identified by `i64` labels. Under the processing order the
//!   labels of a stratum must form one contiguous run, and runs must appear
//!   in non-decreasing label order.
//! - Weights must be finite and strictly positive.

use crate::core::errors::{SurvError, SurvResult};

/// Fail with `DimensionMismatch` unless `found == expected`.
pub fn check_len(name: &'static str, expected: usize, found: usize) -> SurvResult<()> {
    if expected != found {
        return Err(SurvError::DimensionMismatch { name, expected, found });
    }
    Ok(())
}

/// Fail with `InvalidValue` on the first non-finite element.
pub fn check_finite(name: &'static str, values: &[f64]) -> SurvResult<()> {
    for &value in values {
        if !value.is_finite() {
            return Err(SurvError::InvalidValue { name, value, reason: "Must be finite." });
        }
    }
    Ok(())
}

/// Fail with `InvalidValue` unless every status is 0 (censored) or 1 (event).
pub fn check_binary_status(name: &'static str, status: &[i32]) -> SurvResult<()> {
    for &s in status {
        if s != 0 && s != 1 {
            return Err(SurvError::InvalidValue {
                name,
                value: f64::from(s),
                reason: "Status must be 0 (censored) or 1 (event).",
            });
        }
    }
    Ok(())
}

/// Resolve optional case weights to a vector of length `n`.
///
/// Missing weights default to 1.0. Present weights must have length `n`
/// and be finite and strictly positive.
pub fn resolve_weights(weights: Option<&[f64]>, n: usize) -> SurvResult<Vec<f64>> {
    match weights {
        None => Ok(vec![1.0; n]),
        Some(w) => {
            check_len("weight", n, w.len())?;
            for &value in w {
                if !(value.is_finite() && value > 0.0) {
                    return Err(SurvError::InvalidValue {
                        name: "weight",
                        value,
                        reason: "Weights must be finite and strictly positive.",
                    });
                }
            }
            Ok(w.to_vec())
        }
    }
}

/// Resolve optional stratum labels; absent strata form a single stratum.
pub fn resolve_strata(strata: Option<&[i64]>, n: usize) -> SurvResult<Vec<i64>> {
    match strata {
        None => Ok(vec![0; n]),
        Some(s) => {
            check_len("strata", n, s.len())?;
            Ok(s.to_vec())
        }
    }
}

/// Check that `order` is a permutation of `0..n`.
///
/// Errors
/// ------
/// - `DimensionMismatch` when `order.len() != n`.
/// - `InvalidOrder` when an index is out of range or repeated.
pub fn check_permutation(name: &'static str, order: &[usize], n: usize) -> SurvResult<()> {
    check_len(name, n, order.len())?;
    let mut seen = vec![false; n];
    for (pos, &idx) in order.iter().enumerate() {
        if idx >= n {
            return Err(SurvError::InvalidOrder { index: pos, reason: "index out of range" });
        }
        if seen[idx] {
            return Err(SurvError::InvalidOrder { index: pos, reason: "index repeated" });
        }
        seen[idx] = true;
    }
    Ok(())
}

/// Check that `key` is non-decreasing along `order` within each stratum.
///
/// Stratum changes reset the comparison, so only within-stratum order is
/// enforced.
pub fn check_ascending(
    key: &[f64], strata: &[i64], order: &[usize], reason: &'static str,
) -> SurvResult<()> {
    for pos in 1..order.len() {
        let (prev, cur) = (order[pos - 1], order[pos]);
        if strata[prev] == strata[cur] && key[cur] < key[prev] {
            return Err(SurvError::InvalidOrder { index: pos, reason });
        }
    }
    Ok(())
}

/// Split `order` into contiguous stratum runs `(begin, end)` (half-open
/// positions into `order`).
///
/// Errors
/// ------
/// - `InvalidStratum` when labels decrease along `order`, which also
///   catches a label that reappears after its run ended.
pub fn stratum_runs(strata: &[i64], order: &[usize]) -> SurvResult<Vec<(usize, usize)>> {
    let mut runs = Vec::new();
    let mut begin = 0;
    for pos in 1..=order.len() {
        if pos == order.len() || strata[order[pos]] != strata[order[pos - 1]] {
            if pos < order.len() && strata[order[pos]] < strata[order[pos - 1]] {
                return Err(SurvError::InvalidStratum {
                    index: pos,
                    reason: "stratum labels must be non-decreasing in processing order",
                });
            }
            runs.push((begin, pos));
            begin = pos;
        }
    }
    Ok(runs)
}
