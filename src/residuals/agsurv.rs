//! residuals::agsurv — per-death-time sums for Cox survival curves.
//!
//! Purpose
//! -------
//! Provide the two aggregation kernels used when turning a fitted Cox model
//! into a baseline survival curve and its variance:
//!
//! - [`agsurv4`]: the Kalbfleisch–Prentice conditional survival factor at
//!   each summary time, solved in closed form for a single death and by
//!   bisection for tied deaths.
//! - [`agsurv5`]: the Efron-adjusted hazard sums `sum1`, `sum2` and the
//!   weighted covariate mean `xbar` at each death time.
//!
//! Invariants & assumptions
//! ------------------------
//! - Output lengths always equal the requested summary length; this is
//!   checked before returning.
//! - Inputs are the risk-set totals produced by
//!   [`risk_sums`](super::risksums::risk_sums) or equivalent caller data.

use ndarray::{Array1, Array2, ArrayView2};

use crate::core::{
    errors::{SurvError, SurvResult},
    validation::{check_finite, check_len},
};
use crate::residuals::risksums::DeathTimeSums;

const KP_BISECTION_STEPS: usize = 35;

/// Kalbfleisch–Prentice survival factors at `sn` summary times.
///
/// Parameters
/// ----------
/// - `ndeath`: `&[usize]`
///   Number of deaths at each summary time (length `sn`).
/// - `risk`: `&[f64]`
///   Risk score of each death, consumed in order across summary times.
/// - `weight`: `&[f64]`
///   Case weight of each death, consumed in the same order as `risk`.
/// - `sn`: `usize`
///   Number of summary times.
/// - `denom`: `&[f64]`
///   Weighted risk-set total at each summary time (length `sn`).
///
/// Returns
/// -------
/// `SurvResult<Vec<f64>>` of length `sn`:
/// - 1 where no death occurs,
/// - `(1 − w·r/denom)^(1/r)` for a single death,
/// - the root `α` of `Σ w_k r_k / (1 − α^{r_k}) = denom` for tied deaths,
///   found by 35 bisection steps from `α = 0.5`.
///
/// Errors
/// ------
/// - `DimensionMismatch` when `ndeath` or `denom` differ from `sn`, or
///   when `risk`/`weight` hold fewer entries than `Σ ndeath`.
/// - `InvalidValue` for non-finite inputs.
/// - `NumericDegeneracy` for a non-positive `denom` at a death time.
pub fn agsurv4(
    ndeath: &[usize], risk: &[f64], weight: &[f64], sn: usize, denom: &[f64],
) -> SurvResult<Vec<f64>> {
    check_len("ndeath", sn, ndeath.len())?;
    check_len("denom", sn, denom.len())?;
    let total: usize = ndeath.iter().sum();
    if risk.len() < total {
        return Err(SurvError::DimensionMismatch {
            name: "risk",
            expected: total,
            found: risk.len(),
        });
    }
    if weight.len() < total {
        return Err(SurvError::DimensionMismatch {
            name: "weight",
            expected: total,
            found: weight.len(),
        });
    }
    check_finite("risk", &risk[..total])?;
    check_finite("weight", &weight[..total])?;
    check_finite("denom", denom)?;

    let mut km = Vec::with_capacity(sn);
    let mut j = 0;
    for i in 0..sn {
        let d = ndeath[i];
        if d == 0 {
            km.push(1.0);
            continue;
        }
        if denom[i] <= 0.0 {
            return Err(SurvError::NumericDegeneracy {
                index: i,
                reason: "risk-set total must be positive at a death time",
            });
        }
        if d == 1 {
            km.push((1.0 - weight[j] * risk[j] / denom[i]).powf(1.0 / risk[j]));
        } else {
            let mut guess: f64 = 0.5;
            let mut inc = 0.25;
            for _ in 0..KP_BISECTION_STEPS {
                let sumt: f64 = (j..j + d)
                    .map(|k| weight[k] * risk[k] / (1.0 - guess.powf(risk[k])))
                    .sum();
                if sumt < denom[i] {
                    guess += inc;
                } else {
                    guess -= inc;
                }
                inc /= 2.0;
            }
            km.push(guess);
        }
        j += d;
    }

    check_len("sn", sn, km.len())?;
    Ok(km)
}

/// Efron-adjusted hazard sums at each death time.
///
/// Fields
/// ------
/// - `sum1`: Σ over inner steps of `1 / (x1 − x2·j/d)`, divided by `d`.
/// - `sum2`: the same with squared terms.
/// - `xbar`: shape `(n, nvar)`; Efron-weighted covariate means scaled by
///   the squared inverse denominators.
#[derive(Debug, Clone, PartialEq)]
pub struct AgSurv5 {
    pub sum1: Array1<f64>,
    pub sum2: Array1<f64>,
    pub xbar: Array2<f64>,
}

/// Compute [`AgSurv5`] from per-time death counts and risk-set totals.
///
/// Parameters
/// ----------
/// - `dd`: `&[usize]`
///   Deaths at each of the `n` times.
/// - `x1`: `&[f64]`
///   Weighted risk-set total (`denom`) at each time.
/// - `x2`: `&[f64]`
///   Weighted total over the tied deaths (`e_denom`).
/// - `xsum`, `xsum2`: `ArrayView2<f64>` of shape `(n, nvar)`
///   Covariate-weighted counterparts of `x1` and `x2`.
///
/// Returns
/// -------
/// `SurvResult<AgSurv5>` with `n` rows. Times with `dd = 0` yield zeros.
///
/// Errors
/// ------
/// - `DimensionMismatch` when shapes disagree.
/// - `NumericDegeneracy` when an inner denominator `x1 − x2·j/d` is not
///   positive.
pub fn agsurv5(
    dd: &[usize], x1: &[f64], x2: &[f64], xsum: ArrayView2<f64>, xsum2: ArrayView2<f64>,
) -> SurvResult<AgSurv5> {
    let n = dd.len();
    let nvar = xsum.ncols();
    check_len("x1", n, x1.len())?;
    check_len("x2", n, x2.len())?;
    check_len("xsum", n, xsum.nrows())?;
    check_len("xsum2", n, xsum2.nrows())?;
    check_len("xsum2", nvar, xsum2.ncols())?;

    let mut sum1 = Array1::<f64>::zeros(n);
    let mut sum2 = Array1::<f64>::zeros(n);
    let mut xbar = Array2::<f64>::zeros((n, nvar));
    for i in 0..n {
        let d = dd[i];
        let df = d as f64;
        for j in 0..d {
            let frac = j as f64 / df;
            let inner = x1[i] - x2[i] * frac;
            if inner <= 0.0 {
                return Err(SurvError::NumericDegeneracy {
                    index: i,
                    reason: "Efron-adjusted denominator is not positive",
                });
            }
            let temp = 1.0 / inner;
            sum1[i] += temp / df;
            sum2[i] += temp * temp / df;
            for k in 0..nvar {
                xbar[[i, k]] += (xsum[[i, k]] - xsum2[[i, k]] * frac) * temp * temp / df;
            }
        }
    }
    Ok(AgSurv5 { sum1, sum2, xbar })
}

/// Convenience wrapper: run [`agsurv5`] on the output of
/// [`risk_sums`](super::risksums::risk_sums).
pub fn agsurv5_from_sums(sums: &[DeathTimeSums]) -> SurvResult<AgSurv5> {
    let n = sums.len();
    let nvar = sums.first().map_or(0, |s| s.xsum.len());
    let dd: Vec<usize> = sums.iter().map(|s| s.ndeath).collect();
    let x1: Vec<f64> = sums.iter().map(|s| s.denom).collect();
    let x2: Vec<f64> = sums.iter().map(|s| s.e_denom).collect();
    let mut xsum = Array2::<f64>::zeros((n, nvar));
    let mut xsum2 = Array2::<f64>::zeros((n, nvar));
    for (i, s) in sums.iter().enumerate() {
        for k in 0..nvar {
            xsum[[i, k]] = s.xsum[k];
            xsum2[[i, k]] = s.xsum2[k];
        }
    }
    agsurv5(&dd, &x1, &x2, xsum.view(), xsum2.view())
}
