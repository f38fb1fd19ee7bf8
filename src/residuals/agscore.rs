//! residuals::agscore — Cox-model score residuals.
//!
//! Purpose
//! -------
//! Compute the per-row contributions to the Cox partial-likelihood score
//! vector for (start, stop] data ([`agscore`]) and single-time data
//! ([`coxscore`]). Row `i` receives
//! `δ_i·(x_i − x̄(t_i)) − score_i·Σ_{t ∈ (start_i, stop_i]} (x_i − x̄(t))·dΛ(t)`,
//! with the Efron form replacing `x̄` and `dΛ` by their tie-corrected
//! averages.
//!
//! Key behaviors
//! -------------
//! - Per death time, five quantities are built from
//!   [`death_time_sums`](super::risksums::death_time_sums):
//!   - `h1 = Σ_j dΛ_j` and `m1 = Σ_j x̄_j·dΛ_j`, charged to rows at risk;
//!   - `h2 = Σ_j (1 − j/d)·dΛ_j` and `m2 = Σ_j (1 − j/d)·x̄_j·dΛ_j`,
//!     charged to the tied deaths instead;
//!   - `m3 = Σ_j x̄_j / d`, the mean subtracted from each tied death.
//!
//!   Breslow is the `d = 1` case, where all hazards equal `Σw/denom` and
//!   every mean equals `xsum/denom`.
//! - `h1` and `m1` are prefix-summed per stratum, so each row costs two
//!   binary searches plus one own-death correction.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Σ_i w_i·r_i` equals the score vector `U(β)` for the supplied scores,
//!   under either tie method.
//! - Residuals are unweighted; weights enter through the hazard and the
//!   means.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use crate::core::{errors::SurvResult, options::TieMethod};
use crate::residuals::risksums::{check_covar, death_time_sums, CountingData, DeathTimeSums};

/// Score-residual terms at one death time.
struct ScoreTerms {
    h1: f64,
    h2: f64,
    m1: Vec<f64>,
    m2: Vec<f64>,
    m3: Vec<f64>,
}

fn score_terms(line: &DeathTimeSums, method: TieMethod) -> ScoreTerms {
    let nvar = line.xsum.len();
    let ties = match method {
        TieMethod::Breslow => 1,
        TieMethod::Efron => line.ndeath,
    };
    let d = ties as f64;
    let share = line.wtsum / d;
    let mut terms = ScoreTerms {
        h1: 0.0,
        h2: 0.0,
        m1: vec![0.0; nvar],
        m2: vec![0.0; nvar],
        m3: vec![0.0; nvar],
    };
    for j in 0..ties {
        let frac = j as f64 / d;
        let denom = line.denom - frac * line.e_denom;
        let hazard = share / denom;
        terms.h1 += hazard;
        terms.h2 += (1.0 - frac) * hazard;
        for k in 0..nvar {
            let mean = (line.xsum[k] - frac * line.xsum2[k]) / denom;
            terms.m1[k] += mean * hazard;
            terms.m2[k] += mean * (1.0 - frac) * hazard;
            terms.m3[k] += mean / d;
        }
    }
    terms
}

/// Prefix sums of `h1` and `m1` over one stratum's death times.
struct ScorePath {
    time: Vec<f64>,
    terms: Vec<ScoreTerms>,
    cum_h1: Vec<f64>,
    cum_m1: Vec<Vec<f64>>,
}

impl ScorePath {
    fn new(nvar: usize) -> Self {
        ScorePath {
            time: Vec::new(),
            terms: Vec::new(),
            cum_h1: vec![0.0],
            cum_m1: vec![vec![0.0; nvar]],
        }
    }

    fn push(&mut self, time: f64, terms: ScoreTerms) {
        let h1 = self.cum_h1[self.cum_h1.len() - 1] + terms.h1;
        let m1 = self.cum_m1[self.cum_m1.len() - 1]
            .iter()
            .zip(&terms.m1)
            .map(|(c, m)| c + m)
            .collect();
        self.time.push(time);
        self.terms.push(terms);
        self.cum_h1.push(h1);
        self.cum_m1.push(m1);
    }

    /// Number of death times `<= t`.
    fn upto(&self, t: f64) -> usize {
        self.time.partition_point(|&s| s <= t)
    }
}

fn score_residuals(
    data: &CountingData<'_>, covar: ArrayView2<f64>, method: TieMethod,
) -> SurvResult<Array2<f64>> {
    let nvar = covar.ncols();
    let sums = death_time_sums(data, Some(covar))?;
    let mut paths: BTreeMap<i64, ScorePath> = BTreeMap::new();
    for line in &sums {
        paths
            .entry(line.stratum)
            .or_insert_with(|| ScorePath::new(nvar))
            .push(line.time, score_terms(line, method));
    }

    let mut resid = Array2::zeros((data.len(), nvar));
    for i in 0..data.len() {
        let Some(path) = paths.get(&data.strata[i]) else {
            continue;
        };
        let lo = data.start.map_or(0, |s| path.upto(s[i]));
        let hi = path.upto(data.stop[i]);
        let s = data.score[i];
        let h1 = path.cum_h1[hi] - path.cum_h1[lo];
        let own = (data.event[i] == 1 && hi > lo && path.time[hi - 1] == data.stop[i])
            .then(|| &path.terms[hi - 1]);
        for k in 0..nvar {
            let x = covar[[i, k]];
            let m1 = path.cum_m1[hi][k] - path.cum_m1[lo][k];
            let mut r = -s * (x * h1 - m1);
            if let Some(t) = own {
                r += (x - t.m3[k]) - s * (x * (t.h2 - t.h1) - (t.m2[k] - t.m1[k]));
            }
            resid[[i, k]] = r;
        }
    }
    Ok(resid)
}

/// Score residuals for counting-process (start, stop] data.
///
/// Parameters
/// ----------
/// - `start`, `stop`: `&[f64]`
///   Interval bounds; rows are at risk on `(start, stop]`.
/// - `event`: `&[i32]`
///   Event indicator at `stop` (0/1).
/// - `covar`: `ArrayView2<f64>`
///   Covariates, shape `(n, nvar)`.
/// - `score`: `&[f64]`
///   Risk scores `exp(xβ)`, strictly positive.
/// - `weight`: `Option<&[f64]>`
///   Case weights; default 1.0.
/// - `strata`: `Option<&[i64]>`
///   Stratum labels; rows need not be grouped or sorted.
/// - `method`: [`TieMethod`]
///
/// Returns
/// -------
/// `SurvResult<Array2<f64>>` of shape `(n, nvar)`, rows in input order.
///
/// Errors
/// ------
/// - `DimensionMismatch` for length disagreements, including `covar` rows.
/// - `InvalidValue` for non-finite inputs, bad event codes, non-positive
///   scores or weights, and rows with `start >= stop`.
/// - `NumericDegeneracy` if a death time has an empty weighted risk set.
#[allow(clippy::too_many_arguments)]
pub fn agscore(
    start: &[f64], stop: &[f64], event: &[i32], covar: ArrayView2<f64>, score: &[f64],
    weight: Option<&[f64]>, strata: Option<&[i64]>, method: TieMethod,
) -> SurvResult<Array2<f64>> {
    let data = CountingData::new(Some(start), stop, event, score, weight, strata)?;
    check_covar(&covar, data.len())?;
    let resid = score_residuals(&data, covar, method)?;
    log::trace!("agscore: shape = {:?}, method = {method:?}", resid.dim());
    Ok(resid)
}

/// Score residuals for single-time (right-censored) data.
///
/// Equivalent to [`agscore`] with every row entering at −∞.
pub fn coxscore(
    time: &[f64], status: &[i32], covar: ArrayView2<f64>, score: &[f64], weight: Option<&[f64]>,
    strata: Option<&[i64]>, method: TieMethod,
) -> SurvResult<Array2<f64>> {
    let data = CountingData::new(None, time, status, score, weight, strata)?;
    check_covar(&covar, data.len())?;
    score_residuals(&data, covar, method)
}
