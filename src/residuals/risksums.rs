//! residuals::risksums — weighted risk-set totals at each death time.
//!
//! Purpose
//! -------
//! Compute, for every distinct death time of every stratum, the running
//! totals that Cox-model residuals and variance terms are built from:
//! the weighted score over the risk set (`denom`), over the tied deaths
//! (`e_denom`), and their covariate-weighted counterparts (`xsum`,
//! `xsum2`).
//!
//! Key behaviors
//! -------------
//! - One backward sweep per stratum over rows sorted by stop time: rows
//!   enter when the sweep reaches their stop, and leave once it passes
//!   their start. Totals use [`RunningSum`] so removals do not leak
//!   rounding error into later (earlier-in-time) risk sets.
//! - Rows need not arrive sorted or grouped; strata are gathered and
//!   sorted internally in O(n log n).
//!
//! Invariants & assumptions
//! ------------------------
//! - A row is at risk at `t` when `start < t <= stop`; with no start
//!   times every row is at risk until its stop.
//! - Scores are the exponentiated linear predictors and must be finite and
//!   strictly positive.
//! - Output is ordered by ascending stratum label, then ascending time.

use std::collections::BTreeMap;

use ndarray::ArrayView2;

use crate::core::{
    errors::{SurvError, SurvResult},
    numerics::RunningSum,
    validation::{check_binary_status, check_finite, check_len, resolve_strata, resolve_weights},
};

/// Totals at one distinct death time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathTimeSums {
    pub stratum: i64,
    pub time: f64,
    /// Number of tied deaths.
    pub ndeath: usize,
    /// Number of rows at risk.
    pub nrisk: usize,
    /// Σ w over the tied deaths.
    pub wtsum: f64,
    /// Σ w·score over the risk set.
    pub denom: f64,
    /// Σ w·score over the tied deaths.
    pub e_denom: f64,
    /// Σ w·score·x over the risk set, one entry per covariate.
    pub xsum: Vec<f64>,
    /// Σ w·score·x over the tied deaths.
    pub xsum2: Vec<f64>,
}

/// Validated, default-resolved inputs shared by the residual routines.
pub(crate) struct CountingData<'a> {
    pub start: Option<&'a [f64]>,
    pub stop: &'a [f64],
    pub event: &'a [i32],
    pub score: &'a [f64],
    pub weight: Vec<f64>,
    pub strata: Vec<i64>,
}

impl<'a> CountingData<'a> {
    pub(crate) fn new(
        start: Option<&'a [f64]>, stop: &'a [f64], event: &'a [i32], score: &'a [f64],
        weight: Option<&[f64]>, strata: Option<&[i64]>,
    ) -> SurvResult<Self> {
        let n = stop.len();
        check_len("event", n, event.len())?;
        check_len("score", n, score.len())?;
        check_finite("stop", stop)?;
        check_finite("score", score)?;
        check_binary_status("event", event)?;
        for &s in score {
            if s <= 0.0 {
                return Err(SurvError::InvalidValue {
                    name: "score",
                    value: s,
                    reason: "Risk scores must be strictly positive.",
                });
            }
        }
        if let Some(start) = start {
            check_len("start", n, start.len())?;
            check_finite("start", start)?;
            for i in 0..n {
                if start[i] >= stop[i] {
                    return Err(SurvError::InvalidValue {
                        name: "start",
                        value: start[i],
                        reason: "Interval start must be strictly less than stop.",
                    });
                }
            }
        }
        let weight = resolve_weights(weight, n)?;
        let strata = resolve_strata(strata, n)?;
        Ok(CountingData { start, stop, event, score, weight, strata })
    }

    pub(crate) fn len(&self) -> usize {
        self.stop.len()
    }

    /// Row indices grouped by stratum label, ascending label.
    pub(crate) fn by_stratum(&self) -> BTreeMap<i64, Vec<usize>> {
        let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for i in 0..self.len() {
            groups.entry(self.strata[i]).or_default().push(i);
        }
        groups
    }
}

/// Weighted risk-set totals at each distinct death time.
///
/// Parameters
/// ----------
/// - `start`: `Option<&[f64]>`
///   Interval starts for (start, stop] data; `None` for single-time data.
/// - `stop`: `&[f64]`
///   Interval stops (follow-up times).
/// - `event`: `&[i32]`
///   Event indicator at `stop`.
/// - `score`: `&[f64]`
///   Risk scores `exp(xβ)`, strictly positive.
/// - `weight`: `Option<&[f64]>`
///   Case weights; default 1.0.
/// - `covar`: `Option<ArrayView2<f64>>`
///   Covariate matrix of shape `(n, nvar)`; when `None`, `xsum` and
///   `xsum2` are empty.
/// - `strata`: `Option<&[i64]>`
///   Stratum labels; rows need not be grouped.
///
/// Returns
/// -------
/// `SurvResult<Vec<DeathTimeSums>>` ordered by stratum, then time.
///
/// Errors
/// ------
/// - `DimensionMismatch`, `InvalidValue` from input validation.
/// - `NumericDegeneracy` if a death time has a non-positive `denom`.
pub fn risk_sums(
    start: Option<&[f64]>, stop: &[f64], event: &[i32], score: &[f64], weight: Option<&[f64]>,
    covar: Option<ArrayView2<f64>>, strata: Option<&[i64]>,
) -> SurvResult<Vec<DeathTimeSums>> {
    let data = CountingData::new(start, stop, event, score, weight, strata)?;
    if let Some(x) = &covar {
        check_covar(x, data.len())?;
    }
    death_time_sums(&data, covar)
}

/// Covariate matrix must have `n` rows of finite values.
pub(crate) fn check_covar(covar: &ArrayView2<f64>, n: usize) -> SurvResult<()> {
    check_len("covar", n, covar.nrows())?;
    for &value in covar.iter() {
        if !value.is_finite() {
            return Err(SurvError::InvalidValue { name: "covar", value, reason: "Must be finite." });
        }
    }
    Ok(())
}

pub(crate) fn death_time_sums(
    data: &CountingData<'_>, covar: Option<ArrayView2<f64>>,
) -> SurvResult<Vec<DeathTimeSums>> {
    let nvar = covar.as_ref().map_or(0, |x| x.ncols());
    let mut out = Vec::new();

    for (label, rows) in data.by_stratum() {
        let mut by_stop = rows.clone();
        by_stop.sort_by(|&a, &b| data.stop[a].total_cmp(&data.stop[b]));
        let mut by_start = rows;
        if let Some(start) = data.start {
            by_start.sort_by(|&a, &b| start[a].total_cmp(&start[b]));
        }

        let mut denom = RunningSum::new();
        let mut xsum = vec![RunningSum::new(); nvar];
        let mut nrisk = 0usize;
        let mut lines = Vec::new();
        let mut p2 = by_stop.len();
        let mut p1 = by_start.len();

        while p2 > 0 {
            let t = data.stop[by_stop[p2 - 1]];
            let mut ndeath = 0usize;
            let mut wtsum = RunningSum::new();
            let mut e_denom = RunningSum::new();
            let mut xsum2 = vec![RunningSum::new(); nvar];
            let mut last_death = 0;

            while p2 > 0 && data.stop[by_stop[p2 - 1]] == t {
                let row = by_stop[p2 - 1];
                let ws = data.weight[row] * data.score[row];
                denom.add(ws);
                nrisk += 1;
                if let Some(x) = &covar {
                    for k in 0..nvar {
                        xsum[k].add(ws * x[[row, k]]);
                    }
                }
                if data.event[row] == 1 {
                    ndeath += 1;
                    last_death = row;
                    wtsum.add(data.weight[row]);
                    e_denom.add(ws);
                    if let Some(x) = &covar {
                        for k in 0..nvar {
                            xsum2[k].add(ws * x[[row, k]]);
                        }
                    }
                }
                p2 -= 1;
            }

            if let Some(start) = data.start {
                while p1 > 0 && start[by_start[p1 - 1]] >= t {
                    let row = by_start[p1 - 1];
                    let ws = data.weight[row] * data.score[row];
                    denom.sub(ws);
                    nrisk -= 1;
                    if let Some(x) = &covar {
                        for k in 0..nvar {
                            xsum[k].sub(ws * x[[row, k]]);
                        }
                    }
                    p1 -= 1;
                }
                if nrisk == 0 {
                    denom.reset();
                    xsum.iter_mut().for_each(RunningSum::reset);
                }
            }

            if ndeath > 0 {
                let d = denom.value();
                if d <= 0.0 {
                    return Err(SurvError::NumericDegeneracy {
                        index: last_death,
                        reason: "weighted risk set is empty at a death time",
                    });
                }
                lines.push(DeathTimeSums {
                    stratum: label,
                    time: t,
                    ndeath,
                    nrisk,
                    wtsum: wtsum.value(),
                    denom: d,
                    e_denom: e_denom.value(),
                    xsum: xsum.iter().map(RunningSum::value).collect(),
                    xsum2: xsum2.iter().map(RunningSum::value).collect(),
                });
            }
        }
        lines.reverse();
        out.extend(lines);
    }
    Ok(out)
}
