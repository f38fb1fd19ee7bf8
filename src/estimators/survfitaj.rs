//! estimators::survfitaj — Aalen–Johansen multi-state occupancy estimator.
//!
//! Purpose
//! -------
//! Estimate state-occupancy probabilities `p(t)` and transition-specific
//! cumulative hazards for multi-state (start, stop] data. With two states
//! (alive → dead) the occupancy of the initial state reduces to the
//! Kaplan–Meier curve. With several absorbing states it gives cumulative
//! incidence under competing risks.
//!
//! Key behaviors
//! -------------
//! - At each distinct transition time the weighted number at risk in every
//!   state is maintained with per-state entry/exit pointers over pre-sorted
//!   rows.
//! - Transition hazards `d_jk / n_j` form the increment matrix `A`, with
//!   `A_jj = −Σ_k A_jk`, and occupancy updates as `p ← p (I + A)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `status = 0` is censoring; `status = k ≥ 1` is a transition into
//!   state `k − 1`, which must differ from the row's current state.
//! - Occupancy rows are non-negative and sum to 1 (up to rounding).

use std::collections::BTreeMap;

use ndarray::Array2;

use crate::core::{
    errors::{SurvError, SurvResult},
    numerics::RunningSum,
    validation::{check_finite, check_len, resolve_weights},
};

/// AalenJohansen — output of [`survfitaj`].
///
/// Fields
/// ------
/// - `time`: distinct transition times, ascending.
/// - `n_risk`: `(ntime, nstate)` weighted number at risk per state.
/// - `pstate`: `(ntime, nstate)` occupancy probabilities after each time.
/// - `transitions`: observed `(from, to)` pairs, sorted.
/// - `n_event`: `(ntime, ntrans)` weighted transition counts.
/// - `cumhaz`: `(ntime, ntrans)` cumulative hazard per transition.
#[derive(Debug, Clone, PartialEq)]
pub struct AalenJohansen {
    pub time: Vec<f64>,
    pub n_risk: Array2<f64>,
    pub pstate: Array2<f64>,
    pub transitions: Vec<(usize, usize)>,
    pub n_event: Array2<f64>,
    pub cumhaz: Array2<f64>,
}

/// Aalen–Johansen estimator for multi-state data.
///
/// Parameters
/// ----------
/// - `time1`, `time2`: `&[f64]`
///   Interval bounds; rows are at risk on `(time1, time2]`.
/// - `status`: `&[usize]`
///   0 = censored, `k ≥ 1` = transition into state `k − 1` at `time2`.
/// - `cstate`: `&[usize]`
///   State occupied during the interval, in `0..nstate`.
/// - `nstate`: `usize`
///   Number of states.
/// - `weight`: `Option<&[f64]>`
///   Case weights; default 1.0.
/// - `p0`: `Option<&[f64]>`
///   Initial occupancy. Defaults to the weighted state distribution of
///   the rows at risk at the first transition time.
///
/// Returns
/// -------
/// `SurvResult<AalenJohansen>`.
///
/// Errors
/// ------
/// - `DimensionMismatch` for length disagreements.
/// - `InvalidValue` for non-finite times, `time1 >= time2`, out-of-range
///   states, self-transitions, or a `p0` that is negative or does not sum
///   to one.
pub fn survfitaj(
    time1: &[f64], time2: &[f64], status: &[usize], cstate: &[usize], nstate: usize,
    weight: Option<&[f64]>, p0: Option<&[f64]>,
) -> SurvResult<AalenJohansen> {
    let n = time2.len();
    check_len("time1", n, time1.len())?;
    check_len("status", n, status.len())?;
    check_len("cstate", n, cstate.len())?;
    check_finite("time1", time1)?;
    check_finite("time2", time2)?;
    let wt = resolve_weights(weight, n)?;
    for i in 0..n {
        if time1[i] >= time2[i] {
            return Err(SurvError::InvalidValue {
                name: "time1",
                value: time1[i],
                reason: "Interval start must be strictly less than stop.",
            });
        }
        if cstate[i] >= nstate {
            return Err(SurvError::InvalidValue {
                name: "cstate",
                value: cstate[i] as f64,
                reason: "State index must be below nstate.",
            });
        }
        if status[i] > nstate || (status[i] > 0 && status[i] - 1 == cstate[i]) {
            return Err(SurvError::InvalidValue {
                name: "status",
                value: status[i] as f64,
                reason: "Status must be 0 or a transition into a different valid state.",
            });
        }
    }

    let mut trans_index: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for i in 0..n {
        if status[i] > 0 {
            trans_index.insert((cstate[i], status[i] - 1), 0);
        }
    }
    let transitions: Vec<(usize, usize)> = trans_index.keys().copied().collect();
    for (k, slot) in trans_index.values_mut().enumerate() {
        *slot = k;
    }
    let ntrans = transitions.len();

    let mut event_times: Vec<f64> =
        (0..n).filter(|&i| status[i] > 0).map(|i| time2[i]).collect();
    event_times.sort_by(f64::total_cmp);
    event_times.dedup();
    let ntime = event_times.len();

    let mut by_entry: Vec<usize> = (0..n).collect();
    by_entry.sort_by(|&a, &b| time1[a].total_cmp(&time1[b]));
    let mut by_exit: Vec<usize> = (0..n).collect();
    by_exit.sort_by(|&a, &b| time2[a].total_cmp(&time2[b]));

    let mut entered = vec![RunningSum::new(); nstate];
    let mut exited = vec![RunningSum::new(); nstate];
    let (mut pe, mut px) = (0, 0);

    let mut n_risk = Array2::<f64>::zeros((ntime, nstate));
    let mut pstate = Array2::<f64>::zeros((ntime, nstate));
    let mut n_event = Array2::<f64>::zeros((ntime, ntrans));
    let mut cumhaz = Array2::<f64>::zeros((ntime, ntrans));
    let mut p: Option<Vec<f64>> = match p0 {
        Some(p0) => Some(validate_p0(p0, nstate)?),
        None => None,
    };
    let mut chaz = vec![0.0; ntrans];

    for (k, &t) in event_times.iter().enumerate() {
        while pe < n && time1[by_entry[pe]] < t {
            let row = by_entry[pe];
            entered[cstate[row]].add(wt[row]);
            pe += 1;
        }
        while px < n && time2[by_exit[px]] < t {
            let row = by_exit[px];
            exited[cstate[row]].add(wt[row]);
            px += 1;
        }
        let risk: Vec<f64> =
            (0..nstate).map(|j| entered[j].value() - exited[j].value()).collect();
        for j in 0..nstate {
            n_risk[[k, j]] = risk[j];
        }

        let mut q = px;
        while q < n && time2[by_exit[q]] == t {
            let row = by_exit[q];
            if status[row] > 0 {
                let m = trans_index[&(cstate[row], status[row] - 1)];
                n_event[[k, m]] += wt[row];
            }
            q += 1;
        }

        let current = p.get_or_insert_with(|| {
            let total: f64 = risk.iter().sum();
            risk.iter().map(|&r| r / total).collect()
        });
        let before = current.clone();
        for (m, &(from, to)) in transitions.iter().enumerate() {
            let d = n_event[[k, m]];
            if d > 0.0 {
                let haz = d / risk[from];
                chaz[m] += haz;
                let moved = before[from] * haz;
                current[from] -= moved;
                current[to] += moved;
            }
            cumhaz[[k, m]] = chaz[m];
        }
        for j in 0..nstate {
            pstate[[k, j]] = current[j];
        }
    }

    log::debug!("survfitaj: n = {n}, nstate = {nstate}, times = {ntime}, transitions = {ntrans}");
    Ok(AalenJohansen { time: event_times, n_risk, pstate, transitions, n_event, cumhaz })
}

fn validate_p0(p0: &[f64], nstate: usize) -> SurvResult<Vec<f64>> {
    check_len("p0", nstate, p0.len())?;
    check_finite("p0", p0)?;
    if let Some(&bad) = p0.iter().find(|&&v| v < 0.0) {
        return Err(SurvError::InvalidValue {
            name: "p0",
            value: bad,
            reason: "Initial occupancy must be non-negative.",
        });
    }
    let total: f64 = p0.iter().sum();
    if (total - 1.0).abs() > 1e-8 {
        return Err(SurvError::InvalidValue {
            name: "p0",
            value: total,
            reason: "Initial occupancy must sum to one.",
        });
    }
    Ok(p0.to_vec())
}
