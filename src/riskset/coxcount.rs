//! riskset::coxcount — risk-set construction at distinct event times.
//!
//! Purpose
//! -------
//! Build, per stratum, the list of distinct event times, the number at risk
//! at each and the membership of each risk set. Two layouts are supported:
//! single-time data (`coxcount1`) and counting-process (start, stop] data
//! (`coxcount2`).
//!
//! Key behaviors
//! -------------
//! - Tied events at the same instant form one risk-set line. Every
//!   observation whose time equals the event time is at risk, including
//!   censored ones (events precede censoring at a tied instant).
//! - `coxcount2` sweeps each stratum backward in time with two cursors,
//!   one over stops (entries into the backward risk set) and one over starts
//!   (exits), so entries and exits interleave correctly.
//! - Risk-set membership is returned flattened: line `k` owns
//!   `index[offset_k .. offset_k + nrisk[k]]`, with `status` marking the
//!   members that died at `time[k]`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `coxcount1` consumes rows already in processing order: grouped by
//!   non-decreasing stratum label, ascending time within stratum.
//! - `coxcount2` consumes `sort1` (ascending start) and `sort2` (ascending
//!   stop), both permutations of `0..n` that keep strata contiguous.
//! - Within a stratum, `nrisk` is non-increasing in time for `coxcount1`.
//!
//! Conventions
//! -----------
//! - All returned indices are 0-based row positions into the inputs.
//! - Membership within a line is listed in ascending row order.

use crate::core::{
    errors::{SurvError, SurvResult},
    options::OrderCheck,
    validation::{
        check_ascending, check_binary_status, check_finite, check_len, check_permutation,
        resolve_strata, stratum_runs,
    },
};

/// CoxCount — flattened risk sets at each distinct event time.
///
/// Fields
/// ------
/// - `time`: distinct event times, ascending within stratum.
/// - `nrisk`: number at risk at each event time.
/// - `stratum`: stratum label of each event time.
/// - `index`: flattened 0-based row indices of each risk set, of total
///   length `nrisk.iter().sum()`.
/// - `status`: parallel to `index`; 1 when the member had an event at that
///   line's time, 0 otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct CoxCount {
    pub time: Vec<f64>,
    pub nrisk: Vec<usize>,
    pub stratum: Vec<i64>,
    pub index: Vec<usize>,
    pub status: Vec<i32>,
}

impl CoxCount {
    fn empty() -> Self {
        CoxCount {
            time: Vec::new(),
            nrisk: Vec::new(),
            stratum: Vec::new(),
            index: Vec::new(),
            status: Vec::new(),
        }
    }

    /// Number of distinct event-time lines.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Row indices of the risk set at line `k`, with their event flags.
    ///
    /// Panics
    /// ------
    /// - If `k >= self.len()`.
    pub fn risk_set(&self, k: usize) -> (&[usize], &[i32]) {
        let offset: usize = self.nrisk[..k].iter().sum();
        let end = offset + self.nrisk[k];
        (&self.index[offset..end], &self.status[offset..end])
    }
}

/// Risk sets for single-time (right-censored) data.
///
/// Parameters
/// ----------
/// - `time`: `&[f64]`
///   Follow-up times in processing order (ascending within stratum).
/// - `status`: `&[i32]`
///   0 = censored, 1 = event.
/// - `strata`: `Option<&[i64]>`
///   Stratum labels, non-decreasing along the rows. `None` is one stratum.
/// - `check`: [`OrderCheck`]
///   `Strict` verifies ascending time within stratum.
///
/// Returns
/// -------
/// `SurvResult<CoxCount>` with one line per distinct event time per
/// stratum. The risk set at time `t` holds every row of the stratum with
/// `time >= t`.
///
/// Errors
/// ------
/// - `DimensionMismatch` when `status` or `strata` lengths differ from
///   `time`.
/// - `InvalidValue` for non-finite times or status codes other than 0/1.
/// - `InvalidStratum` when stratum labels decrease along the rows.
/// - `InvalidOrder` (strict mode) when time decreases within a stratum.
///
/// Examples
/// --------
/// ```rust
/// use rust_survival::riskset::coxcount1;
/// use rust_survival::core::OrderCheck;
///
/// let time = [1.0, 2.0, 2.0, 3.0];
/// let status = [1, 1, 0, 1];
/// let counts = coxcount1(&time, &status, None, OrderCheck::Strict).unwrap();
/// assert_eq!(counts.nrisk, vec![4, 3, 1]);
/// ```
pub fn coxcount1(
    time: &[f64], status: &[i32], strata: Option<&[i64]>, check: OrderCheck,
) -> SurvResult<CoxCount> {
    let n = time.len();
    check_len("status", n, status.len())?;
    check_finite("time", time)?;
    check_binary_status("status", status)?;
    let strata = resolve_strata(strata, n)?;
    let order: Vec<usize> = (0..n).collect();
    let runs = stratum_runs(&strata, &order)?;
    if check.is_strict() {
        check_ascending(time, &strata, &order, "time must ascend within stratum")?;
    }

    let mut out = CoxCount::empty();
    for (begin, end) in runs {
        let mut i = begin;
        while i < end {
            let t = time[i];
            let mut j = i;
            let mut deaths = 0;
            while j < end && time[j] == t {
                deaths += status[j];
                j += 1;
            }
            if deaths > 0 {
                out.time.push(t);
                out.nrisk.push(end - i);
                out.stratum.push(strata[i]);
                for k in i..end {
                    out.index.push(k);
                    out.status.push(if time[k] == t { status[k] } else { 0 });
                }
            }
            i = j;
        }
    }
    log::trace!("coxcount1: n = {n}, lines = {}", out.len());
    Ok(out)
}

/// Risk sets for counting-process (start, stop] data.
///
/// Parameters
/// ----------
/// - `time1`, `time2`: `&[f64]`
///   Interval start and stop for each row; a row is at risk at `t` when
///   `time1 < t <= time2`.
/// - `status`: `&[i32]`
///   Event indicator at `time2`.
/// - `sort1`: `&[usize]`
///   Permutation ordering rows by stratum, then ascending `time1`.
/// - `sort2`: `&[usize]`
///   Permutation ordering rows by stratum, then ascending `time2`.
/// - `strata`: `Option<&[i64]>`
///   Stratum labels; must be non-decreasing along both sort orders.
/// - `check`: [`OrderCheck`]
///
/// Returns
/// -------
/// `SurvResult<CoxCount>` with one line per distinct event time per
/// stratum, in ascending time.
///
/// Errors
/// ------
/// - `DimensionMismatch` for length disagreements.
/// - `InvalidValue` for non-finite times, bad status codes, or rows with
///   `time1 >= time2`.
/// - `InvalidOrder` when a sort index is not a permutation or (strict
///   mode) does not ascend within stratum.
/// - `InvalidStratum` when strata decrease along either sort order. Two
///   orders that both pass this check share the same stratum runs.
///
/// Notes
/// -----
/// - Each stratum is processed with a backward sweep: walking `sort2`
///   backward admits rows whose stop is at or after the current event time,
///   walking `sort1` backward evicts rows whose start is at or after it.
pub fn coxcount2(
    time1: &[f64], time2: &[f64], status: &[i32], sort1: &[usize], sort2: &[usize],
    strata: Option<&[i64]>, check: OrderCheck,
) -> SurvResult<CoxCount> {
    let n = time2.len();
    check_len("time1", n, time1.len())?;
    check_len("status", n, status.len())?;
    check_finite("time1", time1)?;
    check_finite("time2", time2)?;
    check_binary_status("status", status)?;
    for i in 0..n {
        if time1[i] >= time2[i] {
            return Err(SurvError::InvalidValue {
                name: "time1",
                value: time1[i],
                reason: "Interval start must be strictly less than stop.",
            });
        }
    }
    check_permutation("sort1", sort1, n)?;
    check_permutation("sort2", sort2, n)?;
    let strata = resolve_strata(strata, n)?;
    let runs1 = stratum_runs(&strata, sort1)?;
    let runs2 = stratum_runs(&strata, sort2)?;
    if check.is_strict() {
        check_ascending(time1, &strata, sort1, "time1 must ascend within stratum along sort1")?;
        check_ascending(time2, &strata, sort2, "time2 must ascend within stratum along sort2")?;
    }

    let mut out = CoxCount::empty();
    let mut members = RiskMembers::new(n);
    for (&(b1, e1), &(b2, e2)) in runs1.iter().zip(runs2.iter()) {
        let mut lines: Vec<(f64, Vec<usize>, Vec<i32>)> = Vec::new();
        let mut p1 = e1;
        let mut p2 = e2;
        while p2 > b2 {
            let t = time2[sort2[p2 - 1]];
            let mut deaths = 0;
            while p2 > b2 && time2[sort2[p2 - 1]] == t {
                let row = sort2[p2 - 1];
                deaths += status[row];
                members.insert(row);
                p2 -= 1;
            }
            while p1 > b1 && time1[sort1[p1 - 1]] >= t {
                members.remove(sort1[p1 - 1]);
                p1 -= 1;
            }
            if deaths > 0 {
                let mut idx = members.rows().to_vec();
                idx.sort_unstable();
                let st: Vec<i32> =
                    idx.iter().map(|&r| if time2[r] == t { status[r] } else { 0 }).collect();
                lines.push((t, idx, st));
            }
        }
        let label = strata[sort2[b2]];
        for (t, idx, st) in lines.into_iter().rev() {
            out.time.push(t);
            out.nrisk.push(idx.len());
            out.stratum.push(label);
            out.index.extend(idx);
            out.status.extend(st);
        }
        members.clear();
    }
    log::trace!("coxcount2: n = {n}, lines = {}", out.len());
    Ok(out)
}

/// Dense set of row indices with O(1) insert/remove.
pub(crate) struct RiskMembers {
    rows: Vec<usize>,
    slot: Vec<Option<usize>>,
}

impl RiskMembers {
    pub(crate) fn new(n: usize) -> Self {
        RiskMembers { rows: Vec::new(), slot: vec![None; n] }
    }

    pub(crate) fn insert(&mut self, row: usize) {
        if self.slot[row].is_none() {
            self.slot[row] = Some(self.rows.len());
            self.rows.push(row);
        }
    }

    pub(crate) fn remove(&mut self, row: usize) {
        if let Some(pos) = self.slot[row].take() {
            self.rows.swap_remove(pos);
            if pos < self.rows.len() {
                self.slot[self.rows[pos]] = Some(pos);
            }
        }
    }

    pub(crate) fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub(crate) fn clear(&mut self) {
        for &row in &self.rows {
            self.slot[row] = None;
        }
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - coxcount1 line construction, tie grouping and stratum splitting.
    // - coxcount2 backward sweep with interleaved entries and exits.
    // - Error branches for lengths, strata and ordering.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check coxcount1 on a small single-stratum sample with a tie between
    // an event and a censoring.
    //
    // Given
    // -----
    // - time = [1, 2, 2, 3, 4], status = [1, 1, 0, 0, 1].
    //
    // Expect
    // ------
    // - Event lines at 1, 2, 4 with nrisk 5, 4, 1.
    // - The censored row tied at t = 2 is in that risk set with status 0.
    fn coxcount1_single_stratum_groups_ties_and_counts_risk() {
        // Arrange
        let time = [1.0, 2.0, 2.0, 3.0, 4.0];
        let status = [1, 1, 0, 0, 1];

        // Act
        let out = coxcount1(&time, &status, None, OrderCheck::Strict).unwrap();

        // Assert
        assert_eq!(out.time, vec![1.0, 2.0, 4.0]);
        assert_eq!(out.nrisk, vec![5, 4, 1]);
        let (idx, st) = out.risk_set(1);
        assert_eq!(idx, &[1, 2, 3, 4]);
        assert_eq!(st, &[1, 0, 0, 0]);
    }

    #[test]
    // Purpose
    // -------
    // nrisk is non-increasing within each stratum and restarts across
    // strata.
    //
    // Given
    // -----
    // - Two strata: times [1, 2, 3, 4, 5] in stratum 0 and
    //   [1.5, 2.5, 3.5] in stratum 1.
    //
    // Expect
    // ------
    // - Within each stratum nrisk never increases; the first line of
    //   stratum 1 has nrisk = 3.
    fn coxcount1_two_strata_nrisk_non_increasing_within_stratum() {
        // Arrange
        let time = [1.0, 2.0, 3.0, 4.0, 5.0, 1.5, 2.5, 3.5];
        let status = [1, 1, 0, 1, 0, 1, 1, 0];
        let strata = [0, 0, 0, 0, 0, 1, 1, 1];

        // Act
        let out = coxcount1(&time, &status, Some(&strata), OrderCheck::Strict).unwrap();

        // Assert
        for k in 1..out.len() {
            if out.stratum[k] == out.stratum[k - 1] {
                assert!(out.nrisk[k] <= out.nrisk[k - 1], "nrisk increased at line {k}");
            }
        }
        let first_s1 = out.stratum.iter().position(|&s| s == 1).unwrap();
        assert_eq!(out.nrisk[first_s1], 3);
        assert_eq!(out.index.len(), out.nrisk.iter().sum::<usize>());
    }

    #[test]
    fn coxcount1_decreasing_strata_returns_invalid_stratum() {
        let time = [1.0, 2.0, 3.0];
        let status = [1, 1, 1];
        let strata = [1, 0, 1];
        let result = coxcount1(&time, &status, Some(&strata), OrderCheck::Strict);
        assert!(matches!(result, Err(SurvError::InvalidStratum { .. })), "got {result:?}");
    }

    #[test]
    // Purpose
    // -------
    // Unsorted time is rejected in strict mode but trusted in permissive
    // mode.
    //
    // Given
    // -----
    // - time = [2, 1], status = [1, 1].
    //
    // Expect
    // ------
    // - Strict: `InvalidOrder`. Permissive: `Ok`.
    fn coxcount1_unsorted_time_strict_vs_permissive() {
        // Arrange
        let time = [2.0, 1.0];
        let status = [1, 1];

        // Act
        let strict = coxcount1(&time, &status, None, OrderCheck::Strict);
        let permissive = coxcount1(&time, &status, None, OrderCheck::Permissive);

        // Assert
        assert!(matches!(strict, Err(SurvError::InvalidOrder { index: 1, .. })));
        assert!(permissive.is_ok());
    }

    #[test]
    fn coxcount1_status_length_mismatch_returns_dimension_mismatch() {
        let result = coxcount1(&[1.0, 2.0], &[1], None, OrderCheck::Strict);
        assert_eq!(
            result,
            Err(SurvError::DimensionMismatch { name: "status", expected: 2, found: 1 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Validate coxcount2 against a hand-computed (start, stop] example with
    // late entries.
    //
    // Given
    // -----
    // - Rows (start, stop, status):
    //   0:(0,2,1) 1:(0,3,0) 2:(1,4,1) 3:(2,5,1) 4:(3,6,0) 5:(0,1,0)
    //
    // Expect
    // ------
    // - Event times 2, 4, 5.
    // - At t = 2: rows {0,1,2} at risk (row 3 starts at 2, row 5 stops
    //   at 1).
    // - At t = 4: rows {2,3,4}. At t = 5: rows {3,4}.
    fn coxcount2_interleaved_entries_and_exits_match_hand_counts() {
        // Arrange
        let time1 = [0.0, 0.0, 1.0, 2.0, 3.0, 0.0];
        let time2 = [2.0, 3.0, 4.0, 5.0, 6.0, 1.0];
        let status = [1, 0, 1, 1, 0, 0];
        let sort1 = [0, 1, 5, 2, 3, 4];
        let sort2 = [5, 0, 1, 2, 3, 4];

        // Act
        let out =
            coxcount2(&time1, &time2, &status, &sort1, &sort2, None, OrderCheck::Strict).unwrap();

        // Assert
        assert_eq!(out.time, vec![2.0, 4.0, 5.0]);
        assert_eq!(out.nrisk, vec![3, 3, 2]);
        assert_eq!(out.risk_set(0).0, &[0, 1, 2]);
        assert_eq!(out.risk_set(0).1, &[1, 0, 0]);
        assert_eq!(out.risk_set(1).0, &[2, 3, 4]);
        assert_eq!(out.risk_set(2).0, &[3, 4]);
    }

    #[test]
    fn coxcount2_non_permutation_sort_returns_invalid_order() {
        let time1 = [0.0, 0.0];
        let time2 = [1.0, 2.0];
        let status = [1, 1];
        let result =
            coxcount2(&time1, &time2, &status, &[0, 0], &[0, 1], None, OrderCheck::Strict);
        assert!(matches!(result, Err(SurvError::InvalidOrder { .. })), "got {result:?}");
    }

    #[test]
    // Purpose
    // -------
    // Strata must be non-decreasing along both sort orders.
    //
    // Given
    // -----
    // - strata = [0, 0, 1, 1], sort1 in stratum order.
    // - sort2 visiting stratum 1 first, then one interleaving the strata.
    //
    // Expect
    // ------
    // - InvalidStratum at position 2 for both bad sort2 orders, and for the
    //   same bad order passed as sort1.
    fn coxcount2_decreasing_strata_along_sort_returns_invalid_stratum() {
        // Arrange
        let time1 = [0.0, 0.0, 0.0, 0.0];
        let time2 = [1.0, 2.0, 1.0, 2.0];
        let status = [1, 0, 1, 1];
        let strata = [0, 0, 1, 1];
        let in_order = [0, 1, 2, 3];
        let reversed_strata = [2, 3, 0, 1];
        let interleaved = [0, 2, 1, 3];

        // Act
        let call = |sort1: &[usize], sort2: &[usize]| {
            coxcount2(&time1, &time2, &status, sort1, sort2, Some(&strata), OrderCheck::Strict)
        };

        // Assert
        for bad in [&reversed_strata, &interleaved] {
            let result = call(&in_order, bad);
            assert!(
                matches!(result, Err(SurvError::InvalidStratum { index: 2, .. })),
                "got {result:?}"
            );
            let result = call(bad, &in_order);
            assert!(
                matches!(result, Err(SurvError::InvalidStratum { index: 2, .. })),
                "got {result:?}"
            );
        }
        assert!(call(&in_order, &in_order).is_ok());
    }

    #[test]
    fn risk_members_insert_remove_keeps_slots_consistent() {
        let mut m = RiskMembers::new(4);
        m.insert(0);
        m.insert(2);
        m.insert(3);
        m.remove(0);
        m.insert(2);
        let mut rows = m.rows().to_vec();
        rows.sort_unstable();
        assert_eq!(rows, vec![2, 3]);
        m.clear();
        assert!(m.rows().is_empty());
    }
}
