//! estimators::survfitkm — Kaplan–Meier and Nelson–Aalen survival curves.
//!
//! Purpose
//! -------
//! Estimate the survival function and cumulative hazard of a single
//! (optionally weighted, left-truncated) sample at every distinct
//! observation time, together with Greenwood-type standard errors.
//!
//! Key behaviors
//! -------------
//! - Walk the distinct times in ascending order. At each time the risk
//!   set is `entered − exited`: rows whose entry precedes the time, minus
//!   rows that left strictly before it. Both totals are advanced by
//!   pointers over pre-sorted rows, so the whole pass is O(n log n).
//! - Survival follows [`SurvivalType`]: the product-limit estimator
//!   `S *= 1 − d/n`, or `S = exp(−H)`.
//! - The cumulative hazard follows [`HazardType`]: the Nelson–Aalen step
//!   `d/n`, or the Fleming–Harrington tie correction that spreads `m`
//!   tied events over `m` successively smaller risk sets.
//! - Standard errors:
//!   - Product-limit uses Greenwood's formula
//!     `se = S·sqrt(Σ d/(n(n−d)))`; a time at which everyone at risk dies
//!     sets `S = 0` and adds no variance term.
//!   - `exp(−H)` uses `se = S·sqrt(Var H)`.
//! - `reverse = true` estimates the censoring distribution. Censorings
//!   become the events, and rows that died at a tied instant are removed
//!   from that instant's risk set (deaths precede censoring).
//!
//! Invariants & assumptions
//! ------------------------
//! - All outputs are parallel vectors of length = number of distinct
//!   times.
//! - In product-limit mode `estimate` is non-increasing and lies in
//!   [0, 1]; `std_err` is non-negative and is 0 until the first event.
//! - Entry times must be strictly less than exit times.
//!
//! Conventions
//! -----------
//! - `position` flags follow the counting-process convention for subjects
//!   split over several rows:
//!   - bit 1 marks a subject's first row, and only these rows count
//!     toward `n_enter`;
//!   - bit 2 marks a subject's last row, and only these rows count toward
//!     `n_censor`.
//!
//!   Without `position` every row is both first and last.
//!
//! Testing notes
//! -------------
//! - Unit tests cover hand-computed product-limit values, Greenwood's
//!   variance, left truncation, reverse mode, the tie-corrected hazard
//!   and the `exp(−H)` survival variant.

use crate::core::{
    errors::{SurvError, SurvResult},
    numerics::RunningSum,
    validation::{check_binary_status, check_finite, check_len, resolve_weights},
};

/// How the survival curve is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurvivalType {
    /// Product-limit (Kaplan–Meier) estimator.
    #[default]
    ProductLimit,
    /// `exp(−H)` from the cumulative hazard.
    ExpCumHaz,
}

/// How the cumulative hazard increments treat tied events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HazardType {
    /// `d / n`.
    #[default]
    NelsonAalen,
    /// Tie-corrected: `Σ_{j<m} (d/m) / (n − j·d/m)`.
    FlemingHarrington,
}

/// Survival and hazard choice for [`survfitkm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComputationType {
    pub survival: SurvivalType,
    pub hazard: HazardType,
}

impl ComputationType {
    pub fn new(survival: SurvivalType, hazard: HazardType) -> Self {
        ComputationType { survival, hazard }
    }

    /// Decode an integer code: `2·survival + hazard`, each 0-based.
    ///
    /// | code | survival      | hazard            |
    /// |------|---------------|-------------------|
    /// | 0    | product-limit | Nelson–Aalen      |
    /// | 1    | product-limit | Fleming–Harrington|
    /// | 2    | exp(−H)       | Nelson–Aalen      |
    /// | 3    | exp(−H)       | Fleming–Harrington|
    pub fn from_code(code: u8) -> SurvResult<Self> {
        let survival = match code / 2 {
            0 => SurvivalType::ProductLimit,
            1 => SurvivalType::ExpCumHaz,
            _ => {
                return Err(SurvError::InvalidMethod {
                    name: code.to_string(),
                    reason: "computation type code must be in 0..=3",
                });
            }
        };
        let hazard =
            if code % 2 == 0 { HazardType::NelsonAalen } else { HazardType::FlemingHarrington };
        Ok(ComputationType { survival, hazard })
    }
}

/// KaplanMeier — per-time output of [`survfitkm`].
///
/// All fields are parallel vectors over the distinct observation times.
/// Counts are weighted.
#[derive(Debug, Clone, PartialEq)]
pub struct KaplanMeier {
    pub time: Vec<f64>,
    pub n_risk: Vec<f64>,
    pub n_event: Vec<f64>,
    pub n_censor: Vec<f64>,
    pub n_enter: Vec<f64>,
    pub estimate: Vec<f64>,
    pub std_err: Vec<f64>,
    pub cumhaz: Vec<f64>,
    pub std_chaz: Vec<f64>,
}

impl KaplanMeier {
    fn with_capacity(k: usize) -> Self {
        KaplanMeier {
            time: Vec::with_capacity(k),
            n_risk: Vec::with_capacity(k),
            n_event: Vec::with_capacity(k),
            n_censor: Vec::with_capacity(k),
            n_enter: Vec::with_capacity(k),
            estimate: Vec::with_capacity(k),
            std_err: Vec::with_capacity(k),
            cumhaz: Vec::with_capacity(k),
            std_chaz: Vec::with_capacity(k),
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Smallest time at which the estimate drops to 0.5 or below.
    pub fn median(&self) -> Option<f64> {
        self.estimate.iter().position(|&s| s <= 0.5).map(|k| self.time[k])
    }
}

/// Tie-aware hazard increment and its variance contribution.
fn hazard_step(n: f64, d: f64, m: usize, hazard: HazardType) -> (f64, f64) {
    match hazard {
        HazardType::NelsonAalen => (d / n, d / (n * n)),
        HazardType::FlemingHarrington => {
            let mf = m as f64;
            let share = d / mf;
            let mut dh = 0.0;
            let mut dv = 0.0;
            for j in 0..m {
                let r = n - j as f64 * share;
                dh += share / r;
                dv += share / (r * r);
            }
            (dh, dv)
        }
    }
}

/// Kaplan–Meier / Nelson–Aalen estimator.
///
/// Parameters
/// ----------
/// - `time`: `&[f64]`
///   Exit (event or censoring) times, in any order.
/// - `status`: `&[i32]`
///   0 = censored, 1 = event.
/// - `weights`: `Option<&[f64]>`
///   Case weights; default 1.0.
/// - `entry_times`: `Option<&[f64]>`
///   Left-truncation times; a row is at risk on `(entry, time]`.
/// - `position`: `Option<&[i32]>`
///   Bit flags (1 = first row, 2 = last row of a subject), values 0..=3.
/// - `reverse`: `bool`
///   Estimate the censoring distribution instead.
/// - `computation_type`: [`ComputationType`]
///
/// Returns
/// -------
/// `SurvResult<KaplanMeier>` with one entry per distinct time.
///
/// Errors
/// ------
/// - `DimensionMismatch` for length disagreements.
/// - `InvalidValue` for non-finite times, bad status or position codes,
///   non-positive weights, or `entry >= time`.
/// - `NumericDegeneracy` if events occur where the risk set is empty.
///
/// Examples
/// --------
/// ```rust
/// use rust_survival::estimators::{survfitkm, ComputationType};
///
/// let time = [1.0, 2.0, 3.0, 4.0];
/// let status = [1, 0, 1, 1];
/// let km = survfitkm(&time, &status, None, None, None, false, ComputationType::default()).unwrap();
/// assert_eq!(km.estimate, vec![0.75, 0.75, 0.375, 0.0]);
/// ```
pub fn survfitkm(
    time: &[f64], status: &[i32], weights: Option<&[f64]>, entry_times: Option<&[f64]>,
    position: Option<&[i32]>, reverse: bool, computation_type: ComputationType,
) -> SurvResult<KaplanMeier> {
    let n = time.len();
    check_len("status", n, status.len())?;
    check_finite("time", time)?;
    check_binary_status("status", status)?;
    let wt = resolve_weights(weights, n)?;
    if let Some(entry) = entry_times {
        check_len("entry_times", n, entry.len())?;
        check_finite("entry_times", entry)?;
        for i in 0..n {
            if entry[i] >= time[i] {
                return Err(SurvError::InvalidValue {
                    name: "entry_times",
                    value: entry[i],
                    reason: "Entry time must be strictly less than exit time.",
                });
            }
        }
    }
    if let Some(pos) = position {
        check_len("position", n, pos.len())?;
        for &p in pos {
            if !(0..=3).contains(&p) {
                return Err(SurvError::InvalidValue {
                    name: "position",
                    value: f64::from(p),
                    reason: "Position flags must be in 0..=3.",
                });
            }
        }
    }
    let is_first = |i: usize| position.map_or(true, |p| p[i] & 1 != 0);
    let is_last = |i: usize| position.map_or(true, |p| p[i] & 2 != 0);

    let mut by_exit: Vec<usize> = (0..n).collect();
    by_exit.sort_by(|&a, &b| time[a].total_cmp(&time[b]));
    let mut by_entry: Vec<usize> = (0..n).collect();
    if let Some(entry) = entry_times {
        by_entry.sort_by(|&a, &b| entry[a].total_cmp(&entry[b]));
    }

    let mut out = KaplanMeier::with_capacity(n);
    let mut entered = RunningSum::new();
    let mut exited = RunningSum::new();
    if entry_times.is_none() {
        wt.iter().for_each(|&w| entered.add(w));
    }
    let mut pe = 0;
    let mut surv: f64 = 1.0;
    let mut greenwood: f64 = 0.0;
    let mut cumhaz: f64 = 0.0;
    let mut var_chaz: f64 = 0.0;

    let mut p = 0;
    while p < n {
        let t = time[by_exit[p]];

        let mut n_enter = 0.0;
        if let Some(entry) = entry_times {
            while pe < n && entry[by_entry[pe]] < t {
                let row = by_entry[pe];
                entered.add(wt[row]);
                if is_first(row) {
                    n_enter += wt[row];
                }
                pe += 1;
            }
        }
        let at_risk = entered.value() - exited.value();

        let mut deaths = 0.0;
        let mut censored = 0.0;
        let mut n_deaths = 0usize;
        let mut n_censored = 0usize;
        let mut q = p;
        while q < n && time[by_exit[q]] == t {
            let row = by_exit[q];
            if status[row] == 1 {
                deaths += wt[row];
                n_deaths += 1;
            } else if is_last(row) {
                censored += wt[row];
                n_censored += 1;
            }
            q += 1;
        }

        let (events, tied, risk) = if reverse {
            (censored, n_censored, at_risk - deaths)
        } else {
            (deaths, n_deaths, at_risk)
        };

        if events > 0.0 {
            if risk <= 0.0 {
                return Err(SurvError::NumericDegeneracy {
                    index: by_exit[p],
                    reason: "events observed with an empty risk set",
                });
            }
            let (dh, dv) = hazard_step(risk, events, tied, computation_type.hazard);
            cumhaz += dh;
            var_chaz += dv;
            match computation_type.survival {
                SurvivalType::ProductLimit => {
                    if risk - events > 0.0 {
                        surv *= 1.0 - events / risk;
                        greenwood += events / (risk * (risk - events));
                    } else {
                        surv = 0.0;
                    }
                }
                SurvivalType::ExpCumHaz => surv = (-cumhaz).exp(),
            }
        }
        let std_err = match computation_type.survival {
            SurvivalType::ProductLimit => surv * greenwood.sqrt(),
            SurvivalType::ExpCumHaz => surv * var_chaz.sqrt(),
        };

        out.time.push(t);
        out.n_risk.push(risk);
        out.n_event.push(events);
        out.n_censor.push(if reverse { deaths } else { censored });
        out.n_enter.push(n_enter);
        out.estimate.push(surv);
        out.std_err.push(std_err);
        out.cumhaz.push(cumhaz);
        out.std_chaz.push(var_chaz.sqrt());

        for &row in &by_exit[p..q] {
            exited.add(wt[row]);
        }
        p = q;
    }

    log::debug!(
        "survfitkm: n = {n}, distinct times = {}, reverse = {reverse}, final estimate = {}",
        out.len(),
        out.estimate.last().copied().unwrap_or(1.0)
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Product-limit estimates, monotonicity and Greenwood variance.
    // - Left truncation, position flags and reverse mode.
    // - Tie-corrected hazard and the exp(−H) survival variant.
    // - Computation type decoding.
    // -------------------------------------------------------------------------

    fn km(time: &[f64], status: &[i32]) -> KaplanMeier {
        survfitkm(time, status, None, None, None, false, ComputationType::default()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The forward estimate is below one after the first event, never
    // increases, and has one entry per distinct time.
    //
    // Given
    // -----
    // - time = [1..8], status = [1, 1, 0, 1, 0, 1, 1, 0].
    //
    // Expect
    // ------
    // - 8 entries, estimate[0] = 7/8, non-increasing sequence.
    fn survfitkm_forward_estimate_is_monotone_non_increasing() {
        // Arrange
        let time = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let status = [1, 1, 0, 1, 0, 1, 1, 0];

        // Act
        let out = km(&time, &status);

        // Assert
        assert_eq!(out.len(), 8);
        assert!(out.estimate[0] < 1.0);
        assert_abs_diff_eq!(out.estimate[0], 7.0 / 8.0, epsilon = 1e-12);
        for k in 1..out.len() {
            assert!(out.estimate[k] <= out.estimate[k - 1], "estimate increased at {k}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Greenwood standard errors are zero before the first event and match
    // the closed form afterwards.
    //
    // Given
    // -----
    // - time = [1, 2, 3, 4], status = [0, 1, 0, 1].
    //
    // Expect
    // ------
    // - std_err[0] = 0.
    // - std_err[1] = (2/3)·sqrt(1/(3·2)).
    // - The last time empties the risk set: estimate 0.
    fn survfitkm_greenwood_zero_before_first_event_and_closed_form_after() {
        // Arrange
        let time = [1.0, 2.0, 3.0, 4.0];
        let status = [0, 1, 0, 1];

        // Act
        let out = km(&time, &status);

        // Assert
        assert_eq!(out.std_err[0], 0.0);
        assert_abs_diff_eq!(out.std_err[1], (2.0 / 3.0) * (1.0_f64 / 6.0).sqrt(), epsilon = 1e-12);
        assert_eq!(out.estimate[3], 0.0);
        assert!(out.std_err.iter().all(|&s| s >= 0.0));
    }

    #[test]
    // Purpose
    // -------
    // A censoring tied with an event stays in the risk set at that time.
    //
    // Given
    // -----
    // - time = [2, 2, 3], status = [1, 0, 1].
    //
    // Expect
    // ------
    // - n_risk[0] = 3, estimate[0] = 2/3, n_censor[0] = 1.
    fn survfitkm_tied_censoring_is_at_risk() {
        // Act
        let out = km(&[2.0, 2.0, 3.0], &[1, 0, 1]);

        // Assert
        assert_eq!(out.n_risk[0], 3.0);
        assert_eq!(out.n_censor[0], 1.0);
        assert_abs_diff_eq!(out.estimate[0], 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Late entries only join the risk set after their entry time.
    //
    // Given
    // -----
    // - Rows (entry, time, status): (0,1,1), (0,3,1), (2,4,1), (0,4,0).
    //
    // Expect
    // ------
    // - n_risk = [3, 3, 2] at times [1, 3, 4].
    // - n_enter = [3, 1, 0].
    fn survfitkm_left_truncation_delays_risk_entry() {
        // Arrange
        let entry = [0.0, 0.0, 2.0, 0.0];
        let time = [1.0, 3.0, 4.0, 4.0];
        let status = [1, 1, 1, 0];

        // Act
        let out = survfitkm(
            &time,
            &status,
            None,
            Some(&entry),
            None,
            false,
            ComputationType::default(),
        )
        .unwrap();

        // Assert
        assert_eq!(out.time, vec![1.0, 3.0, 4.0]);
        assert_eq!(out.n_risk, vec![3.0, 3.0, 2.0]);
        assert_eq!(out.n_enter, vec![3.0, 1.0, 0.0]);
    }

    #[test]
    fn survfitkm_position_flags_suppress_intermediate_censoring() {
        let entry = [0.0, 2.0];
        let time = [2.0, 5.0];
        let status = [0, 1];
        let position = [1, 2];

        let out = survfitkm(
            &time,
            &status,
            None,
            Some(&entry),
            Some(&position),
            false,
            ComputationType::default(),
        )
        .unwrap();

        assert_eq!(out.n_censor, vec![0.0, 0.0]);
        assert_eq!(out.n_enter, vec![1.0, 0.0]);
    }

    #[test]
    // Purpose
    // -------
    // Reverse mode estimates the censoring distribution, removing tied
    // deaths from the risk set.
    //
    // Given
    // -----
    // - time = [1, 2, 2, 3], status = [1, 0, 1, 1].
    //
    // Expect
    // ------
    // - At t = 2 the censoring risk set is 3 − 1 = 2, so the estimate is
    //   1/2 from t = 2 onward.
    fn survfitkm_reverse_estimates_censoring_distribution() {
        // Act
        let out = survfitkm(
            &[1.0, 2.0, 2.0, 3.0],
            &[1, 0, 1, 1],
            None,
            None,
            None,
            true,
            ComputationType::default(),
        )
        .unwrap();

        // Assert
        assert_eq!(out.estimate, vec![1.0, 0.5, 0.5]);
        assert_eq!(out.n_risk[1], 2.0);
        assert_eq!(out.n_censor, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    // Purpose
    // -------
    // The tie-corrected hazard spreads tied events over shrinking risk
    // sets and exp(−H) uses it.
    //
    // Given
    // -----
    // - time = [1, 1, 2], all events, code 3 (exp(−H), tie-corrected).
    //
    // Expect
    // ------
    // - H(1) = 1/3 + 1/2, H(2) = H(1) + 1, estimate = exp(−H).
    fn survfitkm_fleming_harrington_hazard_with_exp_survival() {
        // Arrange
        let ctype = ComputationType::from_code(3).unwrap();

        // Act
        let out = survfitkm(&[1.0, 1.0, 2.0], &[1, 1, 1], None, None, None, false, ctype).unwrap();

        // Assert
        let h1 = 1.0 / 3.0 + 0.5;
        assert_abs_diff_eq!(out.cumhaz[0], h1, epsilon = 1e-12);
        assert_abs_diff_eq!(out.cumhaz[1], h1 + 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.estimate[0], (-h1).exp(), epsilon = 1e-12);
    }

    #[test]
    fn survfitkm_weights_scale_counts() {
        let out = survfitkm(
            &[1.0, 2.0],
            &[1, 1],
            Some(&[3.0, 1.0]),
            None,
            None,
            false,
            ComputationType::default(),
        )
        .unwrap();
        assert_eq!(out.n_risk, vec![4.0, 1.0]);
        assert_abs_diff_eq!(out.estimate[0], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn computation_type_from_code_rejects_out_of_range() {
        assert!(matches!(ComputationType::from_code(4), Err(SurvError::InvalidMethod { .. })));
        assert_eq!(
            ComputationType::from_code(1).unwrap(),
            ComputationType::new(SurvivalType::ProductLimit, HazardType::FlemingHarrington)
        );
    }

    #[test]
    fn survfitkm_entry_not_before_exit_returns_invalid_value() {
        let result = survfitkm(
            &[1.0],
            &[1],
            None,
            Some(&[1.0]),
            None,
            false,
            ComputationType::default(),
        );
        assert!(matches!(result, Err(SurvError::InvalidValue { name: "entry_times", .. })));
    }

    #[test]
    fn kaplan_meier_median_is_first_time_at_or_below_half() {
        let out = km(&[1.0, 2.0, 3.0, 4.0], &[1, 1, 1, 1]);
        assert_eq!(out.median(), Some(2.0));
    }
}
