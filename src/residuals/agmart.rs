//! residuals::agmart — Cox-model martingale residuals.
//!
//! Purpose
//! -------
//! Compute martingale residuals `M_i = δ_i − Ê_i` for (start, stop] data
//! ([`agmart`]) and single-time data ([`coxmart`]), where `Ê_i` is the
//! cumulative hazard accumulated over the row's interval, scaled by the
//! row's risk score.
//!
//! Key behaviors
//! -------------
//! - Hazard increments are computed once per distinct death time from
//!   [`death_time_sums`](super::risksums::death_time_sums), then
//!   prefix-summed per stratum so each row's expected count is a
//!   difference of two binary-searched prefix sums. Total cost is
//!   O(n log n).
//! - Tie handling is selected by [`TieMethod`]:
//!   - Breslow gives every tied death, and every other row at risk, the
//!     full increment `Σw_death / denom`.
//!   - Efron runs one inner step per tied death, removing a fraction
//!     `j/d` of the deaths' own score from the denominator. Rows at risk
//!     receive the full Efron increment, while the tied deaths themselves
//!     receive the `(1 − j/d)`-weighted share.
//!
//! Invariants & assumptions
//! ------------------------
//! - With unit weights the residuals of each stratum sum to zero (up to
//!   rounding).
//! - Residuals are unweighted; case weights enter only through the hazard.

use crate::core::{errors::SurvResult, options::TieMethod};
use crate::residuals::risksums::{death_time_sums, CountingData, DeathTimeSums};

/// Cumulative hazard path for one stratum.
struct HazardPath {
    time: Vec<f64>,
    hazard: Vec<f64>,
    e_hazard: Vec<f64>,
    cum: Vec<f64>,
}

impl HazardPath {
    fn new() -> Self {
        HazardPath { time: Vec::new(), hazard: Vec::new(), e_hazard: Vec::new(), cum: vec![0.0] }
    }

    fn push(&mut self, time: f64, hazard: f64, e_hazard: f64) {
        let last = self.cum[self.cum.len() - 1];
        self.time.push(time);
        self.hazard.push(hazard);
        self.e_hazard.push(e_hazard);
        self.cum.push(last + hazard);
    }

    /// Number of death times `<= t`.
    fn upto(&self, t: f64) -> usize {
        self.time.partition_point(|&s| s <= t)
    }
}

/// Hazard increment at one death time: `(hazard, e_hazard)`.
fn hazard_increment(line: &DeathTimeSums, method: TieMethod) -> (f64, f64) {
    match method {
        TieMethod::Breslow => {
            let h = line.wtsum / line.denom;
            (h, h)
        }
        TieMethod::Efron => {
            let d = line.ndeath as f64;
            let share = line.wtsum / d;
            let mut hazard = 0.0;
            let mut e_hazard = 0.0;
            for j in 0..line.ndeath {
                let frac = j as f64 / d;
                let denom = line.denom - frac * line.e_denom;
                hazard += share / denom;
                e_hazard += share * (1.0 - frac) / denom;
            }
            (hazard, e_hazard)
        }
    }
}

fn martingale(data: &CountingData<'_>, method: TieMethod) -> SurvResult<Vec<f64>> {
    let sums = death_time_sums(data, None)?;
    let mut paths: std::collections::BTreeMap<i64, HazardPath> = Default::default();
    for line in &sums {
        let (h, eh) = hazard_increment(line, method);
        paths.entry(line.stratum).or_insert_with(HazardPath::new).push(line.time, h, eh);
    }

    let resid = (0..data.len())
        .map(|i| {
            let event = f64::from(data.event[i]);
            let Some(path) = paths.get(&data.strata[i]) else {
                return event;
            };
            let lo = data.start.map_or(0, |s| path.upto(s[i]));
            let hi = path.upto(data.stop[i]);
            let mut expected = path.cum[hi] - path.cum[lo];
            if data.event[i] == 1 && hi > lo && path.time[hi - 1] == data.stop[i] {
                expected += path.e_hazard[hi - 1] - path.hazard[hi - 1];
            }
            event - data.score[i] * expected
        })
        .collect();
    Ok(resid)
}

/// Martingale residuals for counting-process (start, stop] data.
///
/// Parameters
/// ----------
/// - `start`, `stop`: `&[f64]`
///   Interval bounds; rows are at risk on `(start, stop]`.
/// - `event`: `&[i32]`
///   Event indicator at `stop` (0/1).
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
/// `SurvResult<Vec<f64>>` with one residual per row, in input order.
///
/// Errors
/// ------
/// - `DimensionMismatch` for length disagreements.
/// - `InvalidValue` for non-finite inputs, bad event codes, non-positive
///   scores or weights, and rows with `start >= stop`.
/// - `NumericDegeneracy` if a death time has an empty weighted risk set.
///
/// Examples
/// --------
/// ```rust
/// use rust_survival::core::TieMethod;
/// use rust_survival::residuals::agmart;
///
/// let start = [0.0, 0.0, 1.0, 1.0, 2.0];
/// let stop = [1.0, 2.0, 2.0, 3.0, 3.0];
/// let event = [1, 0, 1, 0, 1];
/// let score = [1.0; 5];
/// let resid = agmart(&start, &stop, &event, &score, None, None, TieMethod::Breslow).unwrap();
/// assert_eq!(resid.len(), 5);
/// assert!(resid.iter().sum::<f64>().abs() < 1e-12);
/// ```
pub fn agmart(
    start: &[f64], stop: &[f64], event: &[i32], score: &[f64], weight: Option<&[f64]>,
    strata: Option<&[i64]>, method: TieMethod,
) -> SurvResult<Vec<f64>> {
    let data = CountingData::new(Some(start), stop, event, score, weight, strata)?;
    let resid = martingale(&data, method)?;
    log::trace!("agmart: n = {}, method = {method:?}", resid.len());
    Ok(resid)
}

/// Martingale residuals for single-time (right-censored) data.
///
/// Equivalent to [`agmart`] with every row entering at −∞.
pub fn coxmart(
    time: &[f64], status: &[i32], score: &[f64], weight: Option<&[f64]>, strata: Option<&[i64]>,
    method: TieMethod,
) -> SurvResult<Vec<f64>> {
    let data = CountingData::new(None, time, status, score, weight, strata)?;
    martingale(&data, method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Breslow and Efron residuals against hand-computed values.
    // - The zero-sum property under unit weights.
    // - Agreement between coxmart and agmart with a common early start.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check Breslow residuals on untied data.
    //
    // Given
    // -----
    // - time = [1, 2, 3], status = [1, 1, 0], unit scores.
    //
    // Expect
    // ------
    // - Hazard increments 1/3 at t = 1 and 1/2 at t = 2.
    // - Residuals [2/3, 1/6, −5/6].
    fn coxmart_breslow_untied_matches_hand_values() {
        // Arrange
        let time = [1.0, 2.0, 3.0];
        let status = [1, 1, 0];
        let score = [1.0; 3];

        // Act
        let resid = coxmart(&time, &status, &score, None, None, TieMethod::Breslow).unwrap();

        // Assert
        assert_abs_diff_eq!(resid[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(resid[1], 1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(resid[2], -5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Check Efron tie handling on a two-way tie.
    //
    // Given
    // -----
    // - time = [1, 1, 2], all events, unit scores.
    //
    // Expect
    // ------
    // - At t = 1: hazard = 1/3 + 1/2 = 5/6, e_hazard = 1/3 + 1/4 = 7/12.
    // - Residuals [5/12, 5/12, 1 − 5/6 − 1 = −5/6].
    fn coxmart_efron_tied_deaths_receive_fractional_hazard() {
        // Arrange
        let time = [1.0, 1.0, 2.0];
        let status = [1, 1, 1];
        let score = [1.0; 3];

        // Act
        let resid = coxmart(&time, &status, &score, None, None, TieMethod::Efron).unwrap();

        // Assert
        assert_abs_diff_eq!(resid[0], 5.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(resid[1], 5.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(resid[2], -5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Residuals from counting-process data with arbitrary scores sum to
    // zero per stratum under both tie methods.
    //
    // Given
    // -----
    // - Five (start, stop] rows with a tie at t = 2 and two strata copies.
    //
    // Expect
    // ------
    // - |Σ resid| < 1e-12 for Breslow and Efron.
    fn agmart_residuals_sum_to_zero_with_unit_weights() {
        // Arrange
        let start = [0.0, 0.0, 1.0, 1.0, 2.0, 0.0, 0.0, 1.0, 1.0, 2.0];
        let stop = [1.0, 2.0, 2.0, 3.0, 3.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let event = [1, 1, 1, 0, 1, 1, 0, 1, 0, 1];
        let score = [0.5, 1.2, 2.0, 0.7, 1.1, 1.0, 1.0, 1.0, 1.0, 1.0];
        let strata = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1];

        for method in [TieMethod::Breslow, TieMethod::Efron] {
            // Act
            let resid =
                agmart(&start, &stop, &event, &score, None, Some(&strata), method).unwrap();

            // Assert
            let s0: f64 = resid[..5].iter().sum();
            let s1: f64 = resid[5..].iter().sum();
            assert!(s0.abs() < 1e-12, "{method:?}: stratum 0 sum {s0}");
            assert!(s1.abs() < 1e-12, "{method:?}: stratum 1 sum {s1}");
        }
    }

    #[test]
    fn coxmart_equals_agmart_with_common_early_start() {
        let time = [2.0, 1.0, 3.0, 3.0, 5.0];
        let status = [1, 0, 1, 1, 0];
        let score = [1.5, 0.5, 1.0, 2.0, 1.0];
        let start = [-1.0; 5];

        let a = coxmart(&time, &status, &score, None, None, TieMethod::Efron).unwrap();
        let b = agmart(&start, &time, &status, &score, None, None, TieMethod::Efron).unwrap();

        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn agmart_start_after_stop_returns_invalid_value() {
        let result = agmart(&[2.0], &[1.0], &[1], &[1.0], None, None, TieMethod::Breslow);
        assert!(result.is_err());
    }
}
