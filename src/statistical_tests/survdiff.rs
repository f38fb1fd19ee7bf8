//! statistical_tests::survdiff — G-rho family of k-sample log-rank tests.
//!
//! Purpose
//! -------
//! Compare survival across groups with the Fleming–Harrington G(ρ) family
//! of weighted log-rank tests, optionally stratified. ρ = 0 is the classic
//! log-rank test and ρ = 1 the Peto–Peto modification of the Wilcoxon test.
//!
//! Key behaviors
//! -------------
//! - Within each stratum, walk the distinct times in ascending order,
//!   carrying the left-continuous pooled Kaplan–Meier estimate `S(t−)`.
//!   Each time's contributions are weighted by `w = S(t−)^ρ`.
//! - Observed and expected event counts accumulate per group:
//!   `O_j += w·d_j`, `E_j += w·d·n_j/N`.
//! - The hypergeometric covariance accumulates as
//!   `V_jk += w²·d(N−d)/(N²(N−1))·(n_j·δ_jk·N − n_j·n_k)`, skipping times
//!   with `N = 1`.
//! - Strata are summed before forming the statistic.
//! - The statistic is `χ² = (O−E)ᵀ V⁻ (O−E)`, where `V⁻` is the
//!   eigen-based pseudo-inverse (V is singular by construction). The
//!   degrees of freedom equal the numerical rank of `V`, and the p-value
//!   comes from the χ²(df) upper tail.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Σ O = Σ E` for every stratum.
//! - Relabelling groups permutes `O`, `E` and `V` but leaves `χ²`
//!   unchanged.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::core::{
    errors::{SurvError, SurvResult},
    numerics::EIGEN_EPS,
    validation::{check_binary_status, check_finite, check_len, resolve_strata},
};

/// LogRank — outcome of [`survdiff2`].
///
/// Fields
/// ------
/// - `groups`: sorted distinct group labels; all per-group vectors follow
///   this order.
/// - `n`: number of rows per group.
/// - `observed`, `expected`: ρ-weighted observed and expected events.
/// - `variance`: `(ngroup, ngroup)` covariance of `observed − expected`.
/// - `chi_squared`, `df`, `p_value`: the test statistic, its degrees of
///   freedom (rank of `variance`) and upper-tail probability.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRank {
    pub groups: Vec<i64>,
    pub n: Vec<usize>,
    pub observed: Vec<f64>,
    pub expected: Vec<f64>,
    pub variance: Array2<f64>,
    pub chi_squared: f64,
    pub df: usize,
    pub p_value: f64,
}

/// Weighted log-rank test across groups, optionally stratified.
///
/// Parameters
/// ----------
/// - `time`: `&[f64]`
///   Follow-up times, any order.
/// - `status`: `&[i32]`
///   0 = censored, 1 = event.
/// - `group`: `&[i64]`
///   Group label per row.
/// - `strata`: `Option<&[i64]>`
///   Stratum label per row; `None` is an unstratified test.
/// - `rho`: `f64`
///   Fleming–Harrington exponent, finite and `>= 0`.
///
/// Returns
/// -------
/// `SurvResult<LogRank>`.
///
/// Errors
/// ------
/// - `DimensionMismatch` for length disagreements.
/// - `InvalidValue` for non-finite times, bad status codes, or invalid `rho`.
///
/// Notes
/// -----
/// - With a single group the statistic is 0 with `df = 0` and
///   `p_value = 1`.
pub fn survdiff2(
    time: &[f64], status: &[i32], group: &[i64], strata: Option<&[i64]>, rho: f64,
) -> SurvResult<LogRank> {
    let n = time.len();
    check_len("status", n, status.len())?;
    check_len("group", n, group.len())?;
    check_finite("time", time)?;
    check_binary_status("status", status)?;
    if !(rho.is_finite() && rho >= 0.0) {
        return Err(SurvError::InvalidValue {
            name: "rho",
            value: rho,
            reason: "rho must be finite and non-negative.",
        });
    }
    let strata = resolve_strata(strata, n)?;

    let mut labels: Vec<i64> = group.to_vec();
    labels.sort_unstable();
    labels.dedup();
    let slot: BTreeMap<i64, usize> = labels.iter().enumerate().map(|(k, &g)| (g, k)).collect();
    let ng = labels.len();
    let gidx: Vec<usize> = group.iter().map(|g| slot[g]).collect();

    let mut counts = vec![0usize; ng];
    gidx.iter().for_each(|&g| counts[g] += 1);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| strata[a].cmp(&strata[b]).then(time[a].total_cmp(&time[b])));

    let mut observed = vec![0.0; ng];
    let mut expected = vec![0.0; ng];
    let mut variance = Array2::<f64>::zeros((ng, ng));

    let mut begin = 0;
    while begin < n {
        let mut end = begin;
        while end < n && strata[order[end]] == strata[order[begin]] {
            end += 1;
        }
        let rows = &order[begin..end];

        let mut at_risk = vec![0.0; ng];
        rows.iter().for_each(|&r| at_risk[gidx[r]] += 1.0);
        let mut km: f64 = 1.0;

        let mut p = 0;
        while p < rows.len() {
            let t = time[rows[p]];
            let mut q = p;
            let mut deaths = vec![0.0; ng];
            let mut leaving = vec![0.0; ng];
            while q < rows.len() && time[rows[q]] == t {
                let r = rows[q];
                deaths[gidx[r]] += f64::from(status[r]);
                leaving[gidx[r]] += 1.0;
                q += 1;
            }
            let d: f64 = deaths.iter().sum();
            let total: f64 = at_risk.iter().sum();
            if d > 0.0 {
                let w = if rho == 0.0 { 1.0 } else { km.powf(rho) };
                for j in 0..ng {
                    observed[j] += w * deaths[j];
                    expected[j] += w * d * at_risk[j] / total;
                }
                if total > 1.0 {
                    let factor = w * w * d * (total - d) / (total * total * (total - 1.0));
                    for j in 0..ng {
                        let nj = at_risk[j];
                        variance[[j, j]] += factor * nj * total;
                        for k in 0..ng {
                            variance[[j, k]] -= factor * nj * at_risk[k];
                        }
                    }
                }
                km *= 1.0 - d / total;
            }
            for j in 0..ng {
                at_risk[j] -= leaving[j];
            }
            p = q;
        }
        begin = end;
    }

    let diff: Vec<f64> = (0..ng).map(|j| observed[j] - expected[j]).collect();
    let (chi_squared, df) = generalized_quadratic_form(&variance, &diff);
    let p_value = if df == 0 {
        1.0
    } else {
        let dist = ChiSquared::new(df as f64).map_err(|_| SurvError::InvalidValue {
            name: "df",
            value: df as f64,
            reason: "Chi-squared degrees of freedom must be positive.",
        })?;
        dist.sf(chi_squared)
    };

    log::debug!("survdiff2: groups = {ng}, rho = {rho}, chisq = {chi_squared:.4}, df = {df}");
    Ok(LogRank {
        groups: labels,
        n: counts,
        observed,
        expected,
        variance,
        chi_squared,
        df,
        p_value,
    })
}

/// `zᵀ V⁻ z` and the numerical rank of symmetric `V`.
///
/// Eigenvalues at or below `EIGEN_EPS · max|λ|` are treated as zero.
fn generalized_quadratic_form(v: &Array2<f64>, z: &[f64]) -> (f64, usize) {
    let m = z.len();
    if m == 0 {
        return (0.0, 0);
    }
    let vm = DMatrix::from_fn(m, m, |i, j| v[[i, j]]);
    let zv = DVector::from_column_slice(z);
    let eig = vm.symmetric_eigen();
    let max_abs = eig.eigenvalues.iter().fold(0.0_f64, |acc, &l| acc.max(l.abs()));
    if max_abs == 0.0 {
        return (0.0, 0);
    }
    let tol = EIGEN_EPS * max_abs;
    let mut stat = 0.0;
    let mut rank = 0;
    for (k, &lambda) in eig.eigenvalues.iter().enumerate() {
        if lambda > tol {
            let proj = eig.eigenvectors.column(k).dot(&zv);
            stat += proj * proj / lambda;
            rank += 1;
        }
    }
    (stat, rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - A hand-computed two-group statistic.
    // - Label-permutation invariance of χ² and the O/E balance.
    // - Fleming–Harrington weighting and stratification.
    // - Validation of rho.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check the statistic on the smallest non-trivial two-group example.
    //
    // Given
    // -----
    // - Group 0 dies at t = 1, group 1 dies at t = 2.
    //
    // Expect
    // ------
    // - O = [1, 1], E = [0.5, 1.5], V = [[.25, −.25], [−.25, .25]].
    // - χ² = 1 with df = 1.
    fn survdiff2_two_single_deaths_matches_hand_values() {
        // Act
        let out = survdiff2(&[1.0, 2.0], &[1, 1], &[0, 1], None, 0.0).unwrap();

        // Assert
        assert_eq!(out.observed, vec![1.0, 1.0]);
        assert_abs_diff_eq!(out.expected[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out.expected[1], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out.variance[[0, 1]], -0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(out.chi_squared, 1.0, epsilon = 1e-10);
        assert_eq!(out.df, 1);
        assert!((0.0..=1.0).contains(&out.p_value));
    }

    #[test]
    // Purpose
    // -------
    // Swapping group labels leaves χ² unchanged and flips O − E.
    //
    // Given
    // -----
    // - Ten rows in two groups, with ties and censoring, labelled {1, 2}
    //   and then {2, 1}.
    //
    // Expect
    // ------
    // - Equal χ²; O − E of group "1" in one labelling equals minus that of
    //   group "1" in the other; Σ O = Σ E.
    fn survdiff2_label_swap_keeps_chi_squared() {
        // Arrange
        let time = [1.0, 2.0, 2.0, 3.0, 4.0, 5.0, 5.0, 6.0, 7.0, 8.0];
        let status = [1, 1, 0, 1, 1, 0, 1, 1, 0, 1];
        let g1 = [1, 1, 2, 1, 2, 2, 1, 2, 2, 1];
        let g2: Vec<i64> = g1.iter().map(|&g| 3 - g).collect();

        // Act
        let a = survdiff2(&time, &status, &g1, None, 0.0).unwrap();
        let b = survdiff2(&time, &status, &g2, None, 0.0).unwrap();

        // Assert
        assert_abs_diff_eq!(a.chi_squared, b.chi_squared, epsilon = 1e-10);
        let da = a.observed[0] - a.expected[0];
        let db = b.observed[0] - b.expected[0];
        assert_abs_diff_eq!(da, -db, epsilon = 1e-10);
        let so: f64 = a.observed.iter().sum();
        let se: f64 = a.expected.iter().sum();
        assert_abs_diff_eq!(so, se, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // With ρ = 1 the contribution at each time is scaled by the pooled
    // left-continuous KM, so later deaths count less.
    //
    // Given
    // -----
    // - The two-death example with ρ = 1.
    //
    // Expect
    // ------
    // - At t = 2 the weight is S(2−) = 1/2, so O = [1, 0.5].
    fn survdiff2_rho_one_downweights_late_deaths() {
        // Act
        let out = survdiff2(&[1.0, 2.0], &[1, 1], &[0, 1], None, 1.0).unwrap();

        // Assert
        assert_abs_diff_eq!(out.observed[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out.expected[1], 0.5 + 0.5, epsilon = 1e-12);
    }

    #[test]
    fn survdiff2_stratified_sums_strata_contributions() {
        let time = [1.0, 2.0, 1.0, 2.0];
        let status = [1, 1, 1, 1];
        let group = [0, 1, 0, 1];
        let strata = [0, 0, 1, 1];

        let out = survdiff2(&time, &status, &group, Some(&strata), 0.0).unwrap();

        assert_abs_diff_eq!(out.expected[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.variance[[0, 0]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out.chi_squared, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn survdiff2_negative_rho_returns_invalid_value() {
        let result = survdiff2(&[1.0], &[1], &[0], None, -0.5);
        assert!(matches!(result, Err(SurvError::InvalidValue { name: "rho", .. })));
    }

    #[test]
    fn survdiff2_single_group_has_zero_df() {
        let out = survdiff2(&[1.0, 2.0], &[1, 1], &[4, 4], None, 0.0).unwrap();
        assert_eq!(out.df, 0);
        assert_eq!(out.p_value, 1.0);
    }
}
