//! riskset::norisk — flag rows that never enter a risk set.
//!
//! A row of (start, stop] data contributes nothing to a Cox fit when no
//! event of its stratum falls inside its interval. Such rows are commonly
//! dropped before fitting; this module identifies them in O(n log n) by
//! binary-searching each interval against the stratum's sorted event times.

use std::collections::BTreeMap;

use crate::core::{
    errors::SurvResult,
    validation::{check_binary_status, check_finite, check_len, resolve_strata},
};

/// Return `true` for every row whose interval `(time1, time2]` contains no
/// event time of its own stratum.
///
/// Errors
/// ------
/// - `DimensionMismatch` for length disagreements.
/// - `InvalidValue` for non-finite times or status codes other than 0/1.
pub fn norisk(
    time1: &[f64], time2: &[f64], status: &[i32], strata: Option<&[i64]>,
) -> SurvResult<Vec<bool>> {
    let n = time2.len();
    check_len("time1", n, time1.len())?;
    check_len("status", n, status.len())?;
    check_finite("time1", time1)?;
    check_finite("time2", time2)?;
    check_binary_status("status", status)?;
    let strata = resolve_strata(strata, n)?;

    let mut deaths: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for i in 0..n {
        if status[i] == 1 {
            deaths.entry(strata[i]).or_default().push(time2[i]);
        }
    }
    for times in deaths.values_mut() {
        times.sort_by(f64::total_cmp);
    }

    let flags = (0..n)
        .map(|i| match deaths.get(&strata[i]) {
            None => true,
            Some(times) => {
                let first_after_start = times.partition_point(|&t| t <= time1[i]);
                first_after_start == times.len() || times[first_after_start] > time2[i]
            }
        })
        .collect();
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Rows whose interval straddles no event are flagged; rows covering an
    // event (including their own) are not.
    //
    // Given
    // -----
    // - Events at t = 2 (row 0) and t = 5 (row 2) in one stratum.
    // - Row 1 spans (2, 4], which excludes 2 and contains no event.
    // - Row 3 sits in another stratum with no events.
    //
    // Expect
    // ------
    // - flags = [false, true, false, true].
    fn norisk_flags_intervals_without_events() {
        // Arrange
        let time1 = [0.0, 2.0, 3.0, 0.0];
        let time2 = [2.0, 4.0, 5.0, 9.0];
        let status = [1, 0, 1, 0];
        let strata = [0, 0, 0, 1];

        // Act
        let flags = norisk(&time1, &time2, &status, Some(&strata)).unwrap();

        // Assert
        assert_eq!(flags, vec![false, true, false, true]);
    }
}
