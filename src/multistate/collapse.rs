//! multistate::collapse — merge contiguous same-state intervals per subject.
//!
//! Purpose
//! -------
//! Multi-state data often arrives split into many `(time1, time2]` rows per
//! subject, for example after time-dependent covariates were attached.
//! When neighbouring rows of one subject carry the same covariate value,
//! state and weight, and the earlier row ends in censoring exactly where
//! the next begins, the split carries no information. This module
//! collapses such runs into single rows.
//!
//! Key behaviors
//! -------------
//! - Rows are visited in the caller's `order` (default: by `id`, then
//!   `time1`). A run keeps the first row's `time1` and takes `time2` and
//!   `status` from its last row.
//! - A row with `status != 0` always ends its run; a transition starts a
//!   new row.
//!
//! Invariants & assumptions
//! ------------------------
//! - Within each subject, `time1` is non-decreasing along `order`.
//!   Violations return `InvalidOrder`.
//! - `time1 < time2` on every row.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use crate::core::{
    errors::{SurvError, SurvResult},
    validation::{check_len, check_permutation, resolve_weights},
};

/// Column names of [`Collapsed::matrix`].
pub const COLLAPSE_COLUMNS: [&str; 7] =
    ["time1", "time2", "status", "x", "istate", "id", "weight"];

/// Collapsed — output of [`collapse`].
///
/// Fields
/// ------
/// - `matrix`: `(m, 7)` rows laid out as [`COLLAPSE_COLUMNS`].
/// - `dimnames`: the column names, for callers that want them alongside
///   the matrix.
/// - `first_row` / `last_row`: 0-based input rows opening and closing each
///   merged run.
#[derive(Debug, Clone, PartialEq)]
pub struct Collapsed {
    pub matrix: Array2<f64>,
    pub dimnames: Vec<String>,
    pub first_row: Vec<usize>,
    pub last_row: Vec<usize>,
}

impl Collapsed {
    pub fn len(&self) -> usize {
        self.first_row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_row.is_empty()
    }
}

/// Collapse adjacent same-state intervals of each subject.
///
/// Parameters
/// ----------
/// - `y`: `ArrayView2<f64>`
///   `(n, 3)` columns (time1, time2, status).
/// - `x`: `&[i64]`
///   Covariate code; runs only merge when it is unchanged.
/// - `istate`: `&[i64]`
///   Current state of each row.
/// - `id`: `&[i64]`
///   Subject identifier.
/// - `weight`: `Option<&[f64]>`
///   Case weights; default 1.0. Runs only merge under equal weight.
/// - `order`: `Option<&[usize]>`
///   Processing order; a permutation of `0..n`.
///
/// Returns
/// -------
/// `SurvResult<Collapsed>`.
///
/// Errors
/// ------
/// - `DimensionMismatch` when `y` is not `(n, 3)` or lengths differ.
/// - `InvalidValue` for non-finite times or `time1 >= time2`.
/// - `InvalidOrder` when `order` is not a permutation, or when `time1`
///   decreases within a subject along it.
///
/// Examples
/// --------
/// ```rust
/// use ndarray::array;
/// use rust_survival::multistate::collapse;
///
/// let y = array![[1.0, 2.0, 0.0], [2.0, 3.0, 1.0]];
/// let out = collapse(y.view(), &[0, 0], &[1, 1], &[7, 7], None, None).unwrap();
/// assert_eq!(out.matrix.row(0).to_vec()[..3], [1.0, 3.0, 1.0]);
/// ```
pub fn collapse(
    y: ArrayView2<f64>, x: &[i64], istate: &[i64], id: &[i64], weight: Option<&[f64]>,
    order: Option<&[usize]>,
) -> SurvResult<Collapsed> {
    let n = y.nrows();
    check_len("y", 3, y.ncols())?;
    check_len("x", n, x.len())?;
    check_len("istate", n, istate.len())?;
    check_len("id", n, id.len())?;
    let wt = resolve_weights(weight, n)?;
    let (time1, time2, status) = (y.column(0), y.column(1), y.column(2));
    for i in 0..n {
        if !time1[i].is_finite() || !time2[i].is_finite() || !status[i].is_finite() {
            return Err(SurvError::InvalidValue {
                name: "y",
                value: f64::NAN,
                reason: "Must be finite.",
            });
        }
        if time1[i] >= time2[i] {
            return Err(SurvError::InvalidValue {
                name: "y",
                value: time1[i],
                reason: "Interval start must be strictly less than stop.",
            });
        }
    }

    let order: Vec<usize> = match order {
        Some(order) => {
            check_permutation("order", order, n)?;
            order.to_vec()
        }
        None => {
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| id[a].cmp(&id[b]).then(time1[a].total_cmp(&time1[b])));
            order
        }
    };

    let mut last_start: BTreeMap<i64, f64> = BTreeMap::new();
    for (pos, &row) in order.iter().enumerate() {
        if let Some(&prev) = last_start.get(&id[row]) {
            if time1[row] < prev {
                return Err(SurvError::InvalidOrder {
                    index: pos,
                    reason: "time1 must be non-decreasing within each id",
                });
            }
        }
        last_start.insert(id[row], time1[row]);
    }

    let mut first_row = Vec::new();
    let mut last_row = Vec::new();
    let mut pos = 0;
    while pos < n {
        let first = order[pos];
        let mut last = first;
        while pos + 1 < n {
            let next = order[pos + 1];
            let joins = status[last] == 0.0
                && id[last] == id[next]
                && x[last] == x[next]
                && istate[last] == istate[next]
                && wt[last] == wt[next]
                && time2[last] == time1[next];
            if !joins {
                break;
            }
            last = next;
            pos += 1;
        }
        first_row.push(first);
        last_row.push(last);
        pos += 1;
    }

    let m = first_row.len();
    let matrix = Array2::from_shape_fn((m, COLLAPSE_COLUMNS.len()), |(r, c)| {
        let (a, b) = (first_row[r], last_row[r]);
        match c {
            0 => time1[a],
            1 => time2[b],
            2 => status[b],
            3 => x[a] as f64,
            4 => istate[a] as f64,
            5 => id[a] as f64,
            _ => wt[a],
        }
    });
    log::debug!("collapse: {n} rows -> {m} rows");

    Ok(Collapsed {
        matrix,
        dimnames: COLLAPSE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        first_row,
        last_row,
    })
}
