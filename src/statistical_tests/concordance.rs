//! statistical_tests::concordance — weighted concordance in O(n log n).
//!
//! Purpose
//! -------
//! Count concordant, discordant and tied pairs between a predictor `x` and
//! a (possibly left-truncated) survival outcome. From those counts derive
//! Harrell's C / Somers' d and the variance of the concordance under the
//! null that each death is a random draw from its risk set.
//!
//! Key behaviors
//! -------------
//! - Distinct death times are processed in descending order. The
//!   comparison set for a death at `t` is every row still at risk at `t`
//!   that has not died at `t`, which includes rows censored exactly at
//!   `t`.
//! - Predictor values are mapped to dense ranks and held in a [`RankTree`],
//!   a lazy segment tree. It answers "weight below / equal / above rank r"
//!   in O(log m). It also maintains `Σ g·s²`, where `s_r = L_r − U_r` is
//!   the signed rank score of rank `r`, from which the per-death variance
//!   term is read in O(1).
//! - Deaths tied in time are compared with each other directly. Each
//!   unordered pair is `tied_y`, or `tied_xy` when their predictors are
//!   also equal.
//! - Optional `timewt` values multiply every contribution made at the
//!   corresponding death time.
//!
//! Conventions
//! -----------
//! - A pair is concordant when the subject who died first has the smaller
//!   predictor, i.e. larger `x` predicts longer survival. Callers using
//!   risk scores should negate `x`.
//! - `count = [concordant, discordant, tied_x, tied_y, tied_xy]`. These five
//!   counts partition all comparable pairs.
//! - `concordance = (d + 1)/2` with Somers'
//!   `d = (concordant − discordant) / (concordant + discordant + tied_x)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `y` has 2 columns (time, status) or 3 columns (start, stop, status),
//!   with status coded 0/1.
//! - When supplied, `sortstop` orders rows by ascending stop and
//!   `sortstart` by ascending start; otherwise they are computed.

use std::collections::BTreeMap;

use ndarray::ArrayView2;

use crate::core::{
    errors::{SurvError, SurvResult},
    validation::{check_ascending, check_len, check_permutation, resolve_weights},
};

/// Concordance — pair counts and derived statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Concordance {
    pub concordant: f64,
    pub discordant: f64,
    pub tied_x: f64,
    pub tied_y: f64,
    pub tied_xy: f64,
    /// Variance of `concordant − discordant` under random ranking.
    pub variance_cd: f64,
}

impl Concordance {
    /// `[concordant, discordant, tied_x, tied_y, tied_xy]`.
    pub fn count(&self) -> [f64; 5] {
        [self.concordant, self.discordant, self.tied_x, self.tied_y, self.tied_xy]
    }

    /// Number of informative pairs: `concordant + discordant + tied_x`.
    pub fn npair(&self) -> f64 {
        self.concordant + self.discordant + self.tied_x
    }

    pub fn somers_d(&self) -> f64 {
        let np = self.npair();
        if np > 0.0 { (self.concordant - self.discordant) / np } else { 0.0 }
    }

    pub fn concordance(&self) -> f64 {
        (self.somers_d() + 1.0) / 2.0
    }

    /// Variance of [`Concordance::concordance`].
    pub fn variance(&self) -> f64 {
        let np = self.npair();
        if np > 0.0 { self.variance_cd / (4.0 * np * np) } else { 0.0 }
    }

    /// Keyed view: `"count"`, `"concordance"`, `"variance"`.
    pub fn to_map(&self) -> BTreeMap<String, Vec<f64>> {
        let mut map = BTreeMap::new();
        map.insert("count".to_string(), self.count().to_vec());
        map.insert("concordance".to_string(), vec![self.concordance()]);
        map.insert("variance".to_string(), vec![self.variance()]);
        map
    }
}

/// Lazy segment tree over predictor ranks.
///
/// Each rank `r` holds a weight `g_r` and a key `c_r = 2·L_r + g_r`,
/// where `L_r` is the total weight at ranks below `r`. Nodes store
/// `A = Σg`, `B = Σg·c` and `C = Σg·c²`. Then `c_r − N = L_r − U_r`
/// and `Σ g (L − U)² = C − 2N·B + N²·A`.
pub(crate) struct RankTree {
    m: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    lazy: Vec<f64>,
    leaf_g: Vec<f64>,
}

impl RankTree {
    pub(crate) fn new(m: usize) -> Self {
        let size = 4 * m.max(1);
        RankTree {
            m,
            a: vec![0.0; size],
            b: vec![0.0; size],
            c: vec![0.0; size],
            lazy: vec![0.0; size],
            leaf_g: vec![0.0; m],
        }
    }

    fn apply(&mut self, node: usize, delta: f64) {
        let (a, b) = (self.a[node], self.b[node]);
        self.c[node] += 2.0 * delta * b + delta * delta * a;
        self.b[node] += delta * a;
        self.lazy[node] += delta;
    }

    fn push(&mut self, node: usize) {
        let delta = self.lazy[node];
        if delta != 0.0 {
            self.apply(2 * node, delta);
            self.apply(2 * node + 1, delta);
            self.lazy[node] = 0.0;
        }
    }

    fn pull(&mut self, node: usize) {
        self.a[node] = self.a[2 * node] + self.a[2 * node + 1];
        self.b[node] = self.b[2 * node] + self.b[2 * node + 1];
        self.c[node] = self.c[2 * node] + self.c[2 * node + 1];
    }

    fn range_add(&mut self, node: usize, lo: usize, hi: usize, l: usize, r: usize, delta: f64) {
        if r <= lo || hi <= l {
            return;
        }
        if l <= lo && hi <= r {
            self.apply(node, delta);
            return;
        }
        self.push(node);
        let mid = (lo + hi) / 2;
        self.range_add(2 * node, lo, mid, l, r, delta);
        self.range_add(2 * node + 1, mid, hi, l, r, delta);
        self.pull(node);
    }

    /// Reset the leaf at `pos` to weight `g_pos + w`; `below` is `L_pos`.
    fn point_add(&mut self, node: usize, lo: usize, hi: usize, pos: usize, w: f64, below: f64) {
        if hi - lo == 1 {
            self.leaf_g[lo] += w;
            let g = self.leaf_g[lo];
            let c = 2.0 * below + g;
            self.a[node] = g;
            self.b[node] = g * c;
            self.c[node] = g * c * c;
            return;
        }
        self.push(node);
        let mid = (lo + hi) / 2;
        if pos < mid {
            self.point_add(2 * node, lo, mid, pos, w, below);
        } else {
            self.point_add(2 * node + 1, mid, hi, pos, w, below);
        }
        self.pull(node);
    }

    fn range_weight(&self, node: usize, lo: usize, hi: usize, l: usize, r: usize) -> f64 {
        if r <= lo || hi <= l {
            return 0.0;
        }
        if l <= lo && hi <= r {
            return self.a[node];
        }
        let mid = (lo + hi) / 2;
        self.range_weight(2 * node, lo, mid, l, r) + self.range_weight(2 * node + 1, mid, hi, l, r)
    }

    /// Add weight `w` (negative to remove) at `rank`.
    pub(crate) fn insert(&mut self, rank: usize, w: f64) {
        if rank + 1 < self.m {
            self.range_add(1, 0, self.m, rank + 1, self.m, 2.0 * w);
        }
        let below = self.range_weight(1, 0, self.m, 0, rank);
        self.point_add(1, 0, self.m, rank, w, below);
    }

    /// Weight strictly below, at, and strictly above `rank`.
    pub(crate) fn split(&self, rank: usize) -> (f64, f64, f64) {
        let below = self.range_weight(1, 0, self.m, 0, rank);
        let at = self.range_weight(1, 0, self.m, rank, rank + 1);
        let above = self.range_weight(1, 0, self.m, rank + 1, self.m);
        (below, at, above)
    }

    pub(crate) fn total(&self) -> f64 {
        if self.m == 0 { 0.0 } else { self.a[1] }
    }

    /// `Σ_r g_r (L_r − U_r)² / N`, the variance of the signed rank score.
    pub(crate) fn rank_variance(&self) -> f64 {
        let n = self.total();
        if n <= 0.0 {
            return 0.0;
        }
        let (a, b, c) = (self.a[1], self.b[1], self.c[1]);
        ((c - 2.0 * n * b + n * n * a) / n).max(0.0)
    }
}

/// Weighted concordance between a predictor and a survival outcome.
///
/// Parameters
/// ----------
/// - `y`: `ArrayView2<f64>`
///   `(n, 2)` as (time, status) or `(n, 3)` as (start, stop, status).
/// - `x`: `&[f64]`
///   Predictor; larger values predict longer survival.
/// - `weight`: `Option<&[f64]>`
///   Case weights; default 1.0. A pair contributes `w_i · w_j`.
/// - `timewt`: `Option<&[f64]>`
///   One multiplier per distinct death time, ascending.
/// - `sortstart`: `Option<&[usize]>`
///   Rows ordered by ascending start (3-column `y` only).
/// - `sortstop`: `Option<&[usize]>`
///   Rows ordered by ascending stop.
///
/// Returns
/// -------
/// `SurvResult<Concordance>`.
///
/// Errors
/// ------
/// - `DimensionMismatch` when `y` has other than 2 or 3 columns or any
///   length disagrees.
/// - `InvalidValue` for non-finite entries, bad status codes, non-positive
///   weights or `start >= stop`.
/// - `InvalidOrder` when a sort index is not a permutation or not
///   ascending.
///
/// Examples
/// --------
/// ```rust
/// use ndarray::array;
/// use rust_survival::statistical_tests::concordance;
///
/// let y = array![[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0], [5.0, 1.0]];
/// let x = [1.0, 2.0, 1.0, 2.0, 1.0];
/// let out = concordance(y.view(), &x, None, None, None, None).unwrap();
/// assert!(out.to_map().contains_key("count"));
/// ```
pub fn concordance(
    y: ArrayView2<f64>, x: &[f64], weight: Option<&[f64]>, timewt: Option<&[f64]>,
    sortstart: Option<&[usize]>, sortstop: Option<&[usize]>,
) -> SurvResult<Concordance> {
    let n = y.nrows();
    let ncol = y.ncols();
    if ncol != 2 && ncol != 3 {
        return Err(SurvError::DimensionMismatch { name: "y", expected: 2, found: ncol });
    }
    check_len("x", n, x.len())?;
    for &value in y.iter().chain(x.iter()) {
        if !value.is_finite() {
            return Err(SurvError::InvalidValue { name: "y", value, reason: "Must be finite." });
        }
    }
    let wt = resolve_weights(weight, n)?;
    let stop: Vec<f64> = y.column(ncol - 2).to_vec();
    let status: Vec<f64> = y.column(ncol - 1).to_vec();
    if let Some(&bad) = status.iter().find(|&&s| s != 0.0 && s != 1.0) {
        return Err(SurvError::InvalidValue {
            name: "y",
            value: bad,
            reason: "Status column must be 0 or 1.",
        });
    }
    let start: Option<Vec<f64>> = (ncol == 3).then(|| y.column(0).to_vec());
    if let Some(start) = &start {
        for i in 0..n {
            if start[i] >= stop[i] {
                return Err(SurvError::InvalidValue {
                    name: "y",
                    value: start[i],
                    reason: "Interval start must be strictly less than stop.",
                });
            }
        }
    }

    let one_stratum = vec![0_i64; n];
    let by_stop = resolve_order(sortstop, &stop, &one_stratum, "sortstop")?;
    let by_start = match &start {
        Some(s) => Some(resolve_order(sortstart, s, &one_stratum, "sortstart")?),
        None => None,
    };

    let mut death_times: Vec<f64> =
        (0..n).filter(|&i| status[i] == 1.0).map(|i| stop[i]).collect();
    death_times.sort_by(f64::total_cmp);
    death_times.dedup();
    if let Some(tw) = timewt {
        check_len("timewt", death_times.len(), tw.len())?;
    }

    let ranks = dense_ranks(x);
    let m = ranks.iter().max().map_or(0, |&r| r + 1);
    let mut tree = RankTree::new(m);
    let mut out = Concordance {
        concordant: 0.0,
        discordant: 0.0,
        tied_x: 0.0,
        tied_y: 0.0,
        tied_xy: 0.0,
        variance_cd: 0.0,
    };

    let mut p2 = n;
    let mut p1 = n;
    let mut dt = death_times.len();
    while p2 > 0 {
        let t = stop[by_stop[p2 - 1]];
        let mut q = p2;
        while q > 0 && stop[by_stop[q - 1]] == t {
            q -= 1;
        }
        let block = &by_stop[q..p2];

        if let (Some(start), Some(by_start)) = (&start, &by_start) {
            while p1 > 0 && start[by_start[p1 - 1]] >= t {
                let row = by_start[p1 - 1];
                tree.insert(ranks[row], -wt[row]);
                p1 -= 1;
            }
        }
        for &row in block.iter().filter(|&&r| status[r] == 0.0) {
            tree.insert(ranks[row], wt[row]);
        }

        let deaths: Vec<usize> = block.iter().copied().filter(|&r| status[r] == 1.0).collect();
        if !deaths.is_empty() {
            dt -= 1;
            let tw = timewt.map_or(1.0, |tw| tw[dt]);
            let var_term = tree.rank_variance();
            let mut by_rank: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
            let (mut wsum, mut wsq) = (0.0, 0.0);
            for &i in &deaths {
                let (below, at, above) = tree.split(ranks[i]);
                let w = wt[i] * tw;
                out.concordant += w * above;
                out.discordant += w * below;
                out.tied_x += w * at;
                out.variance_cd += wt[i] * tw * tw * var_term;
                let e = by_rank.entry(ranks[i]).or_insert((0.0, 0.0));
                e.0 += wt[i];
                e.1 += wt[i] * wt[i];
                wsum += wt[i];
                wsq += wt[i] * wt[i];
            }
            let all_pairs = (wsum * wsum - wsq) / 2.0;
            let same_x: f64 = by_rank.values().map(|&(s, q2)| (s * s - q2) / 2.0).sum();
            out.tied_xy += tw * same_x;
            out.tied_y += tw * (all_pairs - same_x);
            for &i in &deaths {
                tree.insert(ranks[i], wt[i]);
            }
        }
        p2 = q;
    }

    log::debug!(
        "concordance: n = {n}, count = {:?}, C = {:.4}",
        out.count(),
        out.concordance()
    );
    Ok(out)
}

fn resolve_order(
    given: Option<&[usize]>, key: &[f64], strata: &[i64], name: &'static str,
) -> SurvResult<Vec<usize>> {
    let n = key.len();
    match given {
        Some(order) => {
            check_permutation(name, order, n)?;
            check_ascending(key, strata, order, "sort index must give ascending time")?;
            Ok(order.to_vec())
        }
        None => {
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| key[a].total_cmp(&key[b]));
            Ok(order)
        }
    }
}

/// Dense 0-based ranks of `x` (ties share a rank).
fn dense_ranks(x: &[f64]) -> Vec<usize> {
    let mut sorted: Vec<f64> = x.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    x.iter().map(|v| sorted.partition_point(|s| s < v)).collect()
}
