//! statistical_tests — group comparison, discrimination and rate intervals.
//!
//! Purpose
//! -------
//! Collect the inferential routines that summarize survival data rather
//! than estimate curves: the G-rho family of k-sample tests
//! ([`survdiff2`]), weighted concordance between a predictor and the
//! outcome ([`concordance`](fn@concordance)), and confidence limits for Poisson rates
//! ([`cipoisson`](fn@cipoisson)).
//!
//! Key behaviors
//! -------------
//! - [`survdiff2`] returns observed/expected counts per group, the
//!   hypergeometric variance matrix and the chi-square statistic with its
//!   degrees of freedom and p-value.
//! - [`concordance`](fn@concordance) counts concordant, discordant and tied pairs in
//!   O(n log n) using a rank segment tree, for right-censored or
//!   counting-process outcomes.
//! - [`cipoisson`](fn@cipoisson) provides exact (Gamma quantile) and Anscombe
//!   (square-root transform) limits.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every routine validates its inputs through [`crate::core::validation`]
//!   and reports failures as [`SurvError`](crate::core::SurvError).
//! - Status codes are 0 (censored) / 1 (event).
//!
//! Conventions
//! -----------
//! - Group labels and strata are `i64` and sorted internally; outputs list
//!   groups in ascending label order.
//! - Distribution functions (chi-square tail, Gamma and Normal quantiles)
//!   come from `statrs`.
//!
//! Downstream usage
//! ----------------
//! - Typical Rust code imports the main surface as:
//!
//!   ```rust
//!   use rust_survival::statistical_tests::{cipoisson, concordance, survdiff2};
//!   ```
//!
//! Testing notes
//! -------------
//! - [`survdiff`] checks hand-computed log-rank statistics, stratification
//!   and the rho weighting.
//! - [`concordance`](mod@concordance) compares the tree sweep against an
//!   O(n²) reference, including tied times and predictors.
//! - [`cipoisson`](mod@cipoisson) checks published exact limits and the
//!   `k = 0` edge case.

pub mod cipoisson;
pub mod concordance;
pub mod survdiff;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::cipoisson::{
    cipoisson, cipoisson_anscombe, cipoisson_exact, cipoisson_many, cipoisson_with, PoissonMethod,
};
pub use self::concordance::{concordance, Concordance};
pub use self::survdiff::{survdiff2, LogRank};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::cipoisson::{cipoisson, PoissonMethod};
    pub use super::concordance::{concordance, Concordance};
    pub use super::survdiff::{survdiff2, LogRank};
}
