//! riskset — number-at-risk and risk-set membership at event times.
//!
//! Purpose
//! -------
//! Provide the counting-process primitives the rest of the crate builds on:
//! per-stratum risk sets for single-time data ([`coxcount1`]), for
//! (start, stop] data ([`coxcount2`]) and detection of rows that never
//! enter a risk set ([`norisk`]).
//!
//! Conventions
//! -----------
//! - Event times tied with censoring times: the censored rows are at risk.
//! - Orderings supplied by the caller are verified according to
//!   [`OrderCheck`](crate::core::OrderCheck).
//!
//! Downstream usage
//! ----------------
//! - Residual routines and estimators recompute their own cumulative sums
//!   and do not require a [`CoxCount`] value; `CoxCount` is the exported
//!   risk-set record for callers that assemble partial likelihoods
//!   themselves.

pub mod coxcount;
pub mod norisk;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::coxcount::{coxcount1, coxcount2, CoxCount};
pub use self::norisk::norisk;

pub mod prelude {
    pub use super::coxcount::{coxcount1, coxcount2, CoxCount};
    pub use super::norisk::norisk;
}
