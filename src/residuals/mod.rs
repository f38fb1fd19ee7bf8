//! residuals — Cox-model residual primitives and risk-set sums.
//!
//! Purpose
//! -------
//! Supply the building blocks higher-level Cox fitting code needs after a
//! coefficient vector is known: weighted risk-set totals per death time
//! ([`risk_sums`]), martingale residuals ([`agmart`], [`coxmart`]), score
//! residuals ([`agscore`], [`coxscore`]) and the per-time aggregation
//! kernels for baseline survival and its variance ([`agsurv4`],
//! [`agsurv5`]).
//!
//! Key behaviors
//! -------------
//! - Breslow and Efron tie handling are two separate code paths selected
//!   by [`TieMethod`](crate::core::TieMethod).
//! - All routines accept unsorted, ungrouped rows and sort internally.
//!
//! Testing notes
//! -------------
//! - Hand-computed residuals for small tied and untied samples, the
//!   zero-sum property of martingale residuals under unit weights, score
//!   residuals summing to the score vector, and agsurv length invariants
//!   are covered in the submodules.

pub mod agmart;
pub mod agscore;
pub mod agsurv;
pub mod risksums;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::agmart::{agmart, coxmart};
pub use self::agscore::{agscore, coxscore};
pub use self::agsurv::{agsurv4, agsurv5, agsurv5_from_sums, AgSurv5};
pub use self::risksums::{risk_sums, DeathTimeSums};

pub mod prelude {
    pub use super::agmart::{agmart, coxmart};
    pub use super::agscore::{agscore, coxscore};
    pub use super::agsurv::{agsurv4, agsurv5, AgSurv5};
    pub use super::risksums::{risk_sums, DeathTimeSums};
}
