//! estimators — nonparametric survival and state-occupancy curves.
//!
//! Purpose
//! -------
//! Provide the Kaplan–Meier / Nelson–Aalen estimator ([`survfitkm`]) for
//! single-event data, with optional weights, left truncation and a
//! reverse (censoring-distribution) mode, and the Aalen–Johansen estimator
//! ([`survfitaj`]) for multi-state data.
//!
//! Conventions
//! -----------
//! - Rows may arrive in any order; both estimators sort internally.
//! - Outputs are plain value records with parallel per-time vectors (or
//!   `ndarray` matrices for per-state quantities).

pub mod survfitaj;
pub mod survfitkm;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::survfitaj::{survfitaj, AalenJohansen};
pub use self::survfitkm::{survfitkm, ComputationType, HazardType, KaplanMeier, SurvivalType};

pub mod prelude {
    pub use super::survfitaj::{survfitaj, AalenJohansen};
    pub use super::survfitkm::{survfitkm, ComputationType, KaplanMeier};
}
