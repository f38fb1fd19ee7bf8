//! core — shared errors, validation guards and option enums.
//!
//! Purpose
//! -------
//! Collect the infrastructure every survival routine depends on: the
//! crate-wide [`SurvError`] / [`SurvResult`] pair, the input guards in
//! [`validation`], and the tagged options ([`TieMethod`], [`OrderCheck`])
//! that select between code paths.
//!
//! Conventions
//! -----------
//! - Public entry points in other subtrees validate through this module and
//!   never panic on user-facing invalid input.
//! - Optional inputs resolve to defaults here (unit weights, single
//!   stratum) so that kernels always see fully populated slices.

pub mod errors;
pub mod numerics;
pub mod options;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{SurvError, SurvResult};
pub use self::options::{OrderCheck, TieMethod};

pub mod prelude {
    pub use super::errors::{SurvError, SurvResult};
    pub use super::options::{OrderCheck, TieMethod};
}
