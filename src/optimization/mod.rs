//! optimization — bounded scalar minimization behind a strategy trait.
//!
//! Purpose
//! -------
//! Wrap the `argmin` 1-D solvers used to select smoothing parameters in a
//! single interface, [`Minimizer`], so that callers write
//! `minimize(f, lo, hi, eps)` and never touch executor, state or observer
//! types.
//!
//! Key behaviors
//! -------------
//! - [`GoldenSection`] and [`Brent`] implement [`Minimizer`] over
//!   `argmin`'s `GoldenSectionSearch` and `BrentOpt`.
//! - [`MinimizerKind`] is a copyable tagged strategy for option structs;
//!   it implements [`Minimizer`] by delegating to the configured variant.
//!
//! Invariants & assumptions
//! ------------------------
//! - Bracket and tolerance are validated before the backend runs;
//!   backend errors arrive as [`SurvError`](crate::core::SurvError)
//!   through `From<argmin::core::Error>`.
//!
//! Conventions
//! -----------
//! - With the `obs_slog` feature enabled and `verbose = true` on a
//!   strategy, progress is streamed by `argmin_observer_slog`. Otherwise
//!   only a `trace!` summary is emitted through `log`.

pub mod minimizer;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::minimizer::{Brent, GoldenSection, Minimizer, MinimizerKind};

pub mod prelude {
    pub use super::minimizer::{Minimizer, MinimizerKind};
}
