//! rust_survival — numerical kernels for survival analysis.
//!
//! Purpose
//! -------
//! Serve as the crate root for the survival-analysis engine: risk-set
//! construction, Cox-model residual primitives, Kaplan–Meier and
//! Aalen–Johansen curves, k-sample tests, concordance, Poisson rate
//! intervals, multi-state data collapsing, and penalized splines with
//! bounded link functions.
//!
//! Key behaviors
//! -------------
//! - Expose each subtree as a public module with a curated re-export
//!   surface and a `prelude`:
//!   - [`core`]: error type, validation guards and option enums.
//!   - [`riskset`]: `coxcount1`, `coxcount2`, `norisk`.
//!   - [`residuals`]: `agmart`, `coxmart`, `agscore`, `coxscore`,
//!     `agsurv4`, `agsurv5`, `risk_sums`.
//!   - [`estimators`]: `survfitkm`, `survfitaj`.
//!   - [`statistical_tests`]: `survdiff2`, `concordance`, `cipoisson`.
//!   - [`multistate`]: `collapse`.
//!   - [`optimization`]: the bounded 1-D [`Minimizer`](optimization::Minimizer)
//!     strategy.
//!   - [`splines`]: `PSpline`, `LinkFunctionParams`.
//! - Every call is a pure function of its inputs (plus the immutable
//!   basis / edge of the spline and link objects); no global state.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parallel inputs share one length `n`; violations return
//!   [`SurvError::DimensionMismatch`](core::SurvError::DimensionMismatch).
//! - Status is coded 0 = censored, 1 = event (multi-state routines use
//!   `k ≥ 1` for a transition into state `k − 1`).
//! - Optional inputs default rather than fail: unit weights, one stratum,
//!   no left truncation.
//!
//! Conventions
//! -----------
//! - At a tied instant events precede censoring: a row censored at `t` is
//!   in the risk set of an event at `t`.
//! - Returned indices are 0-based; strata labels are `i64`.
//! - Logging goes through the `log` facade only; binaries and tests choose
//!   the logger (e.g. `env_logger`). The `obs_slog` feature additionally
//!   streams smoothing-parameter searches through `argmin_observer_slog`.
//!
//! Downstream usage
//! ----------------
//! ```rust
//! use rust_survival::estimators::{survfitkm, ComputationType};
//!
//! let time = [1.0, 2.0, 3.0, 4.0];
//! let status = [1, 0, 1, 1];
//! let km = survfitkm(&time, &status, None, None, None, false, ComputationType::default())
//!     .unwrap();
//! assert_eq!(km.len(), 4);
//! ```
//!
//! Testing notes
//! -------------
//! - Each module carries unit tests against hand-computed values.
//! - `tests/integration_survival_pipeline.rs` runs the end-to-end
//!   properties (monotone at-risk counts and survival, label-swap
//!   invariance of the log-rank test, concordance pair partition, Poisson
//!   interval bounds, spline idempotence, link monotonicity, collapsing).

pub mod core;
pub mod estimators;
pub mod multistate;
pub mod optimization;
pub mod residuals;
pub mod riskset;
pub mod splines;
pub mod statistical_tests;
