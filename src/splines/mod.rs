//! splines — penalized smoothing and bounded link functions.
//!
//! Purpose
//! -------
//! Provide the penalized cubic B-spline smoother [`PSpline`] with
//! GCV/AIC/BIC/REML/df/fixed selection of the smoothing parameter, and the
//! bounded probability links in [`LinkFunctionParams`].
//!
//! Key behaviors
//! -------------
//! - [`PSpline::new`] builds knots and the design matrix once;
//!   [`PSpline::fit`] returns a [`PSplineFit`] without mutating the basis.
//! - The smoothing-parameter search goes through the
//!   [`Minimizer`](crate::optimization::Minimizer) strategy, selectable
//!   with [`PSpline::with_minimizer`].
//! - Links clamp probabilities into `[edge, 1 − edge]` before transforming.
//!
//! Testing notes
//! -------------
//! - `pspline` tests check partition of unity, reproduction of linear
//!   trends, idempotent fits and df targeting.
//! - `links` tests check monotonicity, `blogit(0.5) = 0` and inverses.

pub mod links;
pub mod pspline;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::links::LinkFunctionParams;
pub use self::pspline::{PSpline, PSplineFit, SplineMethod};

pub mod prelude {
    pub use super::links::LinkFunctionParams;
    pub use super::pspline::{PSpline, PSplineFit, SplineMethod};
}
