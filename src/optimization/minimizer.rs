//! optimization::minimizer — bounded 1-D minimization strategies.
//!
//! Purpose
//! -------
//! Provide a small strategy interface, [`Minimizer`], that minimizes a
//! scalar function over a closed interval. Callers (the spline
//! smoothing-parameter search) depend only on
//! `minimize(f, lo, hi, eps) -> x*`; the line-search algorithm is chosen
//! by the strategy value.
//!
//! Key behaviors
//! -------------
//! - [`GoldenSection`] wraps `argmin`'s `GoldenSectionSearch`, started at
//!   the interval midpoint.
//! - [`Brent`] wraps `argmin`'s `BrentOpt` (golden section with parabolic
//!   interpolation).
//! - [`MinimizerKind`] is a tagged choice between the two configured
//!   strategies, so owners such as the spline fitter can carry iteration
//!   limits and the `verbose` flag down to the executor.
//! - Non-finite objective values are mapped to `f64::MAX` so that a failed
//!   evaluation steers the search away instead of poisoning it.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lo < hi`, both finite; `eps > 0`. Violations return `InvalidValue`
//!   before the backend is touched.
//! - The returned point lies in `[lo, hi]`.
//!
//! Conventions
//! -----------
//! - With the `obs_slog` feature and `verbose = true`, a terminal slog
//!   observer is attached with `ObserverMode::Always`.
//! - Backend failures surface as `SurvError::InvalidParameter` /
//!   `SurvError::BackendError` via `From<argmin::core::Error>`.

use argmin::core::{CostFunction, Error, Executor, IterState, Solver, State};
use argmin::solver::brent::BrentOpt;
use argmin::solver::goldensectionsearch::GoldenSectionSearch;

use crate::core::errors::{SurvError, SurvResult};

/// Default iteration cap for both strategies.
pub const DEFAULT_MAX_ITERS: u64 = 200;

/// Bounded scalar minimization strategy.
pub trait Minimizer {
    /// Minimize `f` over `[lo, hi]` to tolerance `eps`; returns the argmin.
    fn minimize(&self, f: &dyn Fn(f64) -> f64, lo: f64, hi: f64, eps: f64) -> SurvResult<f64>;
}

/// Golden-section search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoldenSection {
    pub max_iters: u64,
    pub verbose: bool,
}

impl Default for GoldenSection {
    fn default() -> Self {
        GoldenSection { max_iters: DEFAULT_MAX_ITERS, verbose: false }
    }
}

/// Brent's method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brent {
    pub max_iters: u64,
    pub verbose: bool,
}

impl Default for Brent {
    fn default() -> Self {
        Brent { max_iters: DEFAULT_MAX_ITERS, verbose: false }
    }
}

/// MinimizerKind — tagged strategy selection carrying its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizerKind {
    GoldenSection(GoldenSection),
    Brent(Brent),
}

impl Default for MinimizerKind {
    fn default() -> Self {
        MinimizerKind::GoldenSection(GoldenSection::default())
    }
}

impl MinimizerKind {
    /// Golden section with default limits.
    pub fn golden_section() -> Self {
        MinimizerKind::GoldenSection(GoldenSection::default())
    }

    /// Brent with default limits.
    pub fn brent() -> Self {
        MinimizerKind::Brent(Brent::default())
    }

    pub fn verbose(&self) -> bool {
        match self {
            MinimizerKind::GoldenSection(g) => g.verbose,
            MinimizerKind::Brent(b) => b.verbose,
        }
    }

    /// Same strategy with observer output switched on or off.
    pub fn with_verbose(self, verbose: bool) -> Self {
        match self {
            MinimizerKind::GoldenSection(g) => {
                MinimizerKind::GoldenSection(GoldenSection { verbose, ..g })
            }
            MinimizerKind::Brent(b) => MinimizerKind::Brent(Brent { verbose, ..b }),
        }
    }
}

impl Minimizer for MinimizerKind {
    fn minimize(&self, f: &dyn Fn(f64) -> f64, lo: f64, hi: f64, eps: f64) -> SurvResult<f64> {
        match self {
            MinimizerKind::GoldenSection(g) => g.minimize(f, lo, hi, eps),
            MinimizerKind::Brent(b) => b.minimize(f, lo, hi, eps),
        }
    }
}

impl Minimizer for GoldenSection {
    fn minimize(&self, f: &dyn Fn(f64) -> f64, lo: f64, hi: f64, eps: f64) -> SurvResult<f64> {
        validate_bracket(lo, hi, eps)?;
        let solver = GoldenSectionSearch::new(lo, hi)?.with_tolerance(eps)?;
        run_solver(ScalarCost { f }, solver, 0.5 * (lo + hi), self.max_iters, self.verbose)
            .map(|x| x.clamp(lo, hi))
    }
}

impl Minimizer for Brent {
    fn minimize(&self, f: &dyn Fn(f64) -> f64, lo: f64, hi: f64, eps: f64) -> SurvResult<f64> {
        validate_bracket(lo, hi, eps)?;
        let solver = BrentOpt::new(lo, hi).set_tolerance(eps, eps);
        run_solver(ScalarCost { f }, solver, 0.5 * (lo + hi), self.max_iters, self.verbose)
            .map(|x| x.clamp(lo, hi))
    }
}

/// Exposes a scalar closure as an `argmin` cost function.
struct ScalarCost<'a> {
    f: &'a dyn Fn(f64) -> f64,
}

impl CostFunction for ScalarCost<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        let value = (self.f)(*x);
        Ok(if value.is_finite() { value } else { f64::MAX })
    }
}

fn validate_bracket(lo: f64, hi: f64, eps: f64) -> SurvResult<()> {
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        return Err(SurvError::InvalidValue {
            name: "lo",
            value: lo,
            reason: "Bounds must be finite with lo < hi.",
        });
    }
    if !eps.is_finite() || eps <= 0.0 {
        return Err(SurvError::InvalidValue {
            name: "eps",
            value: eps,
            reason: "Tolerance must be finite and > 0.",
        });
    }
    Ok(())
}

#[cfg_attr(not(feature = "obs_slog"), allow(unused_variables))]
fn run_solver<'a, S>(
    problem: ScalarCost<'a>, solver: S, x0: f64, max_iters: u64, verbose: bool,
) -> SurvResult<f64>
where
    S: Solver<ScalarCost<'a>, IterState<f64, (), (), (), (), f64>>,
{
    #[allow(unused_mut)]
    let mut executor = Executor::new(problem, solver)
        .configure(|state| state.param(x0).max_iters(max_iters));
    #[cfg(feature = "obs_slog")]
    if verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        executor = executor.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }

    let result = executor.run()?;
    let state = result.state();
    log::trace!(
        "minimizer: {} iterations, best cost = {:.6e}, status = {:?}",
        state.get_iter(),
        state.get_best_cost(),
        state.get_termination_status()
    );
    state.get_best_param().copied().ok_or_else(|| SurvError::BackendError {
        text: "Minimizer finished without a best parameter.".to_string(),
    })
}
