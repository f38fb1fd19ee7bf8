//! core::numerics — shared tolerances and compensated accumulation.
//!
//! Purpose
//! -------
//! Keep the small numerical constants and the running-sum accumulator used
//! by the risk-set sweeps in one place, so every module applies the same
//! guards.
//!
//! Key behaviors
//! -------------
//! - [`RunningSum`] keeps a Neumaier-compensated total that supports both
//!   additions and removals. Risk-set sweeps add rows as they enter and
//!   subtract them as they leave; with weights spanning orders of magnitude
//!   a plain `f64` total drifts, the compensated one does not.
//! - [`EIGEN_EPS`] is the relative cutoff below which eigenvalues are
//!   treated as zero in pseudo-inverses.
//!
//! Conventions
//! -----------
//! - Pure helpers: no logging, no I/O.

/// Relative eigenvalue cutoff for generalized inverses.
pub const EIGEN_EPS: f64 = 1e-10;

/// Absolute tolerance for "effectively zero" comparisons.
pub const GENERAL_TOL: f64 = 1e-12;

/// Compensated running total (Neumaier variant of Kahan summation).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningSum {
    sum: f64,
    comp: f64,
}

impl RunningSum {
    pub fn new() -> Self {
        RunningSum { sum: 0.0, comp: 0.0 }
    }

    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.comp += (self.sum - t) + x;
        } else {
            self.comp += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn sub(&mut self, x: f64) {
        self.add(-x);
    }

    pub fn value(&self) -> f64 {
        self.sum + self.comp
    }

    pub fn reset(&mut self) {
        *self = RunningSum::new();
    }
}
