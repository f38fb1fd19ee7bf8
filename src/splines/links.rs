//! splines::links — bounded link functions for probabilities.
//!
//! Purpose
//! -------
//! Map probabilities to the real line with protection at the boundaries.
//! Before the transform, inputs are clamped into `[edge, 1 − edge]` (only
//! the lower bound for `blog`), so that estimated probabilities of exactly
//! 0 or 1 produce finite values.
//!
//! Conventions
//! -----------
//! - `blogit(p) = ln(p / (1 − p))`
//! - `bprobit(p) = Φ⁻¹(p) − Φ⁻¹(1 − p) = 2·Φ⁻¹(p)`
//! - `bcloglog(p) = cloglog(p) − cloglog(1 − p)`, with
//!   `cloglog(p) = ln(−ln(1 − p))`
//! - `blog(p) = ln(p)`
//! - The three two-sided links are odd around `p = 1/2`:
//!   `f(1 − p) = −f(p)`, so each is 0 at one half.
//! - Each `inv_*` maps back into `(0, 1]` and undoes its link on the
//!   clamped range. `inv_bcloglog` has no closed form and is found by
//!   bisection.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::core::errors::{SurvError, SurvResult};

const INVERSE_BISECTION_STEPS: usize = 200;

fn cloglog(p: f64) -> f64 {
    (-(1.0 - p).ln()).ln()
}

/// LinkFunctionParams — bounded links sharing one boundary `edge`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkFunctionParams {
    edge: f64,
    normal: Normal,
}

impl LinkFunctionParams {
    /// Construct with boundary `edge`, which must satisfy `0 < edge < 0.5`.
    ///
    /// Errors
    /// ------
    /// - `InvalidValue` when `edge` is outside `(0, 0.5)` or not finite.
    pub fn new(edge: f64) -> SurvResult<Self> {
        if !(edge > 0.0 && edge < 0.5) {
            return Err(SurvError::InvalidValue {
                name: "edge",
                value: edge,
                reason: "Edge must lie in (0, 0.5).",
            });
        }
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| SurvError::BackendError { text: e.to_string() })?;
        Ok(LinkFunctionParams { edge, normal })
    }

    pub fn edge(&self) -> f64 {
        self.edge
    }

    fn clamp(&self, p: f64) -> f64 {
        p.clamp(self.edge, 1.0 - self.edge)
    }

    pub fn blogit(&self, p: f64) -> f64 {
        let p = self.clamp(p);
        p.ln() - (1.0 - p).ln()
    }

    pub fn bprobit(&self, p: f64) -> f64 {
        let p = self.clamp(p);
        self.normal.inverse_cdf(p) - self.normal.inverse_cdf(1.0 - p)
    }

    pub fn bcloglog(&self, p: f64) -> f64 {
        let p = self.clamp(p);
        cloglog(p) - cloglog(1.0 - p)
    }

    /// Log link; only the lower boundary is protected.
    pub fn blog(&self, p: f64) -> f64 {
        p.max(self.edge).ln()
    }

    pub fn inv_blogit(&self, eta: f64) -> f64 {
        1.0 / (1.0 + (-eta).exp())
    }

    pub fn inv_bprobit(&self, eta: f64) -> f64 {
        self.normal.cdf(eta / 2.0)
    }

    /// Root of `cloglog(p) − cloglog(1 − p) = eta` on `(0, 1)`.
    pub fn inv_bcloglog(&self, eta: f64) -> f64 {
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for _ in 0..INVERSE_BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if cloglog(mid) - cloglog(1.0 - mid) < eta {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    pub fn inv_blog(&self, eta: f64) -> f64 {
        eta.exp().min(1.0)
    }
}
