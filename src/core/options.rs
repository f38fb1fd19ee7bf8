//! core::options — small option enums shared across routines.
//!
//! Purpose
//! -------
//! Hold the tagged parameters that select between well-isolated code paths:
//! tie handling for residuals and how strictly caller-supplied sort orders
//! are verified.
//!
//! Conventions
//! -----------
//! - Numeric codes follow the usual survival conventions
//!   (Breslow = 0, Efron = 1) and are converted with `from_code`, which
//!   returns `SurvError::InvalidMethod` for anything else.
//! - `OrderCheck::Strict` is the default; callers opt into trusting their
//!   own sort orders.

use crate::core::errors::{SurvError, SurvResult};

/// Tie handling for Cox-model hazard increments.
///
/// - `Breslow`: all tied deaths see the full risk-set denominator.
/// - `Efron`: tied deaths remove a fractional share of their own score
///   from the denominator, one inner step per tied death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieMethod {
    #[default]
    Breslow,
    Efron,
}

impl TieMethod {
    /// Decode the conventional integer flag (0 = Breslow, 1 = Efron).
    ///
    /// Errors
    /// ------
    /// - `SurvError::InvalidMethod` for any other code.
    pub fn from_code(code: i32) -> SurvResult<Self> {
        match code {
            0 => Ok(TieMethod::Breslow),
            1 => Ok(TieMethod::Efron),
            other => Err(SurvError::InvalidMethod {
                name: other.to_string(),
                reason: "tie method code must be 0 (Breslow) or 1 (Efron)",
            }),
        }
    }
}

/// How caller-supplied orderings are verified.
///
/// - `Strict`: verify permutations and ascending processing order and fail
///   with `InvalidOrder` / `InvalidStratum` on violation.
/// - `Permissive`: only verify that indices are in range; ordering is
///   trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderCheck {
    #[default]
    Strict,
    Permissive,
}

impl OrderCheck {
    pub fn is_strict(self) -> bool {
        matches!(self, OrderCheck::Strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Decoding of tie method codes, including the error branch.
    // - Documented defaults of the option enums.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check the conventional code mapping for tie methods.
    //
    // Given
    // -----
    // - Codes 0 and 1.
    //
    // Expect
    // ------
    // - 0 decodes to Breslow, 1 to Efron.
    fn tie_method_from_code_maps_conventional_flags() {
        // Act / Assert
        assert_eq!(TieMethod::from_code(0), Ok(TieMethod::Breslow));
        assert_eq!(TieMethod::from_code(1), Ok(TieMethod::Efron));
    }

    #[test]
    // Purpose
    // -------
    // Ensure unknown tie codes are rejected rather than coerced.
    //
    // Given
    // -----
    // - Code 2.
    //
    // Expect
    // ------
    // - `SurvError::InvalidMethod` naming "2".
    fn tie_method_from_code_unknown_returns_invalid_method() {
        // Act
        let result = TieMethod::from_code(2);

        // Assert
        match result {
            Err(SurvError::InvalidMethod { name, .. }) => assert_eq!(name, "2"),
            other => panic!("Expected InvalidMethod, got {other:?}"),
        }
    }

    #[test]
    fn order_check_defaults_to_strict() {
        assert!(OrderCheck::default().is_strict());
        assert!(!OrderCheck::Permissive.is_strict());
    }
}
