//! core::errors — crate-wide error type for survival computations.
//!
//! Purpose
//! -------
//! Provide a single error enum and result alias shared by every survival
//! routine (risk sets, residuals, estimators, tests, collapsing, splines),
//! so that callers can propagate failures with `?` regardless of which
//! subtree produced them.
//!
//! Key behaviors
//! -------------
//! - Define [`SurvResult`] and [`SurvError`] as the canonical result and
//!   error types of the crate.
//! - Attach human-readable `Display` messages to each variant, embedding
//!   the offending name, index or value.
//! - Map `argmin` runtime errors (raised by the 1-D smoothing-parameter
//!   search) into [`SurvError`] via `From<argmin::core::Error>`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every public routine validates its inputs and returns
//!   [`SurvResult<T>`] instead of panicking on user-facing invalid input.
//! - Variants are small and cloneable; payloads carry only names, indices
//!   and scalar values, never whole input arrays.
//!
//! Conventions
//! -----------
//! - `name` payloads refer to the argument as it appears in the public
//!   function signature (e.g. `"status"`, `"sort2"`).
//! - Indices are 0-based positions into the argument named by the variant
//!   or, for order/stratum checks, into the processing order.
//!
//! Testing notes
//! -------------
//! - Unit tests below check that `Display` embeds each payload and that
//!   argmin errors are downcast into the matching wrapper variant.

use argmin::core::{ArgminError, Error};

/// Crate-wide result alias for survival computations.
pub type SurvResult<T> = Result<T, SurvError>;

/// SurvError — failure conditions for survival computations.
///
/// Variants
/// --------
/// - `DimensionMismatch { name, expected, found }`
///   A parallel input does not share the length of the primary input.
/// - `InvalidOrder { index, reason }`
///   A sort/order index is not a permutation or does not produce the
///   required ascending processing order.
/// - `InvalidStratum { index, reason }`
///   Stratum labels are not contiguous under the processing order.
/// - `InvalidMethod { name, reason }`
///   A method string or code is not recognized.
/// - `NumericDegeneracy { index, reason }`
///   A division by an empty risk set, a zero variance, or a singular
///   system was encountered.
/// - `InvalidValue { name, value, reason }`
///   A scalar input (or element) is out of its admissible range.
/// - `InvalidParameter { text }`, `BackendError { text }`
///   Wrappers for errors raised by the `argmin` minimizer backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SurvError {
    // ---- Shapes ----
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    // ---- Ordering ----
    InvalidOrder {
        index: usize,
        reason: &'static str,
    },
    InvalidStratum {
        index: usize,
        reason: &'static str,
    },

    // ---- Options ----
    InvalidMethod {
        name: String,
        reason: &'static str,
    },

    // ---- Numerics ----
    NumericDegeneracy {
        index: usize,
        reason: &'static str,
    },
    InvalidValue {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    // ---- Argmin ----
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for every other argmin error
    BackendError {
        text: String,
    },
}

impl std::error::Error for SurvError {}

impl std::fmt::Display for SurvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurvError::DimensionMismatch { name, expected, found } => {
                write!(f, "Length of `{name}` is {found}, expected {expected}.")
            }
            SurvError::InvalidOrder { index, reason } => {
                write!(f, "Invalid processing order at position {index}: {reason}")
            }
            SurvError::InvalidStratum { index, reason } => {
                write!(f, "Invalid stratum layout at position {index}: {reason}")
            }
            SurvError::InvalidMethod { name, reason } => {
                write!(f, "Invalid method '{name}': {reason}")
            }
            SurvError::NumericDegeneracy { index, reason } => {
                write!(f, "Numeric degeneracy at position {index}: {reason}")
            }
            SurvError::InvalidValue { name, value, reason } => {
                write!(f, "Invalid value for `{name}`: {value}. {reason}")
            }
            SurvError::InvalidParameter { text } => {
                write!(f, "Minimizer rejected a parameter: {text}")
            }
            SurvError::BackendError { text } => write!(f, "Minimizer backend error: {text}"),
        }
    }
}

impl From<Error> for SurvError {
    fn from(original_err: Error) -> Self {
        match original_err.downcast() {
            Ok(ArgminError::InvalidParameter { text }) => SurvError::InvalidParameter { text },
            Ok(other) => SurvError::BackendError { text: other.to_string() },
            Err(err) => SurvError::BackendError { text: err.to_string() },
        }
    }
}
