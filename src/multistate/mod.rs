//! multistate — preprocessing for multi-state (start, stop] data.
//!
//! Purpose
//! -------
//! Hold data-shaping utilities for multi-state survival data. Currently
//! [`collapse`] merges contiguous same-state intervals of a subject into
//! one row; the Aalen–Johansen estimator itself lives in
//! [`crate::estimators::survfitaj`].

pub mod collapse;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::collapse::{collapse, Collapsed, COLLAPSE_COLUMNS};

pub mod prelude {
    pub use super::collapse::{collapse, Collapsed};
}
