//! Net income calculations over a progressive bracket table.
//!
//! This module provides the bracket tax engine and the curve sampling used
//! by presentation layers that chart net income and premium over a range.

pub mod common;
pub mod curve;
pub mod engine;

pub use curve::{CurveError, CurvePoint, MAX_CURVE_POINTS, peak_premium, sample_curve};
pub use engine::{BracketTaxEngine, NetIncomeError};
