//! Grade computation.
//!
//! `aggregator` holds the pure weighted aggregation; `calculator` binds it
//! to a threshold policy and a student provider.

pub mod aggregator;
pub mod calculator;

pub use aggregator::GradeThresholds;
pub use calculator::GradeCalculator;
