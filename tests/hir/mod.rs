//! HIR layer tests
//!
//! Tests for the analysis pass and its cache:
//! - Error-tolerant analysis and diagnostics
//! - Dependencies and external tests
//! - Exactly-once computation under concurrency
//! - Failure policies and cancellation

pub mod tests_analysis;
pub mod tests_cache;
