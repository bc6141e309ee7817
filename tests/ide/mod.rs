//! IDE layer tests
//!
//! Tests for the request façade:
//! - Position to handle conversion
//! - Request errors
//! - Diagnostics publishing and configuration

pub mod tests_config;
pub mod tests_load_program;
