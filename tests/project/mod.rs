//! Project layer tests
//!
//! Tests for compilation unit resolution:
//! - Directory scanning and import paths
//! - Narrowing of multi-unit directories
//! - Workspace boundaries
//! - Disk-backed sources
