//! # semcache-base
//!
//! Semantic-analysis backbone of a code intelligence backend: resolve the
//! compilation unit owning a file, analyze it at most once, and hand back a
//! navigable program plus structured diagnostics.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → AnalysisHost, request façade
//!   ↓
//! hir       → Analyzer, memoizing cache, diagnostics
//!   ↓
//! project   → File sources, unit resolution and narrowing
//!   ↓
//! base      → Primitives (FileId, LineIndex, SourceMap)
//! ```

// ============================================================================
// MODULES (dependency order: base → project → hir → ide)
// ============================================================================

/// Foundation types: FileId, LineIndex, SourceMap, PositionHandle
pub mod base;

/// Project management: file sources, unit resolution, workspace loading
pub mod project;

/// Analysis: semantic engine seam, analyzer, cache, diagnostics
pub mod hir;

/// Request façade: AnalysisHost
pub mod ide;

/// Client-supplied analysis settings
pub mod config;

/// Test doubles for engines and analyzers
pub mod testing;

// Re-export foundation types
pub use base::{FileId, LineCol, LineIndex, Position, PositionHandle, SourceMap, Span, TextRange, TextSize};
pub use config::AnalysisConfig;
pub use ide::{AnalysisHost, LoadError, LoadedProgram};
