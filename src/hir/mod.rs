//! High-level IR (HIR): Memoized semantic analysis of compilation units.
//!
//! This module turns a [`CompilationUnit`](crate::project::CompilationUnit)
//! into an immutable [`AnalysisResult`] and shares that result between
//! every request asking about the same unit.
//!
//! ## Key Types
//!
//! - [`SemanticEngine`] - Parser and checker for the analyzed language
//! - [`EngineAnalyzer`] - Drives the engine over a unit and its imports
//! - [`AnalysisCache`] - Computes each [`AnalysisKey`](crate::project::AnalysisKey) once
//! - [`Program`] - Target unit plus dependencies, navigable by offset
//! - [`Diagnostic`] - Engine errors mapped onto the analysis source map
//!
//! ## Pass Layers
//!
//! ```text
//! read files               ← FileSource, in unit list order
//!     │
//!     ▼
//! parse(file)              ← per file, in parallel
//!     │
//!     ▼
//! check(imports)           ← declarations only, post-order
//!     │
//!     ▼
//! check(target)            ← full depth
//!     │
//!     ▼
//! extract_diagnostics      ← errors → per-file diagnostics
//! ```

mod analyzer;
mod cache;
mod diagnostics;
mod engine;
mod program;

pub use analyzer::{
    AnalysisError, AnalysisRequest, AnalysisResult, Analyzer, EngineAnalyzer, TargetPredicate,
};
pub use cache::{AnalysisCache, CacheError, CacheStats, FailurePolicy, MemoCache};
pub use diagnostics::{
    Diagnostic, DiagnosticCollector, DiagnosticLocation, Severity, codes, extract_diagnostics,
    group_by_file,
};
pub use engine::{
    CheckContext, CheckDepth, CheckOutcome, EngineError, ErrorSpan, ParseOutcome, SemanticEngine,
};
pub use program::{
    Decl, DeclKind, Import, NameRef, Program, Reference, Symbol, SymbolRef, SyntaxTree,
    UnitAnalysis, UnitInfo,
};
