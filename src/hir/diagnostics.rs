//! Diagnostics: turning engine errors into client-facing reports.
//!
//! [`extract_diagnostics`] maps the errors collected during one analysis onto
//! the analysis source map. Publishers then group the result per file with
//! [`group_by_file`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::error;

use super::engine::{EngineError, ErrorSpan};
use crate::base::{FileId, Position, PositionHandle, SourceMap, Span};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// Where a diagnostic is anchored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticLocation {
    pub file: FileId,
    pub path: PathBuf,
    /// Zero-based start and end of the error.
    pub span: Span,
    /// Start of the error in the analysis source map.
    pub handle: PositionHandle,
}

/// A diagnostic message, anchored to a file or reported for the whole unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// `None` for unit-level diagnostics.
    pub location: Option<DiagnosticLocation>,
    /// Severity level.
    pub severity: Severity,
    /// Error code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    /// The diagnostic message.
    pub message: Arc<str>,
}

impl Diagnostic {
    /// Create a new unit-level error diagnostic.
    pub fn error(message: impl Into<Arc<str>>) -> Self {
        Self {
            location: None,
            severity: Severity::Error,
            code: None,
            message: message.into(),
        }
    }

    /// Create a new unit-level warning diagnostic.
    pub fn warning(message: impl Into<Arc<str>>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn with_location(mut self, location: DiagnosticLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.location.as_ref().map(|l| l.path.as_path())
    }

    pub fn file(&self) -> Option<FileId> {
        self.location.as_ref().map(|l| l.file)
    }

    pub fn is_unit_level(&self) -> bool {
        self.location.is_none()
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable codes attached to extracted diagnostics.
pub mod codes {
    /// Syntax error in a source file.
    pub const SYNTAX: &str = "E0001";
    /// Type or name resolution error.
    pub const SEMANTIC: &str = "E0002";
    /// An import could not be resolved or loaded.
    pub const IMPORT: &str = "E0003";
    /// A source file of the unit could not be read.
    pub const UNREADABLE_SOURCE: &str = "E0004";
    /// Error about the unit as a whole.
    pub const UNIT: &str = "E0005";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during semantic analysis.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get diagnostics for a specific file.
    pub fn diagnostics_for_file(&self, file: FileId) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.file() == Some(file))
            .collect()
    }

    /// Get diagnostics reported against `path`.
    pub fn diagnostics_for_path(&self, path: &Path) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.path().is_some_and(|p| crate::base::paths_equal(p, path)))
            .collect()
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Clear all diagnostics.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// A span that does not map into the source map.
struct Malformed(ErrorSpan);

/// Convert engine errors into diagnostics, preserving their order.
///
/// Lists are reported as their first error followed by "(and N more
/// errors)"; empty lists are skipped. If any error points outside the
/// source map the input is considered malformed and nothing is returned.
pub fn extract_diagnostics(errors: &[EngineError], source_map: &SourceMap) -> Vec<Diagnostic> {
    let mut collector = DiagnosticCollector::new();
    for err in errors {
        match to_diagnostic(err, source_map) {
            Ok(Some(diagnostic)) => collector.add(diagnostic),
            Ok(None) => {}
            Err(Malformed(span)) => {
                error!(
                    file = %span.file,
                    offset = u32::from(span.start),
                    error = %err,
                    "error location is not part of the analysis source map"
                );
                return Vec::new();
            }
        }
    }
    collector.take()
}

fn to_diagnostic(err: &EngineError, map: &SourceMap) -> Result<Option<Diagnostic>, Malformed> {
    let (message, severity, code, span) = match err {
        EngineError::List(errors) => {
            let Some(first) = errors.first() else {
                return Ok(None);
            };
            let Some(mut diagnostic) = to_diagnostic(first, map)? else {
                return Ok(None);
            };
            if errors.len() > 1 {
                diagnostic.message = format!(
                    "{} (and {} more errors)",
                    diagnostic.message,
                    errors.len() - 1
                )
                .into();
            }
            return Ok(Some(diagnostic));
        }
        EngineError::Syntax { span, message } => (message.clone(), Severity::Error, codes::SYNTAX, Some(*span)),
        EngineError::Semantic {
            span,
            message,
            soft,
        } => {
            let severity = if *soft { Severity::Warning } else { Severity::Error };
            (message.clone(), severity, codes::SEMANTIC, Some(*span))
        }
        EngineError::Import { span, .. } => (err.to_string(), Severity::Error, codes::IMPORT, *span),
        EngineError::Source { .. } => (err.to_string(), Severity::Error, codes::UNREADABLE_SOURCE, None),
        EngineError::Unit { message } => (message.clone(), Severity::Error, codes::UNIT, None),
    };

    let mut diagnostic = Diagnostic::error(message.trim())
        .with_code(code);
    diagnostic.severity = severity;
    if let Some(span) = span {
        diagnostic = diagnostic.with_location(locate(span, map)?);
    }
    Ok(Some(diagnostic))
}

fn locate(span: ErrorSpan, map: &SourceMap) -> Result<DiagnosticLocation, Malformed> {
    let file = map.file(span.file).ok_or(Malformed(span))?;
    let index = file.line_index();
    let start = index.line_col(span.start).ok_or(Malformed(span))?;
    let end = match span.end {
        Some(end) if end >= span.start => index.line_col(end).ok_or(Malformed(span))?,
        _ => start,
    };
    let handle = map.handle(span.file, span.start).map_err(|_| Malformed(span))?;
    Ok(DiagnosticLocation {
        file: span.file,
        path: file.path().to_path_buf(),
        span: Span::new(Position::from(start), Position::from(end)),
        handle,
    })
}

/// Group anchored diagnostics by file path, in order of first appearance.
///
/// Unit-level diagnostics have no file and are left out.
pub fn group_by_file(diagnostics: &[Diagnostic]) -> IndexMap<PathBuf, Vec<Diagnostic>> {
    let mut grouped: IndexMap<PathBuf, Vec<Diagnostic>> = IndexMap::new();
    for diagnostic in diagnostics {
        if let Some(path) = diagnostic.path() {
            grouped
                .entry(path.to_path_buf())
                .or_default()
                .push(diagnostic.clone());
        }
    }
    grouped
}
