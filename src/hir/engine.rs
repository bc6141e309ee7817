//! Semantic engine seam.
//!
//! Parsing and checking are delegated to a [`SemanticEngine`]. The analyzer
//! only drives it: it decides which files belong together, in which order
//! units are checked, and how deep each unit is checked.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use text_size::TextSize;
use thiserror::Error;

use super::program::{Reference, Symbol, SyntaxTree, UnitAnalysis, UnitInfo};
use crate::base::FileId;

/// How much of a unit is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckDepth {
    /// Declarations only. Used for dependencies.
    Exported,
    /// Declarations and bodies, with every reference resolved.
    Full,
}

/// Location of an engine error inside the analysis source map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorSpan {
    pub file: FileId,
    pub start: TextSize,
    /// `None` if the engine only knows where the error starts.
    pub end: Option<TextSize>,
}

impl ErrorSpan {
    pub fn at(file: FileId, start: TextSize) -> Self {
        Self {
            file,
            start,
            end: None,
        }
    }

    pub fn new(file: FileId, start: TextSize, end: TextSize) -> Self {
        Self {
            file,
            start,
            end: Some(end),
        }
    }
}

/// An error reported while parsing or checking.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{message}")]
    Syntax { span: ErrorSpan, message: String },

    /// `soft` errors do not make the program invalid (unused variables and
    /// the like).
    #[error("{message}")]
    Semantic {
        span: ErrorSpan,
        message: String,
        soft: bool,
    },

    #[error("could not import {path} ({reason})")]
    Import {
        span: Option<ErrorSpan>,
        path: SmolStr,
        reason: String,
    },

    #[error("{}: {message}", path.display())]
    Source { path: PathBuf, message: String },

    #[error("{message}")]
    Unit { message: String },

    /// Several errors reported as one.
    #[error("{} errors", .0.len())]
    List(Vec<EngineError>),
}

impl EngineError {
    pub fn syntax(span: ErrorSpan, message: impl Into<String>) -> Self {
        Self::Syntax {
            span,
            message: message.into(),
        }
    }

    pub fn semantic(span: ErrorSpan, message: impl Into<String>) -> Self {
        Self::Semantic {
            span,
            message: message.into(),
            soft: false,
        }
    }

    pub fn span(&self) -> Option<ErrorSpan> {
        match self {
            Self::Syntax { span, .. } | Self::Semantic { span, .. } => Some(*span),
            Self::Import { span, .. } => *span,
            Self::Source { .. } | Self::Unit { .. } => None,
            Self::List(errors) => errors.first().and_then(Self::span),
        }
    }
}

/// Result of parsing one file.
#[derive(Clone, Debug, Default)]
pub struct ParseOutcome {
    /// `None` if nothing usable could be recovered from the file.
    pub tree: Option<SyntaxTree>,
    pub errors: Vec<EngineError>,
}

/// Input to checking one unit.
pub struct CheckContext<'a> {
    pub unit: &'a UnitInfo,
    pub trees: &'a [Arc<SyntaxTree>],
    pub depth: CheckDepth,
    /// Units already checked, keyed by import path.
    pub dependencies: &'a IndexMap<SmolStr, Arc<UnitAnalysis>>,
}

impl CheckContext<'_> {
    /// The dependency a tree refers to by `qualifier`.
    ///
    /// A qualifier names an import of `tree` whose unit is called
    /// `qualifier`.
    pub fn dependency_for(&self, tree: &SyntaxTree, qualifier: &str) -> Option<&Arc<UnitAnalysis>> {
        tree.imports
            .iter()
            .filter_map(|import| self.dependencies.get(import.path.as_str()))
            .find(|dep| dep.info.name == qualifier)
    }
}

/// Result of checking one unit.
#[derive(Clone, Debug, Default)]
pub struct CheckOutcome {
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub errors: Vec<EngineError>,
}

/// Parser and type checker for one language.
///
/// Implementations must tolerate broken input: syntax errors produce a
/// partial tree where possible, and checking always produces what it can.
pub trait SemanticEngine: Send + Sync {
    fn parse(&self, file: FileId, path: &Path, text: &[u8]) -> ParseOutcome;

    fn check(&self, cx: &CheckContext<'_>) -> CheckOutcome;
}
