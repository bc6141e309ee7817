//! Program: the navigable result of one analysis pass.
//!
//! A [`Program`] holds the analyzed target unit and every unit it imports,
//! each as a [`UnitAnalysis`] with its syntax trees, declared symbols and
//! resolved references. Everything is immutable once built.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::engine::CheckDepth;
use crate::base::FileId;

// ============================================================================
// SYNTAX
// ============================================================================

/// An import clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub path: SmolStr,
    /// Range of the quoted import path.
    pub range: TextRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Func,
    Var,
    Const,
    Type,
}

impl DeclKind {
    pub fn display(&self) -> &'static str {
        match self {
            DeclKind::Func => "func",
            DeclKind::Var => "var",
            DeclKind::Const => "const",
            DeclKind::Type => "type",
        }
    }
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decl {
    pub name: SmolStr,
    pub kind: DeclKind,
    /// Range of the declared name.
    pub range: TextRange,
    pub exported: bool,
}

/// A use of a name, optionally qualified by an imported unit (`fmt.Println`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRef {
    pub qualifier: Option<SmolStr>,
    pub name: SmolStr,
    pub range: TextRange,
}

/// Parsed form of one source file. May be partial if the file had errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxTree {
    pub file: FileId,
    pub path: PathBuf,
    /// Name from the file's unit clause.
    pub unit_name: SmolStr,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
    pub refs: Vec<NameRef>,
}

impl SyntaxTree {
    pub fn new(file: FileId, path: impl Into<PathBuf>, unit_name: impl Into<SmolStr>) -> Self {
        Self {
            file,
            path: path.into(),
            unit_name: unit_name.into(),
            imports: Vec::new(),
            decls: Vec::new(),
            refs: Vec::new(),
        }
    }
}

// ============================================================================
// SEMANTICS
// ============================================================================

/// A declared symbol after checking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: DeclKind,
    pub file: FileId,
    pub range: TextRange,
    pub exported: bool,
}

/// Where a reference points.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    /// Import path of the unit declaring the symbol.
    pub import_path: SmolStr,
    /// Index into that unit's [`UnitAnalysis::symbols`].
    pub index: usize,
}

/// A reference after checking. `target` is `None` if it did not resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub file: FileId,
    pub range: TextRange,
    pub qualifier: Option<SmolStr>,
    pub name: SmolStr,
    pub target: Option<SymbolRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitInfo {
    pub import_path: SmolStr,
    pub name: SmolStr,
    pub dir: PathBuf,
}

/// One checked unit.
#[derive(Clone, Debug)]
pub struct UnitAnalysis {
    pub info: UnitInfo,
    pub depth: CheckDepth,
    pub trees: Vec<Arc<SyntaxTree>>,
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
}

impl UnitAnalysis {
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    pub fn exported_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.exported)
    }

    pub fn tree(&self, file: FileId) -> Option<&SyntaxTree> {
        self.trees.iter().map(Arc::as_ref).find(|t| t.file == file)
    }

    pub fn contains_file(&self, file: FileId) -> bool {
        self.tree(file).is_some()
    }
}

/// The target unit plus its transitive dependencies.
#[derive(Clone, Debug)]
pub struct Program {
    target: Arc<UnitAnalysis>,
    dependencies: IndexMap<SmolStr, Arc<UnitAnalysis>>,
}

impl Program {
    pub fn new(target: Arc<UnitAnalysis>, dependencies: IndexMap<SmolStr, Arc<UnitAnalysis>>) -> Self {
        Self {
            target,
            dependencies,
        }
    }

    pub fn target(&self) -> &UnitAnalysis {
        &self.target
    }

    /// Dependencies keyed by import path, in the order they were checked.
    pub fn dependencies(&self) -> &IndexMap<SmolStr, Arc<UnitAnalysis>> {
        &self.dependencies
    }

    /// The target first, then dependencies.
    pub fn units(&self) -> impl Iterator<Item = &UnitAnalysis> {
        std::iter::once(self.target.as_ref()).chain(self.dependencies.values().map(Arc::as_ref))
    }

    /// Unit by import path. The target wins over a dependency of the same
    /// path.
    pub fn unit(&self, import_path: &str) -> Option<&UnitAnalysis> {
        if self.target.info.import_path == import_path {
            return Some(self.target.as_ref());
        }
        self.dependencies.get(import_path).map(Arc::as_ref)
    }

    pub fn tree(&self, file: FileId) -> Option<&SyntaxTree> {
        self.units().find_map(|u| u.tree(file))
    }

    /// The unit a file was analyzed as part of.
    pub fn unit_of_file(&self, file: FileId) -> Option<&UnitAnalysis> {
        self.units().find(|u| u.contains_file(file))
    }

    /// Reference covering `offset` in `file`.
    pub fn reference_at(&self, file: FileId, offset: TextSize) -> Option<&Reference> {
        self.unit_of_file(file)?
            .references
            .iter()
            .find(|r| r.file == file && r.range.contains_inclusive(offset))
    }

    /// Symbol declared at `offset` in `file`.
    pub fn declaration_at(&self, file: FileId, offset: TextSize) -> Option<&Symbol> {
        self.unit_of_file(file)?
            .symbols
            .iter()
            .find(|s| s.file == file && s.range.contains_inclusive(offset))
    }

    pub fn resolve(&self, target: &SymbolRef) -> Option<&Symbol> {
        self.unit(&target.import_path)?.symbols.get(target.index)
    }

    /// Symbol under `offset`: either declared there or referenced from there.
    pub fn symbol_at(&self, file: FileId, offset: TextSize) -> Option<&Symbol> {
        if let Some(symbol) = self.declaration_at(file, offset) {
            return Some(symbol);
        }
        let target = self.reference_at(file, offset)?.target.as_ref()?;
        self.resolve(target)
    }
}
