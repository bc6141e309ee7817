//! Analyzer: one semantic-analysis pass over a compilation unit.
//!
//! [`EngineAnalyzer`] reads the unit's files through a [`FileSource`],
//! registers them in a fresh [`SourceMap`], parses them in parallel and has
//! the [`SemanticEngine`] check the unit. Imports are followed transitively
//! and their units checked first, declarations only. Errors never abort
//! the pass; they end up as diagnostics on the result.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, warn};

use super::diagnostics::{Diagnostic, extract_diagnostics};
use super::engine::{
    CheckContext, CheckDepth, EngineError, ErrorSpan, ParseOutcome, SemanticEngine,
};
use super::program::{Import, Program, SyntaxTree, UnitAnalysis, UnitInfo};
use crate::base::{FileId, SourceMap};
use crate::project::{
    AnalysisKey, CompilationUnit, EXTERNAL_TEST_SUFFIX, FileSource, UnitResolver,
    narrow_to_file,
};

/// Decides which units are checked in full.
pub type TargetPredicate = Arc<dyn Fn(&AnalysisKey) -> bool + Send + Sync>;

/// A unit to analyze.
#[derive(Clone)]
pub struct AnalysisRequest {
    pub unit: CompilationUnit,
    is_target: TargetPredicate,
}

impl AnalysisRequest {
    /// Request that checks `unit` in full and its dependencies declarations
    /// only.
    pub fn new(unit: CompilationUnit) -> Self {
        let key = unit.key();
        Self {
            unit,
            is_target: Arc::new(move |candidate: &AnalysisKey| *candidate == key),
        }
    }

    pub fn with_target_predicate(
        mut self,
        is_target: impl Fn(&AnalysisKey) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_target = Arc::new(is_target);
        self
    }

    pub fn is_target(&self, key: &AnalysisKey) -> bool {
        (self.is_target)(key)
    }
}

impl fmt::Debug for AnalysisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisRequest")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

/// Terminal analysis errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("no program produced for {import_path} in {}", dir.display())]
    NoProgramProduced { import_path: SmolStr, dir: PathBuf },

    /// Attached to a result whose unit was only partly readable.
    #[error("{} file(s) of the unit could not be read", files.len())]
    PartialLoad { files: Vec<PathBuf> },
}

/// Outcome of one analysis pass, shared read-only once cached.
#[derive(Debug)]
pub struct AnalysisResult {
    unit: CompilationUnit,
    source_map: SourceMap,
    program: Program,
    diagnostics: Vec<Diagnostic>,
    error: Option<AnalysisError>,
}

impl AnalysisResult {
    pub fn new(
        unit: CompilationUnit,
        source_map: SourceMap,
        program: Program,
        diagnostics: Vec<Diagnostic>,
        error: Option<AnalysisError>,
    ) -> Self {
        Self {
            unit,
            source_map,
            program,
            diagnostics,
            error,
        }
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Set when the pass finished but not every file could be loaded.
    pub fn error(&self) -> Option<&AnalysisError> {
        self.error.as_ref()
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.source_map.file_by_path(path).map(|f| f.id())
    }
}

/// Runs an analysis pass.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}

/// [`Analyzer`] driving a [`SemanticEngine`].
pub struct EngineAnalyzer {
    engine: Arc<dyn SemanticEngine>,
    source: Arc<dyn FileSource>,
    resolver: Arc<dyn UnitResolver>,
    pool: Option<rayon::ThreadPool>,
}

impl EngineAnalyzer {
    pub fn new(
        engine: Arc<dyn SemanticEngine>,
        source: Arc<dyn FileSource>,
        resolver: Arc<dyn UnitResolver>,
    ) -> Self {
        Self {
            engine,
            source,
            resolver,
            pool: None,
        }
    }

    /// Parse on a dedicated pool of `threads` threads instead of the global
    /// rayon pool.
    pub fn with_parse_threads(mut self, threads: usize) -> Self {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("semcache-parse-{i}"))
            .build()
        {
            Ok(pool) => self.pool = Some(pool),
            Err(e) => warn!(threads, error = %e, "falling back to the global parse pool"),
        }
        self
    }

    fn parse_all(&self, files: &[(FileId, PathBuf, Arc<[u8]>)]) -> Vec<ParseOutcome> {
        let parse = || -> Vec<ParseOutcome> {
            files
                .par_iter()
                .map(|(id, path, text)| self.engine.parse(*id, path, text))
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(parse),
            None => parse(),
        }
    }
}

impl Analyzer for EngineAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let unit = &request.unit;
        let mut pass = Pass::new(self, request);

        let trees = pass.load_files(unit);
        if trees.is_empty() {
            debug!(
                import_path = %unit.import_path,
                unreadable = pass.unreadable.len(),
                "no syntax tree produced"
            );
            return Err(AnalysisError::NoProgramProduced {
                import_path: unit.import_path.clone(),
                dir: unit.dir.clone(),
            });
        }

        // An external-test unit may import the unit it tests.
        if !unit.is_test_variant {
            pass.visiting.insert(unit.import_path.clone());
        }
        pass.load_imports(&trees);

        let depth = if request.is_target(&unit.key()) {
            CheckDepth::Full
        } else {
            CheckDepth::Exported
        };
        let target = pass.check(unit, trees, depth);
        Ok(pass.finish(target))
    }
}

/// State of one [`EngineAnalyzer::analyze`] call.
struct Pass<'a> {
    analyzer: &'a EngineAnalyzer,
    request: &'a AnalysisRequest,
    source_map: SourceMap,
    errors: Vec<EngineError>,
    unreadable: Vec<PathBuf>,
    dependencies: IndexMap<SmolStr, Arc<UnitAnalysis>>,
    /// Import paths currently being loaded.
    visiting: FxHashSet<SmolStr>,
    /// Import paths that failed, with the reason.
    failed: FxHashMap<SmolStr, String>,
}

impl<'a> Pass<'a> {
    fn new(analyzer: &'a EngineAnalyzer, request: &'a AnalysisRequest) -> Self {
        Self {
            analyzer,
            request,
            source_map: SourceMap::new(),
            errors: Vec::new(),
            unreadable: Vec::new(),
            dependencies: IndexMap::new(),
            visiting: FxHashSet::default(),
            failed: FxHashMap::default(),
        }
    }

    /// Register, read and parse the files of `unit`, returning every tree
    /// that could be produced.
    fn load_files(&mut self, unit: &CompilationUnit) -> Vec<Arc<SyntaxTree>> {
        let mut loaded = Vec::new();
        for path in unit.analysis_files() {
            match self.analyzer.source.read(&path) {
                Ok(text) => {
                    let id = self.source_map.add_file(&path, &text);
                    loaded.push((id, path, text));
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable file");
                    self.errors.push(EngineError::Source {
                        path: path.clone(),
                        message: e.reason(),
                    });
                    self.unreadable.push(path);
                }
            }
        }

        let mut trees = Vec::with_capacity(loaded.len());
        for outcome in self.analyzer.parse_all(&loaded) {
            self.errors.extend(outcome.errors);
            if let Some(tree) = outcome.tree {
                trees.push(Arc::new(tree));
            }
        }
        trees
    }

    /// Load every unit imported by `trees`, dependencies first.
    fn load_imports(&mut self, trees: &[Arc<SyntaxTree>]) {
        for tree in trees {
            for import in &tree.imports {
                self.require(tree.file, import);
            }
        }
    }

    fn require(&mut self, file: FileId, import: &Import) {
        let path = &import.path;
        if self.dependencies.contains_key(path) {
            return;
        }
        let reason = if let Some(reason) = self.failed.get(path) {
            reason.clone()
        } else if self.visiting.contains(path) {
            "import cycle not allowed".to_string()
        } else {
            match self.load_dependency(path) {
                Ok(()) => return,
                Err(reason) => {
                    warn!(import_path = %path, reason = %reason, "could not import");
                    self.failed.insert(path.clone(), reason.clone());
                    reason
                }
            }
        };
        self.errors.push(EngineError::Import {
            span: Some(ErrorSpan::new(file, import.range.start(), import.range.end())),
            path: path.clone(),
            reason,
        });
    }

    fn load_dependency(&mut self, import_path: &SmolStr) -> Result<(), String> {
        let scan = self
            .analyzer
            .resolver
            .resolve_import(import_path)
            .map_err(|e| e.to_string())?;

        // Other units sharing the directory are ignored when importing.
        let primary = scan
            .import_unit_name(import_path)
            .and_then(|name| scan.primary_file_of(name));
        let mut unit = match primary {
            Some(file) if scan.is_multi_unit() => {
                narrow_to_file(&scan, file).map_err(|e| e.to_string())?
            }
            _ => scan.unit.clone(),
        };
        // Test files only take part for the unit under test itself.
        if *import_path != self.request.unit.import_path {
            unit.test_files.clear();
        }
        unit.external_test_files.clear();

        self.visiting.insert(import_path.clone());
        let trees = self.load_files(&unit);
        if trees.is_empty() {
            self.visiting.remove(import_path);
            return Err(format!("no buildable source files in {}", unit.dir.display()));
        }
        self.load_imports(&trees);
        self.visiting.remove(import_path);

        let depth = if self.request.is_target(&unit.key()) {
            CheckDepth::Full
        } else {
            CheckDepth::Exported
        };
        let analysis = self.check(&unit, trees, depth);
        self.dependencies.insert(import_path.clone(), Arc::new(analysis));
        Ok(())
    }

    fn check(&mut self, unit: &CompilationUnit, trees: Vec<Arc<SyntaxTree>>, depth: CheckDepth) -> UnitAnalysis {
        // The external-test variant gets its own path so that it never
        // collides with the unit it tests.
        let import_path = if unit.is_test_variant {
            SmolStr::new(format!("{}{}", unit.import_path, EXTERNAL_TEST_SUFFIX))
        } else {
            unit.import_path.clone()
        };
        let info = UnitInfo {
            import_path,
            name: unit.name.clone(),
            dir: unit.dir.clone(),
        };

        let analyzer = self.analyzer;
        let outcome = analyzer.engine.check(&CheckContext {
            unit: &info,
            trees: &trees,
            depth,
            dependencies: &self.dependencies,
        });
        self.errors.extend(outcome.errors);

        UnitAnalysis {
            info,
            depth,
            trees,
            symbols: outcome.symbols,
            references: outcome.references,
        }
    }

    fn finish(self, target: UnitAnalysis) -> AnalysisResult {
        let diagnostics = extract_diagnostics(&self.errors, &self.source_map);
        let error = (!self.unreadable.is_empty()).then(|| AnalysisError::PartialLoad {
            files: self.unreadable.clone(),
        });
        debug!(
            import_path = %self.request.unit.import_path,
            files = self.source_map.file_count(),
            dependencies = self.dependencies.len(),
            diagnostics = diagnostics.len(),
            "analysis finished"
        );
        AnalysisResult::new(
            self.request.unit.clone(),
            self.source_map,
            Program::new(Arc::new(target), self.dependencies),
            diagnostics,
            error,
        )
    }
}
