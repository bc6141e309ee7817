//! AnalysisHost: Request entry point tying loader, cache and analyzer
//! together.
//!
//! The host owns the analysis cache. Every location request goes through
//! [`AnalysisHost::load_program`], which resolves the owning unit, reuses or
//! computes its analysis, and converts the requested position into a handle
//! valid against that analysis' source map.
//!
//! ## Usage
//!
//! ```ignore
//! let host = AnalysisHost::new(config, Arc::new(DiskSource), engine);
//!
//! let loaded = host.load_program(Path::new("/ws/app/main.go"), Position::new(4, 2))?;
//! let symbol = loaded.analysis.program().symbol_at(file, offset);
//!
//! // Files changed on disk
//! host.invalidate();
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span};

use super::error::LoadError;
use crate::base::{Position, PositionHandle, offset_for_position};
use crate::config::AnalysisConfig;
use crate::hir::{
    AnalysisCache, AnalysisRequest, AnalysisResult, Analyzer, Diagnostic, EngineAnalyzer,
    SemanticEngine, group_by_file,
};
use crate::project::{
    AnalysisKey, CompilationUnit, DirectoryResolver, FileSource, UnitResolver, WorkspaceLoader,
};

/// A loaded analysis plus the requested position inside it.
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub unit: CompilationUnit,
    pub analysis: Arc<AnalysisResult>,
    /// Valid against `analysis.source_map()` only.
    pub position: PositionHandle,
}

/// Owns the analysis cache and answers location requests.
///
/// Safe to share between request threads; all methods take `&self`.
pub struct AnalysisHost {
    config: AnalysisConfig,
    source: Arc<dyn FileSource>,
    loader: WorkspaceLoader,
    analyzer: Arc<dyn Analyzer>,
    cache: AnalysisCache,
}

impl AnalysisHost {
    /// Host analyzing with `engine`, resolving units from directory contents.
    pub fn new(
        config: AnalysisConfig,
        source: Arc<dyn FileSource>,
        engine: Arc<dyn SemanticEngine>,
    ) -> Self {
        let resolver: Arc<dyn UnitResolver> =
            Arc::new(Self::resolver_for(&config, Arc::clone(&source)));
        let mut analyzer =
            EngineAnalyzer::new(engine, Arc::clone(&source), Arc::clone(&resolver));
        if let Some(threads) = config.parse_threads() {
            analyzer = analyzer.with_parse_threads(threads);
        }
        Self::with_analyzer(config, source, resolver, Arc::new(analyzer))
    }

    /// Host with a custom resolver and analyzer.
    pub fn with_analyzer(
        config: AnalysisConfig,
        source: Arc<dyn FileSource>,
        resolver: Arc<dyn UnitResolver>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let mut loader = WorkspaceLoader::new(Arc::clone(&source), resolver);
        if let Some(root) = &config.workspace_root {
            loader = loader.with_root(root.clone());
        }
        let cache = AnalysisCache::new(config.failure_policy);
        Self {
            config,
            source,
            loader,
            analyzer,
            cache,
        }
    }

    /// The [`DirectoryResolver`] described by `config`.
    pub fn resolver_for(config: &AnalysisConfig, source: Arc<dyn FileSource>) -> DirectoryResolver {
        let mut resolver = DirectoryResolver::new(source)
            .with_import_roots(config.import_roots.iter().cloned())
            .with_layout(config.layout.clone());
        if let Some(root) = &config.workspace_root {
            resolver = resolver.with_workspace(root.clone(), config.root_import_path.clone());
        }
        resolver
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Load the program containing `path` and locate `position` in it.
    pub fn load_program(&self, path: &Path, position: Position) -> Result<LoadedProgram, LoadError> {
        self.load(path, position, None)
    }

    /// Like [`load_program`](Self::load_program), but stops waiting for
    /// another request's analysis once `token` is cancelled.
    pub fn load_program_cancellable(
        &self,
        path: &Path,
        position: Position,
        token: &CancellationToken,
    ) -> Result<LoadedProgram, LoadError> {
        if token.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        self.load(path, position, Some(token))
    }

    fn load(
        &self,
        path: &Path,
        position: Position,
        token: Option<&CancellationToken>,
    ) -> Result<LoadedProgram, LoadError> {
        let span = info_span!("load_program", file = %path.display());
        let _enter = span.enter();

        let unit = self.loader.load_unit(path)?;
        let analysis = self.analyze(&unit, token)?;

        let contents = self.source.read(path)?;
        let offset =
            offset_for_position(&contents, position).map_err(|fault| LoadError::InvalidPosition {
                path: path.to_path_buf(),
                line: position.line,
                column: position.column,
                fault,
            })?;
        let handle = analysis
            .source_map()
            .handle_for_offset(path, offset)
            .map_err(|source| LoadError::InvalidLocation {
                path: path.to_path_buf(),
                offset: offset.into(),
                source,
            })?;

        debug!(unit = %unit.key(), %position, "program loaded");
        Ok(LoadedProgram {
            unit,
            analysis,
            position: handle,
        })
    }

    /// The unit owning `path`, without analyzing it.
    pub fn load_unit(&self, path: &Path) -> Result<CompilationUnit, LoadError> {
        Ok(self.loader.load_unit(path)?)
    }

    /// Cached analysis of `unit`, computed on first use.
    pub fn analysis(&self, unit: &CompilationUnit) -> Result<Arc<AnalysisResult>, LoadError> {
        self.analyze(unit, None)
    }

    fn analyze(
        &self,
        unit: &CompilationUnit,
        token: Option<&CancellationToken>,
    ) -> Result<Arc<AnalysisResult>, LoadError> {
        let key = unit.key();
        let compute = || self.analyzer.analyze(&AnalysisRequest::new(unit.clone()));
        let result = match token {
            Some(token) => self.cache.get_cancellable(&key, token, compute),
            None => self.cache.get(&key, compute),
        };
        Ok(result?)
    }

    /// Diagnostics of `result` grouped per file, ready for publishing.
    ///
    /// Empty when diagnostics are disabled in the configuration.
    pub fn publishable_diagnostics(
        &self,
        result: &AnalysisResult,
    ) -> IndexMap<PathBuf, Vec<Diagnostic>> {
        if self.config.diagnostics_disabled {
            return IndexMap::new();
        }
        group_by_file(result.diagnostics())
    }

    /// Drop every cached analysis.
    pub fn invalidate(&self) {
        debug!(entries = self.cache.len(), "invalidating analysis cache");
        self.cache.clear();
    }

    /// Drop the cached analysis of one unit. Returns whether it was cached.
    pub fn invalidate_unit(&self, key: &AnalysisKey) -> bool {
        self.cache.evict(key)
    }
}
