//! Host construction and result inspection helpers.

use std::sync::Arc;

use semcache::hir::{AnalysisResult, Severity};
use semcache::project::FileSource;
use semcache::testing::{ScriptEngine, StubAnalyzer};
use semcache::{AnalysisConfig, AnalysisHost};

use super::source_fixtures::{ROOT, ROOT_IMPORT};

/// Configuration for the fixture workspace.
pub fn config() -> AnalysisConfig {
    AnalysisConfig::new().with_workspace(ROOT, ROOT_IMPORT)
}

/// A host analyzing with a fresh [`ScriptEngine`].
pub fn script_host(source: Arc<dyn FileSource>) -> (AnalysisHost, Arc<ScriptEngine>) {
    script_host_with(config(), source)
}

pub fn script_host_with(
    config: AnalysisConfig,
    source: Arc<dyn FileSource>,
) -> (AnalysisHost, Arc<ScriptEngine>) {
    let engine = Arc::new(ScriptEngine::new());
    let host = AnalysisHost::new(config, source, engine.clone());
    (host, engine)
}

/// A host whose analysis is done by `stub`.
pub fn stub_host(
    config: AnalysisConfig,
    source: Arc<dyn FileSource>,
    stub: Arc<StubAnalyzer>,
) -> AnalysisHost {
    let resolver = Arc::new(AnalysisHost::resolver_for(&config, source.clone()));
    AnalysisHost::with_analyzer(config, source, resolver, stub)
}

/// Messages of all error-level diagnostics.
pub fn error_messages(result: &AnalysisResult) -> Vec<String> {
    result
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.to_string())
        .collect()
}
