//! Hosts built from client initialization options.

use std::sync::Arc;

use semcache::hir::FailurePolicy;
use semcache::project::ImportRoot;
use semcache::testing::ScriptEngine;
use semcache::{AnalysisConfig, AnalysisHost, Position};
use serde_json::json;

use crate::helpers::source_fixtures::*;

#[test]
fn test_host_from_initialization_options() {
    let options = json!({
        "rootImportPath": "example.com/ws",
        "workspaceRoot": "/ws",
        "failurePolicy": "retry",
        "maxParallelism": 2,
        "importRoots": [{ "importPrefix": "", "dir": "/ws/vendor" }]
    });
    let config = AnalysisConfig::from_initialization_options(&options).unwrap();
    assert_eq!(config.failure_policy, FailurePolicy::Retry);
    assert_eq!(config.import_roots, vec![ImportRoot::new("", "/ws/vendor")]);

    let source = workspace(&[
        ("app/main.go", "package app\nimport \"github.com/lib/fmtx\"\nfunc Main() { fmtx.Print() }\n"),
        ("vendor/github.com/lib/fmtx/fmtx.go", "package fmtx\nfunc Print() {}\n"),
    ]);
    let host = AnalysisHost::new(config, source, Arc::new(ScriptEngine::new()));
    assert_eq!(host.cache().policy(), FailurePolicy::Retry);

    let loaded = host
        .load_program(&ws_path("app/main.go"), Position::new(2, 14))
        .unwrap();
    assert!(loaded.analysis.diagnostics().is_empty());
    assert!(loaded.analysis.program().unit("github.com/lib/fmtx").is_some());
}

#[test]
fn test_null_options_accept_any_absolute_path() {
    let config = AnalysisConfig::from_initialization_options(&serde_json::Value::Null).unwrap();
    let source = Arc::new(semcache::project::MemorySource::from_files([(
        "/anywhere/tool/main.go",
        "package main\nfunc main() {}\n",
    )]));
    let host = AnalysisHost::new(config, source, Arc::new(ScriptEngine::new()));

    let loaded = host
        .load_program(std::path::Path::new("/anywhere/tool/main.go"), Position::new(1, 0))
        .unwrap();
    // Without a workspace the directory path doubles as import path.
    assert_eq!(loaded.unit.import_path, "anywhere/tool");
}
