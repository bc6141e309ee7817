//! Analysis of whole units through the host.

use std::sync::Arc;

use semcache::Position;
use semcache::hir::{AnalysisError, CacheError, CheckDepth, Severity, codes};
use semcache::ide::LoadError;

use crate::helpers::host_helpers::*;
use crate::helpers::source_fixtures::*;

// =============================================================================
// ERROR TOLERANCE
// =============================================================================

#[test]
fn test_syntax_error_in_first_file_still_yields_program() {
    let source = workspace(&[
        ("app/a.go", "package app\nfunc A() { @@ }\n"),
        ("app/b.go", "package app\nfunc B() {}\n"),
    ]);
    let (host, _) = script_host(source);

    let loaded = host
        .load_program(&ws_path("app/b.go"), Position::new(1, 5))
        .unwrap();
    let analysis = &loaded.analysis;

    assert!(analysis.error().is_none());
    let names: Vec<&str> = analysis
        .program()
        .target()
        .symbols
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B"]);

    let diagnostics = analysis.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.code.as_deref(), Some(codes::SYNTAX));
    assert_eq!(diagnostic.path(), Some(ws_path("app/a.go").as_path()));
    let span = diagnostic.location.as_ref().unwrap().span;
    assert_eq!(span.start, Position::new(1, 11));
    assert_eq!(span.end, Position::new(1, 13));
}

#[test]
fn test_files_registered_in_unit_order() {
    let source = workspace(&[
        ("app/b.go", "package app\n"),
        ("app/a.go", "package app\n"),
        ("app/a_test.go", "package app\n"),
    ]);
    let (host, _) = script_host(source);
    let unit = host.load_unit(&ws_path("app/a.go")).unwrap();
    let analysis = host.analysis(&unit).unwrap();

    let paths: Vec<_> = analysis
        .source_map()
        .files()
        .iter()
        .map(|f| f.path().to_path_buf())
        .collect();
    assert_eq!(
        paths,
        vec![ws_path("app/a.go"), ws_path("app/b.go"), ws_path("app/a_test.go")]
    );
}

#[test]
fn test_zero_loadable_files_produce_no_program() {
    let source = workspace(&[("empty/notes.go", "// nothing declared here\n")]);
    let (host, engine) = script_host(source);

    let err = host
        .load_program(&ws_path("empty/notes.go"), Position::new(0, 0))
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::Analysis(CacheError::Failed(AnalysisError::NoProgramProduced { .. }))
    ));
    assert_eq!(engine.check_calls(), 0);
}

// =============================================================================
// DEPENDENCIES
// =============================================================================

#[test]
fn test_dependency_checked_declarations_only() {
    let (host, _) = script_host(app_workspace());
    let loaded = host
        .load_program(&ws_path("app/main.go"), Position::new(0, 0))
        .unwrap();
    let program = loaded.analysis.program();

    assert_eq!(program.target().depth, CheckDepth::Full);
    let util = program.unit("example.com/ws/util").unwrap();
    assert_eq!(util.depth, CheckDepth::Exported);
    assert!(util.references.is_empty());

    let help = &program.target().references[0];
    let target = help.target.as_ref().unwrap();
    assert_eq!(program.resolve(target).unwrap().name, "Help");
    assert!(loaded.analysis.diagnostics().is_empty());
}

#[test]
fn test_unexported_dependency_symbol_is_reported() {
    let source = workspace(&[
        ("app/main.go", "package app\nimport \"example.com/ws/util\"\nfunc Main() { util.hidden() }\n"),
        ("util/util.go", UTIL),
    ]);
    let (host, _) = script_host(source);
    let loaded = host
        .load_program(&ws_path("app/main.go"), Position::new(0, 0))
        .unwrap();

    assert_eq!(error_messages(&loaded.analysis), vec!["undefined: util.hidden"]);
}

#[test]
fn test_missing_import_is_diagnosed_at_import_site() {
    let source = workspace(&[(
        "app/main.go",
        "package app\nimport \"example.com/ws/nowhere\"\n",
    )]);
    let (host, _) = script_host(source);
    let loaded = host
        .load_program(&ws_path("app/main.go"), Position::new(0, 0))
        .unwrap();

    let diagnostics = loaded.analysis.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.as_deref(), Some(codes::IMPORT));
    assert!(
        diagnostics[0]
            .message
            .starts_with("could not import example.com/ws/nowhere (")
    );
    let span = diagnostics[0].location.as_ref().unwrap().span;
    assert_eq!(span.start, Position::new(1, 7));
}

#[test]
fn test_external_test_sees_unit_under_test() {
    let (host, _) = script_host(mixed_test_workspace());
    let loaded = host
        .load_program(&ws_path("mixed/pkg_external_test.go"), Position::new(0, 0))
        .unwrap();
    let program = loaded.analysis.program();

    assert!(loaded.unit.is_test_variant);
    assert_eq!(program.target().info.name, "pkg_test");
    assert!(loaded.analysis.diagnostics().is_empty());

    // The unit under test is loaded with its in-unit tests.
    let under_test = program.unit("example.com/ws/mixed").unwrap();
    let names: Vec<&str> = under_test.symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Pkg", "TestPkg"]);
}

#[test]
fn test_base_and_external_test_analyses_are_separate() {
    let (host, engine) = script_host(mixed_test_workspace());
    let base = host
        .load_program(&ws_path("mixed/pkg.go"), Position::new(0, 0))
        .unwrap();
    let external = host
        .load_program(&ws_path("mixed/pkg_external_test.go"), Position::new(0, 0))
        .unwrap();

    assert!(!Arc::ptr_eq(&base.analysis, &external.analysis));
    assert_eq!(host.cache().len(), 2);
    // pkg, then pkg_test plus pkg again as its dependency
    assert_eq!(engine.check_calls(), 3);
}
