//! Loading programs for location requests.

use std::path::Path;

use rstest::rstest;
use semcache::base::{LineCol, PositionFault, TextSize};
use semcache::ide::LoadError;
use semcache::project::ProjectError;
use semcache::{AnalysisHost, Position};

use crate::helpers::host_helpers::*;
use crate::helpers::source_fixtures::*;

fn app_host() -> AnalysisHost {
    script_host(app_workspace()).0
}

// =============================================================================
// POSITIONS
// =============================================================================

#[rstest]
#[case(0, 0, 0)]
#[case(0, 11, 11)]
#[case(2, 0, 13)]
#[case(4, 5, 48)]
#[case(4, 27, 70)]
// End of file, after the trailing newline
#[case(5, 0, 71)]
fn test_position_round_trips_through_handle(
    #[case] line: u32,
    #[case] column: u32,
    #[case] offset: u32,
) {
    let host = app_host();
    let path = ws_path("app/main.go");
    let loaded = host.load_program(&path, Position::new(line, column)).unwrap();

    let map = loaded.analysis.source_map();
    let resolved = map.resolve(loaded.position).unwrap();
    assert_eq!(map.file(resolved.file).unwrap().path(), path.as_path());
    assert_eq!(resolved.offset, TextSize::new(offset));
    assert_eq!(resolved.line_col, LineCol { line, col: column });
}

#[test]
fn test_handle_is_rejected_by_other_source_map() {
    let host = app_host();
    let app = host
        .load_program(&ws_path("app/main.go"), Position::new(0, 0))
        .unwrap();
    let util = host
        .load_program(&ws_path("util/util.go"), Position::new(0, 0))
        .unwrap();

    assert!(util.analysis.source_map().resolve(app.position).is_none());
}

#[test]
fn test_column_beyond_line_end_is_invalid_position() {
    let host = app_host();
    let err = host
        .load_program(&ws_path("app/main.go"), Position::new(0, 12))
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::InvalidPosition {
            line: 0,
            column: 12,
            fault: PositionFault::ColumnBeyondLineEnd { line_len: 11, .. },
            ..
        }
    ));
    assert!(err.to_string().starts_with("invalid position: /ws/app/main.go:0:12 (column beyond line end"));
}

#[test]
fn test_line_out_of_range_is_invalid_position() {
    let host = app_host();
    let err = host
        .load_program(&ws_path("app/extra.go"), Position::new(40, 0))
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::InvalidPosition {
            fault: PositionFault::LineOutOfRange { line: 40, .. },
            ..
        }
    ));
}

#[test]
fn test_file_grown_since_analysis_is_invalid_location() {
    let source = app_workspace();
    let (host, _) = script_host(source.clone());
    let path = ws_path("app/extra.go");
    host.load_program(&path, Position::new(0, 0)).unwrap();

    // The cached analysis still sees the old, shorter file.
    source.insert(&path, format!("{APP_EXTRA}var More = 2\n"));
    let err = host.load_program(&path, Position::new(3, 4)).unwrap_err();
    assert!(matches!(err, LoadError::InvalidLocation { .. }));
    assert_eq!(err.to_string(), "invalid location: /ws/app/extra.go:#31");

    host.invalidate();
    host.load_program(&path, Position::new(3, 4)).unwrap();
}

// =============================================================================
// REQUEST ERRORS
// =============================================================================

#[test]
fn test_out_of_workspace_request() {
    let err = app_host()
        .load_program(Path::new("/tmp/main.go"), Position::new(0, 0))
        .unwrap_err();
    assert!(matches!(err, LoadError::Project(ProjectError::OutOfWorkspace(_))));
}

#[test]
fn test_missing_file_in_known_directory() {
    let err = app_host()
        .load_program(&ws_path("app/gone.go"), Position::new(0, 0))
        .unwrap_err();
    assert!(matches!(err, LoadError::Source(_)));
}

// =============================================================================
// PUBLISHING
// =============================================================================

#[test]
fn test_diagnostics_grouped_per_file() {
    let source = workspace(&[
        ("app/a.go", "package app\nfunc A() { @@ }\nfunc A() {}\n"),
        ("app/b.go", "package app\nfunc B() { q.X() }\n"),
    ]);
    let (host, _) = script_host(source);
    let loaded = host
        .load_program(&ws_path("app/a.go"), Position::new(0, 0))
        .unwrap();

    let grouped = host.publishable_diagnostics(&loaded.analysis);
    let files: Vec<_> = grouped.keys().cloned().collect();
    assert_eq!(files, vec![ws_path("app/a.go"), ws_path("app/b.go")]);

    let a: Vec<&str> = grouped[0].iter().map(|d| d.message.as_ref()).collect();
    assert_eq!(a, vec!["unexpected @@", "A redeclared in this block"]);
    let b: Vec<&str> = grouped[1].iter().map(|d| d.message.as_ref()).collect();
    assert_eq!(b, vec!["undefined: q"]);
}

#[test]
fn test_diagnostics_disabled_publishes_nothing() {
    let source = workspace(&[("app/a.go", "package app\nfunc A() { @@ }\n")]);
    let (host, _) = script_host_with(config().with_diagnostics_disabled(true), source);
    let loaded = host
        .load_program(&ws_path("app/a.go"), Position::new(0, 0))
        .unwrap();

    assert_eq!(loaded.analysis.diagnostics().len(), 1);
    assert!(host.publishable_diagnostics(&loaded.analysis).is_empty());
}
