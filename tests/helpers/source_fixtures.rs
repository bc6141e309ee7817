//! Common workspace fixtures for tests.
//!
//! Every fixture lives under [`ROOT`] with import path [`ROOT_IMPORT`].

use std::path::PathBuf;
use std::sync::Arc;

use semcache::project::MemorySource;

pub const ROOT: &str = "/ws";
pub const ROOT_IMPORT: &str = "example.com/ws";

// Single unit
pub const APP_MAIN: &str = "package app\n\nimport \"example.com/ws/util\"\n\nfunc Main() { util.Help() }\n";
pub const APP_EXTRA: &str = "package app\n\nvar Extra = 1\n";
pub const UTIL: &str = "package util\n\nfunc Help() {}\nfunc hidden() {}\n";

// A unit with in-unit and external tests
pub const PKG: &str = "package pkg\n\nfunc Pkg() {}\n";
pub const PKG_INTERNAL_TEST: &str = "package pkg\n\nfunc TestPkg() {}\n";
pub const PKG_EXTERNAL_TEST: &str =
    "package pkg_test\n\nimport \"example.com/ws/mixed\"\n\nfunc TestExternal() { pkg.Pkg() }\n";

/// Absolute path of a workspace-relative file.
pub fn ws_path(rel: &str) -> PathBuf {
    PathBuf::from(ROOT).join(rel)
}

/// An in-memory workspace holding `files` (workspace-relative paths).
pub fn workspace(files: &[(&str, &str)]) -> Arc<MemorySource> {
    Arc::new(MemorySource::from_files(
        files.iter().map(|(rel, contents)| (ws_path(rel), *contents)),
    ))
}

/// `app` importing `util`.
pub fn app_workspace() -> Arc<MemorySource> {
    workspace(&[
        ("app/main.go", APP_MAIN),
        ("app/extra.go", APP_EXTRA),
        ("util/util.go", UTIL),
    ])
}

/// A `mixed` directory holding `pkg`, its in-unit test and a `pkg_test`
/// external test.
pub fn mixed_test_workspace() -> Arc<MemorySource> {
    workspace(&[
        ("mixed/pkg.go", PKG),
        ("mixed/pkg_internal_test.go", PKG_INTERNAL_TEST),
        ("mixed/pkg_external_test.go", PKG_EXTERNAL_TEST),
    ])
}
