//! Compilation units and their cache identity.

use std::fmt;
use std::path::PathBuf;

use smol_str::SmolStr;

/// Suffix that marks the external-test variant of a unit name.
pub const EXTERNAL_TEST_SUFFIX: &str = "_test";

/// Strip the external-test suffix from a unit name, if present.
pub fn base_unit_name(name: &str) -> &str {
    name.strip_suffix(EXTERNAL_TEST_SUFFIX).unwrap_or(name)
}

/// Whether a unit name denotes an external-test variant.
pub fn is_external_test_name(name: &str) -> bool {
    name.len() > EXTERNAL_TEST_SUFFIX.len() && name.ends_with(EXTERNAL_TEST_SUFFIX)
}

/// Identity of a cached analysis: (import path, directory, unit name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    pub import_path: SmolStr,
    pub dir: PathBuf,
    pub name: SmolStr,
}

impl fmt::Display for AnalysisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.import_path,
            self.name,
            self.dir.display()
        )
    }
}

/// A named, directory-scoped collection of source files analyzed together.
///
/// File lists hold names relative to `dir`, in directory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub import_path: SmolStr,
    pub dir: PathBuf,
    pub name: SmolStr,
    /// Ordinary source files.
    pub primary_files: Vec<String>,
    /// Test files declaring the unit's own name.
    pub test_files: Vec<String>,
    /// Test files declaring the external-test name.
    pub external_test_files: Vec<String>,
    /// Set when this unit is the external-test variant of its directory.
    pub is_test_variant: bool,
}

impl CompilationUnit {
    pub fn new(import_path: impl Into<SmolStr>, dir: impl Into<PathBuf>, name: impl Into<SmolStr>) -> Self {
        Self {
            import_path: import_path.into(),
            dir: dir.into(),
            name: name.into(),
            primary_files: Vec::new(),
            test_files: Vec::new(),
            external_test_files: Vec::new(),
            is_test_variant: false,
        }
    }

    pub fn with_primary_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.primary_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_test_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.test_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_external_test_files<S: Into<String>>(
        mut self,
        files: impl IntoIterator<Item = S>,
    ) -> Self {
        self.external_test_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(&self) -> AnalysisKey {
        AnalysisKey {
            import_path: self.import_path.clone(),
            dir: self.dir.clone(),
            name: self.name.clone(),
        }
    }

    /// Every file of the unit, whether or not it takes part in analysis.
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        self.primary_files
            .iter()
            .chain(&self.test_files)
            .chain(&self.external_test_files)
            .map(String::as_str)
    }

    pub fn contains_file(&self, file_name: &str) -> bool {
        self.all_files().any(|f| f == file_name)
    }

    pub fn is_external_test_file(&self, file_name: &str) -> bool {
        self.external_test_files.iter().any(|f| f == file_name)
    }

    /// Names of the files an analysis pass reads.
    ///
    /// External-test files only take part when the unit name itself is the
    /// external-test variant.
    pub fn analysis_file_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .primary_files
            .iter()
            .chain(&self.test_files)
            .map(String::as_str)
            .collect();
        if is_external_test_name(&self.name) {
            names.extend(self.external_test_files.iter().map(String::as_str));
        }
        names
    }

    /// Absolute paths of [`analysis_file_names`](Self::analysis_file_names).
    pub fn analysis_files(&self) -> Vec<PathBuf> {
        self.analysis_file_names()
            .into_iter()
            .map(|name| self.path_of(name))
            .collect()
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}
