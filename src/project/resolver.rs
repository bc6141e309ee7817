//! Directory scanning and import resolution.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::{trace, warn};

use super::error::ProjectError;
use super::source::FileSource;
use super::unit::{CompilationUnit, base_unit_name, is_external_test_name};

/// Everything known about one directory after a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryScan {
    /// The directory's unit with every recognized file in it.
    pub unit: CompilationUnit,
    /// Declared unit name of each file, in directory order.
    pub file_units: IndexMap<String, SmolStr>,
}

impl DirectoryScan {
    /// Whether files in the directory declare more than one logical unit.
    ///
    /// A unit and its external-test variant count as one.
    pub fn is_multi_unit(&self) -> bool {
        let mut names = self.file_units.values().map(|n| base_unit_name(n));
        match names.next() {
            Some(first) => names.any(|n| n != first),
            None => false,
        }
    }

    /// Whether the unit must be narrowed before analyzing `file_name`.
    pub fn needs_narrowing(&self, file_name: &str) -> bool {
        self.is_multi_unit()
            || self
                .file_units
                .get(file_name)
                .is_some_and(|name| is_external_test_name(name))
    }

    pub fn declared_unit(&self, file_name: &str) -> Option<&SmolStr> {
        self.file_units.get(file_name)
    }

    /// The unit an importer of `import_path` gets from this directory.
    ///
    /// Only primary files count. The unit named like the last import path
    /// segment wins, then the first unit that is not `main`.
    pub fn import_unit_name(&self, import_path: &str) -> Option<&str> {
        let last_segment = import_path.rsplit('/').next().unwrap_or(import_path);
        let names: Vec<&str> = self
            .unit
            .primary_files
            .iter()
            .filter_map(|f| self.file_units.get(f))
            .map(|n| base_unit_name(n))
            .collect();
        names
            .iter()
            .find(|n| **n == last_segment)
            .or_else(|| names.iter().find(|n| **n != "main"))
            .or_else(|| names.first())
            .copied()
    }

    /// First primary file declaring the unit `name`.
    pub fn primary_file_of(&self, name: &str) -> Option<&str> {
        self.unit
            .primary_files
            .iter()
            .find(|f| {
                self.file_units
                    .get(f.as_str())
                    .is_some_and(|n| base_unit_name(n) == name)
            })
            .map(String::as_str)
    }
}

/// Maps directories and import paths to compilation units.
pub trait UnitResolver: Send + Sync {
    /// Scan the directory `dir`.
    fn resolve_dir(&self, dir: &Path) -> Result<DirectoryScan, ProjectError>;

    /// Scan the directory an import path refers to.
    fn resolve_import(&self, import_path: &str) -> Result<DirectoryScan, ProjectError>;
}

/// An extra location imports can resolve into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRoot {
    /// Import path prefix served by `dir`.
    pub import_prefix: String,
    pub dir: PathBuf,
}

impl ImportRoot {
    pub fn new(import_prefix: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            import_prefix: import_prefix.into(),
            dir: dir.into(),
        }
    }
}

/// How source files are recognized on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceLayout {
    /// Extension of source files, without the dot.
    pub extension: String,
    /// File stem suffix marking test files.
    pub test_suffix: String,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            extension: "go".to_string(),
            test_suffix: "_test".to_string(),
        }
    }
}

impl SourceLayout {
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }

    pub fn is_test_file(&self, path: &Path) -> bool {
        path.file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.ends_with(&self.test_suffix))
    }
}

/// Resolver that reads the leading `package <name>` clause of every source
/// file in a directory.
pub struct DirectoryResolver {
    source: Arc<dyn FileSource>,
    workspace_root: Option<PathBuf>,
    root_import_path: String,
    import_roots: Vec<ImportRoot>,
    layout: SourceLayout,
}

impl DirectoryResolver {
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        Self {
            source,
            workspace_root: None,
            root_import_path: String::new(),
            import_roots: Vec::new(),
            layout: SourceLayout::default(),
        }
    }

    /// Directories under `root` get import paths under `root_import_path`.
    pub fn with_workspace(mut self, root: impl Into<PathBuf>, root_import_path: impl Into<String>) -> Self {
        self.workspace_root = Some(root.into());
        self.root_import_path = root_import_path.into();
        self
    }

    pub fn with_import_roots(mut self, roots: impl IntoIterator<Item = ImportRoot>) -> Self {
        self.import_roots = roots.into_iter().collect();
        self
    }

    pub fn with_layout(mut self, layout: SourceLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Import path of a directory.
    ///
    /// Falls back to the directory path itself when no root covers it.
    pub fn import_path_for(&self, dir: &Path) -> SmolStr {
        if let Some(root) = &self.workspace_root {
            if let Ok(rel) = dir.strip_prefix(root) {
                return join_import_path(&self.root_import_path, rel);
            }
        }
        for root in &self.import_roots {
            if let Ok(rel) = dir.strip_prefix(&root.dir) {
                return join_import_path(&root.import_prefix, rel);
            }
        }
        SmolStr::new(slash_path(dir))
    }

    /// Directory an import path refers to, if any root serves it.
    pub fn dir_for_import(&self, import_path: &str) -> Option<PathBuf> {
        let workspace = self
            .workspace_root
            .as_ref()
            .map(|root| (self.root_import_path.as_str(), root.as_path()));
        let roots = self
            .import_roots
            .iter()
            .map(|root| (root.import_prefix.as_str(), root.dir.as_path()));

        workspace.into_iter().chain(roots).find_map(|(prefix, dir)| {
            let rest = strip_import_prefix(import_path, prefix)?;
            let candidate = rest
                .split('/')
                .filter(|segment| !segment.is_empty())
                .fold(dir.to_path_buf(), |path, segment| path.join(segment));
            self.source.is_dir(&candidate).then_some(candidate)
        })
    }

    fn scan(&self, dir: &Path, import_path: SmolStr) -> Result<DirectoryScan, ProjectError> {
        let paths = self.source.list_dir(dir)?;

        let mut primary = Vec::new();
        let mut tests = Vec::new();
        let mut external_tests = Vec::new();
        let mut file_units = IndexMap::new();

        for path in paths {
            if !self.layout.is_source_file(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let declared = match self.source.read(&path) {
                Ok(contents) => read_unit_clause(&contents),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let Some(declared) = declared else {
                warn!(file = %path.display(), "skipping file without a package clause");
                continue;
            };

            let file_name = file_name.to_string();
            if self.layout.is_test_file(&path) {
                if is_external_test_name(&declared) {
                    external_tests.push(file_name.clone());
                } else {
                    tests.push(file_name.clone());
                }
            } else {
                primary.push(file_name.clone());
            }
            file_units.insert(file_name, declared);
        }

        let name = primary
            .iter()
            .chain(&tests)
            .chain(&external_tests)
            .find_map(|f| file_units.get(f))
            .map(|n| SmolStr::new(base_unit_name(n)))
            .unwrap_or_else(|| {
                SmolStr::new(
                    dir.file_name()
                        .map(|n| n.to_string_lossy())
                        .unwrap_or_default(),
                )
            });

        trace!(
            dir = %dir.display(),
            unit = %name,
            files = file_units.len(),
            "scanned directory"
        );

        Ok(DirectoryScan {
            unit: CompilationUnit::new(import_path, dir, name)
                .with_primary_files(primary)
                .with_test_files(tests)
                .with_external_test_files(external_tests),
            file_units,
        })
    }
}

impl UnitResolver for DirectoryResolver {
    fn resolve_dir(&self, dir: &Path) -> Result<DirectoryScan, ProjectError> {
        self.scan(dir, self.import_path_for(dir))
    }

    fn resolve_import(&self, import_path: &str) -> Result<DirectoryScan, ProjectError> {
        let dir = self
            .dir_for_import(import_path)
            .ok_or_else(|| ProjectError::UnitNotFound(SmolStr::new(import_path)))?;
        self.scan(&dir, SmolStr::new(import_path))
    }
}

/// Name declared by the leading `package <name>` clause of a file.
///
/// Whitespace and comments before the clause are skipped.
pub fn read_unit_clause(text: &[u8]) -> Option<SmolStr> {
    let mut rest = text;
    loop {
        rest = rest.trim_ascii_start();
        if let Some(after) = rest.strip_prefix(b"//") {
            let end = after.iter().position(|b| *b == b'\n').unwrap_or(after.len());
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix(b"/*") {
            let end = after.windows(2).position(|w| w == b"*/")?;
            rest = &after[end + 2..];
        } else {
            break;
        }
    }

    let after = rest.strip_prefix(b"package")?;
    if !after.first().is_some_and(|b| b.is_ascii_whitespace()) {
        return None;
    }
    let after = after.trim_ascii_start();
    let len = after
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    if len == 0 {
        return None;
    }
    std::str::from_utf8(&after[..len]).ok().map(SmolStr::new)
}

fn strip_import_prefix<'a>(import_path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(import_path);
    }
    let rest = import_path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn join_import_path(prefix: &str, rel: &Path) -> SmolStr {
    let rel = slash_path(rel);
    match (prefix.is_empty(), rel.is_empty()) {
        (_, true) => SmolStr::new(prefix),
        (true, false) => SmolStr::new(rel),
        (false, false) => SmolStr::new(format!("{prefix}/{rel}")),
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
