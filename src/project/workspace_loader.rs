use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::error::ProjectError;
use super::narrow::narrow_to_file;
use super::resolver::UnitResolver;
use super::source::FileSource;
use super::unit::CompilationUnit;

/// Resolves the compilation unit that owns a workspace file.
pub struct WorkspaceLoader {
    source: Arc<dyn FileSource>,
    resolver: Arc<dyn UnitResolver>,
    root: Option<PathBuf>,
}

impl WorkspaceLoader {
    pub fn new(source: Arc<dyn FileSource>, resolver: Arc<dyn UnitResolver>) -> Self {
        Self {
            source,
            resolver,
            root: None,
        }
    }

    /// Restrict loading to paths under `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn resolver(&self) -> &Arc<dyn UnitResolver> {
        &self.resolver
    }

    /// Check that `path` lies inside the workspace.
    ///
    /// Paths with `..` components are rejected, the check is lexical.
    pub fn check_in_workspace(&self, path: &Path) -> Result<(), ProjectError> {
        let inside = path.is_absolute()
            && !path.components().any(|c| matches!(c, Component::ParentDir))
            && self
                .root
                .as_ref()
                .is_none_or(|root| path.starts_with(root));
        if inside {
            Ok(())
        } else {
            Err(ProjectError::OutOfWorkspace(path.to_path_buf()))
        }
    }

    /// The unit containing `path`, which may be a file or a directory.
    ///
    /// When the file's directory declares several units the result is
    /// narrowed to the one the file belongs to. A directory declaring
    /// several units names none of them and is rejected.
    pub fn load_unit(&self, path: &Path) -> Result<CompilationUnit, ProjectError> {
        self.check_in_workspace(path)?;

        let is_dir = self.source.is_dir(path);
        let dir = if is_dir {
            path
        } else {
            path.parent()
                .ok_or_else(|| ProjectError::OutOfWorkspace(path.to_path_buf()))?
        };

        let scan = self.resolver.resolve_dir(dir)?;
        if is_dir {
            if scan.is_multi_unit() {
                let file = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                return Err(ProjectError::AmbiguousFileNotFound {
                    import_path: scan.unit.import_path.clone(),
                    dir: dir.to_path_buf(),
                    file,
                });
            }
            return Ok(scan.unit);
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ProjectError::OutOfWorkspace(path.to_path_buf()))?;

        if scan.needs_narrowing(file_name) {
            return narrow_to_file(&scan, file_name);
        }

        debug!(
            file = %path.display(),
            unit = %scan.unit.name,
            import_path = %scan.unit.import_path,
            "resolved unit"
        );
        Ok(scan.unit)
    }
}
