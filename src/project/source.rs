//! File contents capability.
//!
//! The core never touches the file system directly; everything goes through
//! a [`FileSource`] so that editor buffers can shadow files on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Errors reading files or directories.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: Arc<std::io::Error>,
    },
}

impl SourceError {
    /// The cause, without the path.
    pub fn reason(&self) -> String {
        match self {
            Self::NotFound(_) => "file not found".to_string(),
            Self::Io { source, .. } => source.to_string(),
        }
    }

    fn io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(err),
            }
        }
    }
}

/// Read access to workspace files.
pub trait FileSource: Send + Sync {
    /// Raw contents of a file.
    fn read(&self, path: &Path) -> Result<Arc<[u8]>, SourceError>;

    /// Files (not subdirectories) directly inside `dir`, sorted by path.
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError>;

    fn is_dir(&self, path: &Path) -> bool;
}

/// Reads straight from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSource;

impl FileSource for DiskSource {
    fn read(&self, path: &Path) -> Result<Arc<[u8]>, SourceError> {
        std::fs::read(path)
            .map(Arc::from)
            .map_err(|e| SourceError::io(path, e))
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let entries = std::fs::read_dir(dir).map_err(|e| SourceError::io(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::io(dir, e))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// In-memory file tree, used for unsaved editor buffers and tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<BTreeMap<PathBuf, Arc<[u8]>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from `(path, contents)` pairs.
    pub fn from_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<PathBuf>,
        C: AsRef<[u8]>,
    {
        let source = Self::new();
        for (path, contents) in files {
            source.insert(path, contents);
        }
        source
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) {
        self.files
            .write()
            .insert(path.into(), Arc::from(contents.as_ref()));
    }

    /// Remove a file, returning whether it existed.
    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl FileSource for MemorySource {
    fn read(&self, path: &Path) -> Result<Arc<[u8]>, SourceError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let files = self.files.read();
        let listed: Vec<PathBuf> = files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect();
        if listed.is_empty() && !self.is_dir(dir) {
            return Err(SourceError::NotFound(dir.to_path_buf()));
        }
        Ok(listed)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}
