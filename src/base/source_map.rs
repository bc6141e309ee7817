//! Multi-file position index.
//!
//! A [`SourceMap`] lays every registered file out on a single number line,
//! leaving a one-byte gap between files so that the end-of-file position of
//! one file never collides with the start of the next. A [`PositionHandle`]
//! is a point on that line tagged with the identity of the map that created
//! it.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use text_size::TextSize;
use thiserror::Error;

use super::{FileId, LineCol, LineIndex};

static NEXT_SOURCE_MAP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`SourceMap`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceMapId(u64);

/// Opaque location inside one specific source map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionHandle {
    map: SourceMapId,
    pos: u32,
}

impl PositionHandle {
    /// The source map this handle is valid against.
    pub fn source_map(&self) -> SourceMapId {
        self.map
    }
}

/// Errors mapping a file location into a source map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("file {} is not part of this source map", path.display())]
    UnknownFile { path: PathBuf },
    #[error("{0} is not part of this source map")]
    UnknownFileId(FileId),
    #[error("offset #{offset} is beyond the end of {} ({len} bytes)", path.display())]
    OffsetOutOfBounds { path: PathBuf, offset: u32, len: u32 },
}

/// A file registered in a source map.
#[derive(Debug, Clone)]
pub struct SourceFile {
    id: FileId,
    path: PathBuf,
    base: u32,
    line_index: LineIndex,
}

impl SourceFile {
    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> TextSize {
        self.line_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_index.is_empty()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    fn end(&self) -> u32 {
        self.base + u32::from(self.len())
    }
}

/// A handle resolved back to a concrete file location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPosition {
    pub file: FileId,
    pub offset: TextSize,
    pub line_col: LineCol,
}

/// Index over the byte ranges of every file loaded for one analysis.
#[derive(Debug)]
pub struct SourceMap {
    id: SourceMapId,
    files: Vec<SourceFile>,
    next_base: u32,
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceMap {
    pub fn new() -> Self {
        Self {
            id: SourceMapId(NEXT_SOURCE_MAP_ID.fetch_add(1, Ordering::Relaxed)),
            files: Vec::new(),
            // 0 is never a valid position
            next_base: 1,
        }
    }

    pub fn id(&self) -> SourceMapId {
        self.id
    }

    /// Register a file and its contents, returning its id.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, text: &[u8]) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        let line_index = LineIndex::new(text);
        let base = self.next_base;
        self.next_base = base
            .saturating_add(u32::from(line_index.len()))
            .saturating_add(1);
        self.files.push(SourceFile {
            id,
            path: path.into(),
            base,
            line_index,
        });
        id
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    /// Find a registered file by path.
    pub fn file_by_path(&self, path: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| paths_equal(&f.path, path))
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Handle for `offset` inside the file registered under `id`.
    pub fn handle(&self, id: FileId, offset: TextSize) -> Result<PositionHandle, LocationError> {
        let file = self.file(id).ok_or(LocationError::UnknownFileId(id))?;
        self.handle_in(file, offset)
    }

    /// Handle for `offset` inside the file registered under `path`.
    pub fn handle_for_offset(
        &self,
        path: &Path,
        offset: TextSize,
    ) -> Result<PositionHandle, LocationError> {
        let file = self
            .file_by_path(path)
            .ok_or_else(|| LocationError::UnknownFile {
                path: path.to_path_buf(),
            })?;
        self.handle_in(file, offset)
    }

    fn handle_in(&self, file: &SourceFile, offset: TextSize) -> Result<PositionHandle, LocationError> {
        let out_of_bounds = || LocationError::OffsetOutOfBounds {
            path: file.path.clone(),
            offset: offset.into(),
            len: file.len().into(),
        };
        if offset > file.len() {
            return Err(out_of_bounds());
        }
        // Bases saturate once a map holds more than u32::MAX bytes.
        let pos = file
            .base
            .checked_add(u32::from(offset))
            .ok_or_else(out_of_bounds)?;
        Ok(PositionHandle { map: self.id, pos })
    }

    /// Resolve a handle created by this map. Foreign handles yield `None`.
    pub fn resolve(&self, handle: PositionHandle) -> Option<ResolvedPosition> {
        if handle.map != self.id {
            return None;
        }
        let idx = self
            .files
            .partition_point(|f| f.base <= handle.pos)
            .checked_sub(1)?;
        let file = &self.files[idx];
        if handle.pos > file.end() {
            return None;
        }
        let offset = TextSize::new(handle.pos - file.base);
        Some(ResolvedPosition {
            file: file.id,
            offset,
            line_col: file.line_index.line_col(offset)?,
        })
    }

    /// Line/column of an offset inside a registered file.
    pub fn line_col(&self, id: FileId, offset: TextSize) -> Option<LineCol> {
        self.file(id)?.line_index.line_col(offset)
    }
}

/// Compare two file paths for identity.
///
/// Paths are compared component-wise, so redundant separators and `.`
/// segments do not matter. On Windows the comparison ignores case.
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    if cfg!(windows) {
        let lower = |c: Component<'_>| c.as_os_str().to_string_lossy().to_lowercase();
        a.components().map(lower).eq(b.components().map(lower))
    } else {
        a.components().eq(b.components())
    }
}
