//! Foundation types for semcache.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FileId`] - Dense identifiers for files registered in a source map
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Position`], [`Span`] - Zero-based line/column locations as sent by clients
//! - [`SourceMap`], [`PositionHandle`] - Multi-file position index
//!
//! This module has NO dependencies on other semcache modules.

mod file_id;
mod line_index;
mod position;
mod source_map;

pub use file_id::FileId;
pub use line_index::{LineCol, LineIndex, PositionFault, offset_for_position};
pub use position::{Position, Span};
pub use source_map::{
    LocationError, ResolvedPosition, SourceFile, SourceMap, SourceMapId, PositionHandle,
    paths_equal,
};

// Re-export text-size types for convenience
pub use text_size;
pub use text_size::{TextRange, TextSize};
