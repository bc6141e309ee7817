use std::path::PathBuf;

use smol_str::SmolStr;
use thiserror::Error;

use super::source::SourceError;

/// Errors resolving the compilation unit that owns a file.
#[derive(Debug, Clone, Error)]
pub enum ProjectError {
    #[error("file {} is outside of the workspace", .0.display())]
    OutOfWorkspace(PathBuf),

    #[error("{import_path} in {}: file {file} declares none of the units in that directory", dir.display())]
    AmbiguousFileNotFound {
        import_path: SmolStr,
        dir: PathBuf,
        file: String,
    },

    #[error("cannot find unit {0}")]
    UnitNotFound(SmolStr),

    #[error(transparent)]
    Source(#[from] SourceError),
}
