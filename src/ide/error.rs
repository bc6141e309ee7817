use std::path::PathBuf;

use thiserror::Error;

use crate::base::{LocationError, PositionFault};
use crate::hir::{AnalysisError, CacheError};
use crate::project::{ProjectError, SourceError};

/// Why a program could not be loaded for a request.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("invalid position: {}:{line}:{column} ({fault})", path.display())]
    InvalidPosition {
        path: PathBuf,
        line: u32,
        column: u32,
        fault: PositionFault,
    },

    #[error("invalid location: {}:#{offset}", path.display())]
    InvalidLocation {
        path: PathBuf,
        offset: u32,
        #[source]
        source: LocationError,
    },

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Analysis(CacheError<AnalysisError>),

    #[error("request cancelled")]
    Cancelled,
}

impl From<CacheError<AnalysisError>> for LoadError {
    fn from(err: CacheError<AnalysisError>) -> Self {
        match err {
            CacheError::Cancelled => Self::Cancelled,
            other => Self::Analysis(other),
        }
    }
}
