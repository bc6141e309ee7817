mod error;
pub mod narrow;
pub mod resolver;
pub mod source;
pub mod unit;
pub mod workspace_loader;

pub use error::ProjectError;
pub use narrow::narrow_to_file;
pub use resolver::{
    DirectoryResolver, DirectoryScan, ImportRoot, SourceLayout, UnitResolver, read_unit_clause,
};
pub use source::{DiskSource, FileSource, MemorySource, SourceError};
pub use unit::{
    AnalysisKey, CompilationUnit, EXTERNAL_TEST_SUFFIX, base_unit_name, is_external_test_name,
};
pub use workspace_loader::WorkspaceLoader;
