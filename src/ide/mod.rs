//! IDE layer: The request-facing API.
//!
//! Feature handlers (hover, definition, references) live outside this crate.
//! They call into [`AnalysisHost`] with a file path and a client position and
//! get back a [`LoadedProgram`]: the shared analysis of the owning unit plus
//! a handle for the requested position.

mod analysis;
mod error;

pub use analysis::{AnalysisHost, LoadedProgram};
pub use error::LoadError;
