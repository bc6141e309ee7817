//! Analysis configuration.
//!
//! Clients send these settings as part of their initialization options.
//! Every field is optional:
//!
//! ```json
//! {
//!   "rootImportPath": "example.com/ws",
//!   "workspaceRoot": "/home/me/ws",
//!   "diagnosticsDisabled": false,
//!   "maxParallelism": 4,
//!   "failurePolicy": "retry",
//!   "importRoots": [{ "importPrefix": "", "dir": "/usr/lib/go/src" }],
//!   "layout": { "extension": "go", "testSuffix": "_test" }
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hir::FailurePolicy;
use crate::project::{ImportRoot, SourceLayout};

/// Settings for an [`AnalysisHost`](crate::ide::AnalysisHost).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Import path of the workspace root directory.
    pub root_import_path: String,

    /// Only files under this directory are loaded. `None` accepts any
    /// absolute path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Suppress publishing of diagnostics.
    pub diagnostics_disabled: bool,

    /// Threads used to parse one unit. `None` or `0` shares the global pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallelism: Option<usize>,

    /// What the analysis cache does with failed computations.
    pub failure_policy: FailurePolicy,

    /// Extra locations that imports resolve into, tried in order after the
    /// workspace.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub import_roots: Vec<ImportRoot>,

    pub layout: SourceLayout,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the client's initialization options. `null` yields the defaults.
    pub fn from_initialization_options(
        options: &serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        if options.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(options)
    }

    pub fn with_workspace(
        mut self,
        root: impl Into<PathBuf>,
        root_import_path: impl Into<String>,
    ) -> Self {
        self.workspace_root = Some(root.into());
        self.root_import_path = root_import_path.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_import_root(mut self, root: ImportRoot) -> Self {
        self.import_roots.push(root);
        self
    }

    pub fn with_max_parallelism(mut self, threads: usize) -> Self {
        self.max_parallelism = Some(threads);
        self
    }

    pub fn with_diagnostics_disabled(mut self, disabled: bool) -> Self {
        self.diagnostics_disabled = disabled;
        self
    }

    /// Dedicated parse thread count, if one was configured.
    pub fn parse_threads(&self) -> Option<usize> {
        self.max_parallelism.filter(|n| *n > 0)
    }
}
