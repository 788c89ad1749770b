//! Job configuration.
//!
//! Loadable from TOML; every field except the project path has a default so
//! minimal configs stay minimal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Root directory of the C# project to analyze.
    pub project_path: PathBuf,

    /// Display name used when storing graphs; defaults to the directory
    /// name of `project_path`.
    #[serde(default)]
    pub project_name: Option<String>,

    /// Identities of the leaf operations that should become asynchronous,
    /// in `Type.Method(params)` form.
    #[serde(default)]
    pub root_methods: Vec<String>,

    /// Sync-wrapper identities declared outside the analyzed project.
    #[serde(default)]
    pub external_sync_wrappers: Vec<String>,

    /// Sync interface display → pre-existing async interface. Implementing
    /// classes are re-pointed at the async interface instead of changing
    /// the sync one.
    #[serde(default)]
    pub interface_mappings: BTreeMap<String, String>,

    /// Glob patterns excluded from source discovery (e.g. `obj/**`).
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Snapshot each method's source text onto its graph node.
    #[serde(default)]
    pub capture_source: bool,
}

fn default_true() -> bool {
    true
}

impl AnalysisConfig {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            project_name: None,
            root_methods: Vec::new(),
            external_sync_wrappers: Vec::new(),
            interface_mappings: BTreeMap::new(),
            exclude: Vec::new(),
            respect_gitignore: true,
            capture_source: false,
        }
    }

    pub fn project_name(&self) -> String {
        self.project_name.clone().unwrap_or_else(|| {
            self.project_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }
}
