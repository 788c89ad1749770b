//! Job progress reporting.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Discovering,
    Parsing,
    Extracting,
    DetectingWrappers,
    Flooding,
    Rewriting,
    Storing,
    Writing,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobPhase::Discovering => "discovering",
            JobPhase::Parsing => "parsing",
            JobPhase::Extracting => "extracting",
            JobPhase::DetectingWrappers => "detecting-wrappers",
            JobPhase::Flooding => "flooding",
            JobPhase::Rewriting => "rewriting",
            JobPhase::Storing => "storing",
            JobPhase::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// One progress snapshot, delivered to the owning job's callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobProgress {
    pub phase: JobPhase,
    pub current_file: Option<PathBuf>,
    pub processed_count: usize,
    pub total_count: usize,
    pub method_count: usize,
    pub methods_processed: usize,
    pub flooded_count: usize,
    pub sync_wrapper_count: usize,
}

impl JobProgress {
    pub fn phase(phase: JobPhase) -> Self {
        Self {
            phase,
            current_file: None,
            processed_count: 0,
            total_count: 0,
            method_count: 0,
            methods_processed: 0,
            flooded_count: 0,
            sync_wrapper_count: 0,
        }
    }
}

/// Shared progress callback; jobs invoke it from worker threads.
pub type ProgressCallback = Arc<dyn Fn(&JobProgress) + Send + Sync>;

/// A callback that discards every report.
pub fn silent_progress() -> ProgressCallback {
    Arc::new(|_| {})
}
