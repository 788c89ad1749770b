//! Asyncify core: job orchestration over the analysis pipeline.
//!
//! Ties the pipeline crates together behind three entry points:
//!
//! - [`run_analysis`]: project path → stored, flooded call graph
//! - [`run_sync_wrapper_analysis`]: project path → detected sync wrappers
//!   plus a graph flooded from them
//! - [`run_transformation`]: project path + stored graph → trivia-preserving
//!   file rewrites, optionally applied to disk
//!
//! Each job takes a cancellation flag and a progress callback; persistence
//! goes through the [`asyncify_graph::GraphStore`] contract.

pub mod config;
pub mod error;
pub mod jobs;
pub mod progress;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use jobs::{
    run_analysis, run_sync_wrapper_analysis, run_transformation, AnalysisOutcome,
    SyncWrapperAnalysisOutcome, TransformationOutcome,
};
pub use progress::{silent_progress, JobPhase, JobProgress, ProgressCallback};

// Re-export the pieces callers need to drive the jobs.
pub use asyncify_graph::{GraphId, GraphStats, GraphStore, InMemoryGraphStore, MethodId};
pub use asyncify_rewrite::FileRewrite;
