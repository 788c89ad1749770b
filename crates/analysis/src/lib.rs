//! Call-graph extraction, sync-wrapper detection, and async flooding.
//!
//! The three analysis stages share one failure posture: anything the
//! lightweight binder cannot see is skipped and the graph is simply
//! sparser. Cancellation is checked at file boundaries during extraction
//! and at every queue iteration during flooding; a cancelled stage returns
//! [`AnalysisError::Cancelled`] and its partial output is discarded by the
//! caller.

mod extractor;
mod flooding;
mod sync_wrapper;

use thiserror::Error;

pub use extractor::{extract_graph, ExtractOptions, FileProgress};
pub use flooding::{flood, CallSite, Transformation};
pub use sync_wrapper::{detect_sync_wrappers, SyncWrapperPattern};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("operation cancelled")]
    Cancelled,
}
