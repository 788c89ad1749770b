//! Call-graph data model, serialization, and the persistence contract.
//!
//! The graph is writer-shared during extraction (concurrent node map plus an
//! append-only edge bag), mutated once by the flooding engine through `&mut`,
//! and read-only afterwards. Persistence snapshots a finished graph into a
//! deterministic serialized form; reloading yields an equivalent graph.

mod graph;
mod model;
mod serialize;
mod store;

pub use graph::{CallGraph, GraphStats};
pub use model::{
    is_task_shaped, wrap_return_type, BaseTypeTransformation, MethodCall, MethodId, MethodNode,
    Param, EXTERNAL_FILE,
};
pub use serialize::{SerializedEdge, SerializedGraph};
pub use store::{GraphId, GraphStore, InMemoryGraphStore, StoreError, StoreProgress};
