//! Persistence contract and the in-memory backend.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::graph::CallGraph;
use crate::model::MethodId;
use crate::serialize::SerializedGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(Uuid);

impl GraphId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for GraphId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph {0} not found")]
    NotFound(GraphId),

    #[error("no stored graph for project {0}")]
    ProjectNotFound(String),

    #[error("method {0} not present in graph")]
    MissingMethod(MethodId),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Progress callback for long store operations: `(phase, done, total)`.
pub type StoreProgress<'a> = &'a (dyn Fn(&str, usize, usize) + Send + Sync);

/// Contract every call-graph backend implements. The in-memory backend
/// below is the only one shipped here; network-backed stores satisfy the
/// same trait.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Snapshot a finished graph under a project name.
    async fn store(
        &self,
        project: &str,
        graph: &CallGraph,
        progress: StoreProgress<'_>,
    ) -> Result<GraphId, StoreError>;

    async fn fetch(&self, id: GraphId) -> Result<CallGraph, StoreError>;

    /// Most recently stored graph for a project name.
    async fn fetch_by_project(&self, project: &str) -> Result<CallGraph, StoreError>;

    async fn delete(&self, id: GraphId) -> Result<(), StoreError>;

    /// Transitive callers of a method, breadth-first, optionally depth-capped.
    async fn find_callers(
        &self,
        id: GraphId,
        method: &MethodId,
        max_depth: Option<usize>,
    ) -> Result<Vec<MethodId>, StoreError>;

    /// Transitive callees of a method, breadth-first, optionally depth-capped.
    async fn find_callees(
        &self,
        id: GraphId,
        method: &MethodId,
        max_depth: Option<usize>,
    ) -> Result<Vec<MethodId>, StoreError>;
}

struct StoredGraph {
    project: String,
    sequence: u64,
    graph: SerializedGraph,
}

/// Commodity dictionary-backed store.
#[derive(Default)]
pub struct InMemoryGraphStore {
    graphs: RwLock<HashMap<GraphId, StoredGraph>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn serialized(&self, id: GraphId) -> Result<SerializedGraph, StoreError> {
        let graphs = self.graphs.read().await;
        graphs
            .get(&id)
            .map(|s| s.graph.clone())
            .ok_or(StoreError::NotFound(id))
    }
}

/// Breadth-first traversal over serialized edges in one direction.
fn traverse(
    graph: &SerializedGraph,
    start: &MethodId,
    max_depth: Option<usize>,
    callers: bool,
) -> Result<Vec<MethodId>, StoreError> {
    if !graph.methods.contains_key(start) {
        return Err(StoreError::MissingMethod(start.clone()));
    }
    let mut out: Vec<MethodId> = Vec::new();
    let mut visited = vec![start.clone()];
    let mut queue: VecDeque<(MethodId, usize)> = VecDeque::new();
    queue.push_back((start.clone(), 0));
    while let Some((current, depth)) = queue.pop_front() {
        if max_depth.is_some_and(|cap| depth >= cap) {
            continue;
        }
        for edge in &graph.edges {
            let (from, to) = if callers {
                (&edge.callee_id, &edge.caller_id)
            } else {
                (&edge.caller_id, &edge.callee_id)
            };
            if from == &current && !visited.contains(to) {
                visited.push(to.clone());
                out.push(to.clone());
                queue.push_back((to.clone(), depth + 1));
            }
        }
    }
    out.sort();
    Ok(out)
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn store(
        &self,
        project: &str,
        graph: &CallGraph,
        progress: StoreProgress<'_>,
    ) -> Result<GraphId, StoreError> {
        let serialized = SerializedGraph::from_graph(graph);
        let total = serialized.methods.len();
        progress("methods", total, total);
        progress("edges", serialized.edges.len(), serialized.edges.len());
        progress("sets", 3, 3);

        let id = GraphId::random();
        let mut graphs = self.graphs.write().await;
        let sequence = graphs.values().map(|s| s.sequence).max().unwrap_or(0) + 1;
        tracing::debug!(%id, project, methods = total, "stored call graph");
        graphs.insert(
            id,
            StoredGraph {
                project: project.to_string(),
                sequence,
                graph: serialized,
            },
        );
        Ok(id)
    }

    async fn fetch(&self, id: GraphId) -> Result<CallGraph, StoreError> {
        Ok(self.serialized(id).await?.into_graph())
    }

    async fn fetch_by_project(&self, project: &str) -> Result<CallGraph, StoreError> {
        let graphs = self.graphs.read().await;
        graphs
            .values()
            .filter(|s| s.project == project)
            .max_by_key(|s| s.sequence)
            .map(|s| s.graph.clone().into_graph())
            .ok_or_else(|| StoreError::ProjectNotFound(project.to_string()))
    }

    async fn delete(&self, id: GraphId) -> Result<(), StoreError> {
        let mut graphs = self.graphs.write().await;
        graphs.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    async fn find_callers(
        &self,
        id: GraphId,
        method: &MethodId,
        max_depth: Option<usize>,
    ) -> Result<Vec<MethodId>, StoreError> {
        traverse(&self.serialized(id).await?, method, max_depth, true)
    }

    async fn find_callees(
        &self,
        id: GraphId,
        method: &MethodId,
        max_depth: Option<usize>,
    ) -> Result<Vec<MethodId>, StoreError> {
        traverse(&self.serialized(id).await?, method, max_depth, false)
    }
}
