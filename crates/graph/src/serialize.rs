//! Deterministic on-wire form of a call graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::CallGraph;
use crate::model::{BaseTypeTransformation, MethodCall, MethodId, MethodNode};

/// An edge in serialized form. Ids are assigned sequentially after sorting
/// by (caller, callee, file, line) so equal graphs serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEdge {
    pub id: u64,
    pub caller_id: MethodId,
    pub callee_id: MethodId,
    pub line: usize,
    pub file: String,
    pub requires_await: bool,
}

/// Snapshot of a finished graph. Methods are keyed by identity; sets are
/// arrays in identity-string order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub methods: BTreeMap<MethodId, MethodNode>,
    pub edges: Vec<SerializedEdge>,
    pub root_async_methods: Vec<MethodId>,
    pub sync_wrapper_methods: Vec<MethodId>,
    pub flooded_methods: Vec<MethodId>,
    #[serde(default)]
    pub base_type_transformations: BTreeMap<String, Vec<BaseTypeTransformation>>,
    #[serde(default)]
    pub interface_mappings: BTreeMap<String, String>,
}

impl SerializedGraph {
    pub fn from_graph(graph: &CallGraph) -> Self {
        let mut methods = BTreeMap::new();
        for id in graph.method_ids() {
            if let Some(node) = graph.node(&id) {
                methods.insert(id, node);
            }
        }

        let mut raw_edges = graph.edges_snapshot();
        raw_edges.sort_by(|a, b| {
            (&a.caller, &a.callee, &a.file, a.line).cmp(&(&b.caller, &b.callee, &b.file, b.line))
        });
        let edges = raw_edges
            .into_iter()
            .enumerate()
            .map(|(i, e)| SerializedEdge {
                id: i as u64,
                caller_id: e.caller,
                callee_id: e.callee,
                line: e.line,
                file: e.file,
                requires_await: e.requires_await,
            })
            .collect();

        Self {
            methods,
            edges,
            root_async_methods: graph.root_async_methods.iter().cloned().collect(),
            sync_wrapper_methods: graph.sync_wrapper_methods().into_iter().collect(),
            flooded_methods: graph.flooded_methods.iter().cloned().collect(),
            base_type_transformations: graph.base_type_transformations.clone(),
            interface_mappings: graph.interface_mappings.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn into_graph(self) -> CallGraph {
        let mut graph = CallGraph::new();
        for (_, node) in self.methods {
            graph.insert_node(node);
        }
        for edge in self.edges {
            graph.add_edge(MethodCall {
                caller: edge.caller_id,
                callee: edge.callee_id,
                file: edge.file,
                line: edge.line,
                requires_await: edge.requires_await,
            });
        }
        for id in &self.sync_wrapper_methods {
            graph.mark_sync_wrapper(id);
        }
        graph.root_async_methods = self.root_async_methods.into_iter().collect();
        graph.flooded_methods = self.flooded_methods.into_iter().collect();
        graph.base_type_transformations = self.base_type_transformations;
        graph.interface_mappings = self.interface_mappings;
        graph
    }
}
