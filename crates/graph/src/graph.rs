//! The shared call-graph container.

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::{BaseTypeTransformation, MethodCall, MethodId, MethodNode};

/// Directed multigraph of methods and invocations, plus the decision state
/// filled in by flooding.
///
/// Node insertion and edge appends are thread-safe so extraction can run
/// file-parallel; identity collisions resolve to last-writer-wins, which is
/// benign because extraction is deterministic per identity. The decision
/// sets and maps are only touched through `&mut` during the single
/// authorized flooding phase.
#[derive(Default, Debug)]
pub struct CallGraph {
    nodes: DashMap<MethodId, MethodNode>,
    edges: Mutex<Vec<MethodCall>>,
    sync_wrapper_methods: Mutex<BTreeSet<MethodId>>,
    pub root_async_methods: BTreeSet<MethodId>,
    pub flooded_methods: BTreeSet<MethodId>,
    /// Containing type display → base-list rewrites recorded by flooding.
    pub base_type_transformations: BTreeMap<String, Vec<BaseTypeTransformation>>,
    /// Sync interface display → async interface display, user-supplied.
    pub interface_mappings: BTreeMap<String, String>,
}

/// Aggregate counts reported at job completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub methods: usize,
    pub external_methods: usize,
    pub edges: usize,
    pub roots: usize,
    pub sync_wrappers: usize,
    pub flooded: usize,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node (last writer wins).
    pub fn insert_node(&self, node: MethodNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert an external stub unless the identity is already declared.
    pub fn ensure_callee(&self, id: &MethodId) {
        self.nodes
            .entry(id.clone())
            .or_insert_with(|| MethodNode::external(id.clone()));
    }

    pub fn add_edge(&self, call: MethodCall) {
        self.edges.lock().push(call);
    }

    pub fn contains(&self, id: &MethodId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &MethodId) -> Option<MethodNode> {
        self.nodes.get(id).map(|n| n.clone())
    }

    /// Apply a mutation to a node, if present.
    pub fn with_node_mut(&self, id: &MethodId, f: impl FnOnce(&mut MethodNode)) -> bool {
        match self.nodes.get_mut(id) {
            Some(mut node) => {
                f(&mut node);
                true
            }
            None => false,
        }
    }

    /// Flag a method as a sync wrapper on both the node and the set.
    pub fn mark_sync_wrapper(&self, id: &MethodId) {
        self.with_node_mut(id, |n| n.is_sync_wrapper = true);
        self.sync_wrapper_methods.lock().insert(id.clone());
    }

    pub fn sync_wrapper_methods(&self) -> BTreeSet<MethodId> {
        self.sync_wrapper_methods.lock().clone()
    }

    pub fn is_sync_wrapper(&self, id: &MethodId) -> bool {
        self.sync_wrapper_methods.lock().contains(id)
    }

    /// Identities in deterministic (string) order.
    pub fn method_ids(&self) -> Vec<MethodId> {
        let mut ids: Vec<MethodId> = self.nodes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn method_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.lock().len()
    }

    pub fn edges_snapshot(&self) -> Vec<MethodCall> {
        self.edges.lock().clone()
    }

    /// Distinct direct callers of a method, in first-seen edge order.
    pub fn callers_of(&self, id: &MethodId) -> Vec<MethodId> {
        let mut out = Vec::new();
        for edge in self.edges.lock().iter() {
            if &edge.callee == id && !out.contains(&edge.caller) {
                out.push(edge.caller.clone());
            }
        }
        out
    }

    /// Distinct direct callees of a method, in first-seen edge order.
    pub fn callees_of(&self, id: &MethodId) -> Vec<MethodId> {
        let mut out = Vec::new();
        for edge in self.edges.lock().iter() {
            if &edge.caller == id && !out.contains(&edge.callee) {
                out.push(edge.callee.clone());
            }
        }
        out
    }

    /// Outgoing edges of a method (clones, in insertion order).
    pub fn edges_from(&self, id: &MethodId) -> Vec<MethodCall> {
        self.edges
            .lock()
            .iter()
            .filter(|e| &e.caller == id)
            .cloned()
            .collect()
    }

    /// Mutate every edge; used by flooding to settle `requires_await`.
    pub fn for_each_edge_mut(&mut self, mut f: impl FnMut(&mut MethodCall)) {
        for edge in self.edges.get_mut().iter_mut() {
            f(edge);
        }
    }

    pub fn stats(&self) -> GraphStats {
        let external = self.nodes.iter().filter(|e| e.value().is_external()).count();
        GraphStats {
            methods: self.nodes.len(),
            external_methods: external,
            edges: self.edge_count(),
            roots: self.root_async_methods.len(),
            sync_wrappers: self.sync_wrapper_methods.lock().len(),
            flooded: self.flooded_methods.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EXTERNAL_FILE;

    fn node(id: &str) -> MethodNode {
        let mut n = MethodNode::external(MethodId::new(id));
        n.file_path = "a.cs".to_string();
        n
    }

    fn edge(caller: &str, callee: &str) -> MethodCall {
        MethodCall {
            caller: MethodId::new(caller),
            callee: MethodId::new(callee),
            file: "a.cs".to_string(),
            line: 1,
            requires_await: false,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let g = CallGraph::new();
        g.insert_node(node("C.A()"));
        assert!(g.contains(&MethodId::new("C.A()")));
        assert_eq!(g.method_count(), 1);
    }

    #[test]
    fn test_ensure_callee_inserts_external_stub() {
        let g = CallGraph::new();
        g.ensure_callee(&MethodId::new("Console.WriteLine(string)"));
        let n = g.node(&MethodId::new("Console.WriteLine(string)")).unwrap();
        assert_eq!(n.file_path, EXTERNAL_FILE);
    }

    #[test]
    fn test_ensure_callee_does_not_replace_declared_node() {
        let g = CallGraph::new();
        g.insert_node(node("C.A()"));
        g.ensure_callee(&MethodId::new("C.A()"));
        assert_eq!(g.node(&MethodId::new("C.A()")).unwrap().file_path, "a.cs");
    }

    #[test]
    fn test_callers_of_deduplicates() {
        let g = CallGraph::new();
        g.add_edge(edge("C.A()", "C.B()"));
        g.add_edge(edge("C.A()", "C.B()"));
        g.add_edge(edge("C.C()", "C.B()"));
        assert_eq!(
            g.callers_of(&MethodId::new("C.B()")),
            vec![MethodId::new("C.A()"), MethodId::new("C.C()")]
        );
    }

    #[test]
    fn test_mark_sync_wrapper_sets_flag_and_set() {
        let g = CallGraph::new();
        g.insert_node(node("C.RunSync(Func<Task>)"));
        g.mark_sync_wrapper(&MethodId::new("C.RunSync(Func<Task>)"));
        assert!(g.is_sync_wrapper(&MethodId::new("C.RunSync(Func<Task>)")));
        assert!(g.node(&MethodId::new("C.RunSync(Func<Task>)")).unwrap().is_sync_wrapper);
    }

    #[test]
    fn test_stats() {
        let mut g = CallGraph::new();
        g.insert_node(node("C.A()"));
        g.ensure_callee(&MethodId::new("Ext.F()"));
        g.add_edge(edge("C.A()", "Ext.F()"));
        g.flooded_methods.insert(MethodId::new("C.A()"));
        g.root_async_methods.insert(MethodId::new("Ext.F()"));
        let stats = g.stats();
        assert_eq!(stats.methods, 2);
        assert_eq!(stats.external_methods, 1);
        assert_eq!(stats.edges, 1);
        assert_eq!(stats.roots, 1);
        assert_eq!(stats.flooded, 1);
    }

    #[test]
    fn test_for_each_edge_mut() {
        let mut g = CallGraph::new();
        g.add_edge(edge("C.A()", "C.B()"));
        g.for_each_edge_mut(|e| e.requires_await = true);
        assert!(g.edges_snapshot()[0].requires_await);
    }
}
