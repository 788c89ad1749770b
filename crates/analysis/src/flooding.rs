//! Async flooding: reverse breadth-first propagation from the root methods.
//!
//! Every method reachable backwards from a root must present an async
//! signature. Interface members behave as shadow identities of their
//! implementations: flooding one side pulls in the other, so polymorphic
//! dispatch keeps compiling. Two escapes limit the blast radius:
//!
//! * an interface member whose declared return type is a type parameter of
//!   the interface is never touched; the async-reaching implementation's
//!   class instead gets a base-list transformation (`Mapper<A, B>` →
//!   `Mapper<A, Task<B>>`), and sibling implementations stay sync;
//! * a user-supplied sync→async interface mapping suppresses flooding of
//!   the sync interface; implementing classes are re-pointed at the async
//!   interface by the rewriter, and their members still flood.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use asyncify_graph::{wrap_return_type, BaseTypeTransformation, CallGraph, MethodId};

use crate::AnalysisError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub file: String,
    pub line: usize,
}

/// Projection of one flooding decision, consumed by reporting and by the
/// transformation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub method: MethodId,
    pub original_return_type: String,
    pub async_return_type: String,
    /// Outgoing call sites that will be awaited.
    pub awaited_call_sites: Vec<CallSite>,
}

/// Flood the graph from `roots`, mutating decision flags in place, and
/// return one [`Transformation`] per flooded method.
pub fn flood(
    graph: &mut CallGraph,
    roots: &[MethodId],
    cancel: &AtomicBool,
    mut on_visited: impl FnMut(usize, usize),
) -> Result<Vec<Transformation>, AnalysisError> {
    // Reverse indexes built once: interface member → implementations, and
    // callee → distinct callers (the BFS would otherwise rescan the edge
    // bag for every dequeued method).
    let mut implementations: HashMap<MethodId, Vec<MethodId>> = HashMap::new();
    for id in graph.method_ids() {
        let Some(node) = graph.node(&id) else { continue };
        for iface in &node.implements_interface_methods {
            implementations.entry(iface.clone()).or_default().push(id.clone());
        }
    }
    let mut callers_of: HashMap<MethodId, Vec<MethodId>> = HashMap::new();
    for edge in graph.edges_snapshot() {
        let entry = callers_of.entry(edge.callee).or_default();
        if !entry.contains(&edge.caller) {
            entry.push(edge.caller);
        }
    }

    let mut queue: VecDeque<MethodId> = VecDeque::new();
    let mut visited: HashSet<MethodId> = HashSet::new();

    for root in roots {
        graph.root_async_methods.insert(root.clone());
        queue.push_back(root.clone());
    }

    while let Some(current) = queue.pop_front() {
        if cancel.load(Ordering::Relaxed) {
            return Err(AnalysisError::Cancelled);
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(node) = graph.node(&current) else {
            tracing::debug!(method = %current, "flooding skipped unknown identity");
            continue;
        };

        if !node.is_async_declared {
            let wrapped = wrap_return_type(&node.return_type);
            graph.with_node_mut(&current, |n| {
                n.requires_async = true;
                n.async_return_type = Some(wrapped.clone());
            });
            graph.flooded_methods.insert(current.clone());
        }
        on_visited(visited.len(), graph.flooded_methods.len());

        // Direct callers always follow.
        for caller in callers_of.get(&current).into_iter().flatten() {
            queue.push_back(caller.clone());
        }

        // Shadow identities: the interface members this method implements.
        for iface in &node.implements_interface_methods {
            let Some(iface_node) = graph.node(iface) else { continue };
            if graph
                .interface_mappings
                .contains_key(&iface_node.containing_type)
            {
                // Mapped interface: leave the declaration untouched, but
                // every implementation must still change to satisfy the
                // async replacement.
                for implementation in implementations.get(iface).into_iter().flatten() {
                    queue.push_back(implementation.clone());
                }
            } else if iface_node.is_return_type_a_type_parameter {
                // Generic covariant return: wrap the class's base-list
                // argument instead of the interface signature.
                let entry = BaseTypeTransformation {
                    interface_display: iface_node.containing_type.clone(),
                    type_parameter: iface_node.return_type.clone(),
                };
                let entries = graph
                    .base_type_transformations
                    .entry(node.containing_type.clone())
                    .or_default();
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            } else {
                queue.push_back(iface.clone());
            }
        }

        // Signature parity: a flooded interface member drags every
        // implementation along, plus the implementations' callers through
        // the regular caller rule once they are dequeued.
        if node.is_interface_member {
            for implementation in implementations.get(&current).into_iter().flatten() {
                queue.push_back(implementation.clone());
            }
        }
    }

    settle_awaits(graph);
    Ok(project_transformations(graph))
}

/// Settle `requires_await` on every edge:
/// `requires_await(c→k) ⇔ is_async_declared(k) ∨ requires_async(k)`.
fn settle_awaits(graph: &mut CallGraph) {
    let mut awaitable: HashMap<MethodId, bool> = HashMap::new();
    for id in graph.method_ids() {
        if let Some(node) = graph.node(&id) {
            awaitable.insert(id, node.is_async_declared || node.requires_async);
        }
    }
    graph.for_each_edge_mut(|edge| {
        edge.requires_await = awaitable.get(&edge.callee).copied().unwrap_or(false);
    });
}

fn project_transformations(graph: &CallGraph) -> Vec<Transformation> {
    let mut out = Vec::new();
    for id in graph.flooded_methods.iter() {
        let Some(node) = graph.node(id) else { continue };
        let awaited_call_sites = graph
            .edges_from(id)
            .into_iter()
            .filter(|e| e.requires_await)
            .map(|e| CallSite {
                file: e.file,
                line: e.line,
            })
            .collect();
        out.push(Transformation {
            method: id.clone(),
            original_return_type: node.return_type.clone(),
            async_return_type: node
                .async_return_type
                .clone()
                .unwrap_or_else(|| wrap_return_type(&node.return_type)),
            awaited_call_sites,
        });
    }
    out
}
