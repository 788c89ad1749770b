//! Rewrite inputs derived from a flooded graph, and per-file outputs.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use asyncify_graph::{BaseTypeTransformation, CallGraph, MethodId};

/// Everything the rewriter needs to know about one project, projected out
/// of the flooded call graph.
#[derive(Debug, Clone, Default)]
pub struct RewritePlan {
    /// Methods whose declarations change.
    pub methods_to_transform: HashSet<MethodId>,
    /// Methods considered asynchronous at call sites: declared async,
    /// flooded, plus every interface member a flooded method implements.
    pub async_methods: HashSet<MethodId>,
    pub sync_wrappers: HashSet<MethodId>,
    /// Containing type display → base-list rewrites.
    pub base_type_transformations: BTreeMap<String, Vec<BaseTypeTransformation>>,
    /// Sync interface display → async interface display, restricted to the
    /// mappings flooding actually triggered.
    pub interface_mappings: BTreeMap<String, String>,
}

impl RewritePlan {
    pub fn from_graph(graph: &CallGraph) -> Self {
        let mut methods_to_transform = HashSet::new();
        let mut async_methods = HashSet::new();
        let mut triggered_mappings = BTreeMap::new();

        for id in graph.method_ids() {
            let Some(node) = graph.node(&id) else { continue };
            if node.is_async_declared {
                async_methods.insert(id.clone());
            }
            if node.requires_async {
                methods_to_transform.insert(id.clone());
                async_methods.insert(id.clone());
                for iface in &node.implements_interface_methods {
                    async_methods.insert(iface.clone());
                    // A mapping is in play once any implementation of the
                    // mapped interface floods.
                    if let Some(iface_node) = graph.node(iface) {
                        if let Some(target) =
                            graph.interface_mappings.get(&iface_node.containing_type)
                        {
                            triggered_mappings
                                .insert(iface_node.containing_type.clone(), target.clone());
                        }
                    }
                }
            }
        }

        Self {
            methods_to_transform,
            async_methods,
            sync_wrappers: graph.sync_wrapper_methods().into_iter().collect(),
            base_type_transformations: graph.base_type_transformations.clone(),
            interface_mappings: triggered_mappings,
        }
    }
}

/// The rewritten form of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRewrite {
    pub path: PathBuf,
    pub original_text: String,
    pub new_text: String,
    /// 1-based lines where an `await` was inserted.
    pub await_lines: Vec<usize>,
    pub changed: bool,
}

impl FileRewrite {
    pub fn unchanged(path: PathBuf, text: String) -> Self {
        Self {
            path,
            original_text: text.clone(),
            new_text: text,
            await_lines: Vec::new(),
            changed: false,
        }
    }

    /// Unified diff of the rewrite, for review mode.
    pub fn unified_diff(&self) -> String {
        let name = self.path.display().to_string();
        TextDiff::from_lines(&self.original_text, &self.new_text)
            .unified_diff()
            .header(&format!("a/{name}"), &format!("b/{name}"))
            .to_string()
    }
}
