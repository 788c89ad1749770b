//! Builds a [`CallGraph`] from a compiled project.
//!
//! Two passes per file, file-parallel: declarations create nodes,
//! invocations create edges. Callees that resolve to a method outside the
//! analyzed compilation get an external stub node so every edge has both
//! endpoints.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;

use asyncify_graph::{CallGraph, MethodCall, MethodId, MethodNode, Param};
use asyncify_syntax::cst;
use asyncify_syntax::{Compilation, MethodRef, ParsedFile};

use crate::AnalysisError;

/// Per-file progress callback: `(path, processed, total)`.
pub type FileProgress<'a> = &'a (dyn Fn(&Path, usize, usize) + Sync);

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Identities of sync wrappers declared outside the compilation
    /// (library helpers the project calls but does not define).
    pub external_sync_wrappers: Vec<MethodId>,
    /// Capture each method's source text on its node.
    pub capture_source: bool,
}

/// Extract the call graph of a compilation.
pub fn extract_graph(
    compilation: &Compilation,
    options: &ExtractOptions,
    cancel: &AtomicBool,
    progress: FileProgress<'_>,
) -> Result<CallGraph, AnalysisError> {
    let graph = CallGraph::new();
    let total = compilation.files().len();
    let processed = AtomicUsize::new(0);

    compilation
        .files()
        .par_iter()
        .try_for_each(|file| -> Result<(), AnalysisError> {
            if cancel.load(Ordering::Relaxed) {
                return Err(AnalysisError::Cancelled);
            }
            extract_file(compilation, file, options, &graph);
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            progress(&file.path, done, total);
            Ok(())
        })?;

    tracing::debug!(
        methods = graph.method_count(),
        edges = graph.edge_count(),
        "extraction complete"
    );
    Ok(graph)
}

fn extract_file(
    compilation: &Compilation,
    file: &ParsedFile,
    options: &ExtractOptions,
    graph: &CallGraph,
) {
    let sites = compilation.method_sites(file);

    // Pass 1: declarations.
    for site in &sites {
        let node = build_node(compilation, site.method, options, file, site.node);
        graph.insert_node(node);
    }

    // Pass 2: invocations.
    for site in &sites {
        let Some(body) = site
            .node
            .child_by_field_name("body")
            .or_else(|| cst::first_child_of_kind(site.node, "arrow_expression_clause"))
        else {
            continue;
        };
        let caller = MethodId::new(compilation.identity(site.method));
        for invocation in cst::descendants(
            body,
            &|n| n.kind() == "invocation_expression",
            &|n| n.kind() == "local_function_statement",
        ) {
            let Some(target) = compilation.resolve_invocation(file, invocation, site.method)
            else {
                continue;
            };
            let callee = MethodId::new(compilation.identity(target));
            graph.ensure_callee(&callee);
            graph.add_edge(MethodCall {
                caller: caller.clone(),
                callee: callee.clone(),
                file: file.path.display().to_string(),
                line: cst::line_of(invocation),
                requires_await: false,
            });
            if options.external_sync_wrappers.contains(&callee) {
                graph.mark_sync_wrapper(&callee);
            }
        }
    }
}

fn build_node(
    compilation: &Compilation,
    r: MethodRef,
    options: &ExtractOptions,
    file: &ParsedFile,
    node: tree_sitter::Node<'_>,
) -> MethodNode {
    let info = compilation.method(r);
    let containing = compilation.type_info(r.type_index);
    let implements = compilation
        .implemented_interface_methods(r)
        .into_iter()
        .map(|im| MethodId::new(compilation.identity(im)))
        .collect();

    MethodNode {
        id: MethodId::new(info.identity()),
        name: info.name.clone(),
        containing_type: info.containing_type.clone(),
        namespace: info.namespace.clone(),
        return_type: info.return_type.clone(),
        parameters: info
            .parameters
            .iter()
            .map(|p| Param {
                ty: p.ty.clone(),
                name: p.name.clone(),
            })
            .collect(),
        file_path: info.file.display().to_string(),
        start_line: info.start_line,
        end_line: info.end_line,
        is_async_declared: info.is_async,
        is_interface_member: info.is_interface_member,
        is_sync_wrapper: false,
        requires_async: false,
        async_return_type: None,
        implements_interface_methods: implements,
        is_return_type_a_type_parameter: containing
            .type_parameters
            .iter()
            .any(|tp| tp == &info.return_type),
        source_text: options
            .capture_source
            .then(|| file.node_text(node).to_string()),
    }
}
