//! Recognizes the "runs a task synchronously" method shape.
//!
//! A sync wrapper takes a `Func<Task>` or `Func<Task<T>>` parameter and
//! blocks to produce a plain value: either it returns `void` (task form) or
//! its return type equals the task's `T` (task-of-T form, matched either as
//! the same type text or the same named type parameter).

use serde::{Deserialize, Serialize};

use asyncify_graph::{CallGraph, MethodId};
use asyncify_syntax::{split_type_arguments, Compilation, MethodInfo};

/// A detected wrapper with a human-readable description of the matched
/// shape, surfaced in diagnostics and job output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWrapperPattern {
    pub method: MethodId,
    pub description: String,
}

/// Scan every declared method and mark sync wrappers on the graph.
pub fn detect_sync_wrappers(
    compilation: &Compilation,
    graph: &CallGraph,
) -> Vec<SyncWrapperPattern> {
    let mut found = Vec::new();
    for ty in compilation.types() {
        for method in &ty.methods {
            let Some(description) = wrapper_description(method) else {
                continue;
            };
            let id = MethodId::new(method.identity());
            graph.mark_sync_wrapper(&id);
            tracing::debug!(method = %id, %description, "detected sync wrapper");
            found.push(SyncWrapperPattern {
                method: id,
                description,
            });
        }
    }
    found.sort_by(|a, b| a.method.cmp(&b.method));
    found
}

fn wrapper_description(method: &MethodInfo) -> Option<String> {
    for param in &method.parameters {
        let Some(task_arg) = func_of_task_argument(&param.ty) else {
            continue;
        };
        match task_arg {
            // Func<Task>: the wrapper must return void.
            None if method.return_type == "void" => {
                return Some(format!(
                    "void {}({}) blocks on a Func<Task> argument",
                    method.name, param.ty
                ));
            }
            // Func<Task<T>>: the wrapper must return T itself. Concrete
            // types and shared named type parameters both compare by the
            // declared text.
            Some(inner) if method.return_type == inner => {
                return Some(format!(
                    "{} {}({}) blocks on a Func<Task<{}>> argument and returns its result",
                    method.return_type, method.name, param.ty, inner
                ));
            }
            _ => {}
        }
    }
    None
}

/// For a parameter type that is a parameterless function returning a task,
/// yield the task's type argument: `Func<Task>` → `Some(None)`,
/// `Func<Task<T>>` → `Some(Some("T"))`, anything else → `None`.
fn func_of_task_argument(param_type: &str) -> Option<Option<String>> {
    let t = param_type.trim();
    let inner = t
        .strip_prefix("Func<")
        .or_else(|| t.strip_prefix("System.Func<"))?
        .strip_suffix('>')?;
    let args = split_type_arguments(inner);
    // A parameterless function has exactly one type argument: the result.
    if args.len() != 1 {
        return None;
    }
    let result = args[0].trim();
    if result == "Task" || result == "System.Threading.Tasks.Task" {
        return Some(None);
    }
    for prefix in ["Task<", "System.Threading.Tasks.Task<"] {
        if let Some(rest) = result.strip_prefix(prefix) {
            let arg = rest.strip_suffix('>')?;
            return Some(Some(arg.trim().to_string()));
        }
    }
    None
}
