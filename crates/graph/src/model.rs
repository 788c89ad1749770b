//! Method identities, nodes, and call edges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel file path for callees declared outside the analyzed compilation.
/// External nodes may appear only as callees and are never rewritten.
pub const EXTERNAL_FILE: &str = "external";

/// Stable method identity: `{type}.{name}({param_types_csv})`, normalized to
/// the original (uninstantiated) definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(String);

impl MethodId {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn from_parts(containing_type: &str, name: &str, param_types: &[&str]) -> Self {
        Self(format!(
            "{}.{}({})",
            containing_type,
            name,
            param_types.join(", ")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MethodId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub ty: String,
    pub name: String,
}

/// A method in the call graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub id: MethodId,
    pub name: String,
    pub containing_type: String,
    pub namespace: String,
    /// Declared return type, as written in source.
    pub return_type: String,
    pub parameters: Vec<Param>,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub is_async_declared: bool,
    pub is_interface_member: bool,
    pub is_sync_wrapper: bool,
    /// Decision flag set by flooding; always false for `is_async_declared`
    /// nodes.
    pub requires_async: bool,
    /// Wrapped return type computed by flooding.
    pub async_return_type: Option<String>,
    /// Interface members this method implements (explicit and implicit).
    pub implements_interface_methods: Vec<MethodId>,
    /// True when the declared return type is a type parameter of the
    /// containing generic type; redirects interface propagation.
    pub is_return_type_a_type_parameter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl MethodNode {
    /// Stub node for a callee declared outside the analyzed compilation.
    pub fn external(id: MethodId) -> Self {
        let (containing_type, name) = split_identity(id.as_str());
        Self {
            id,
            name,
            containing_type,
            namespace: String::new(),
            return_type: String::new(),
            parameters: Vec::new(),
            file_path: EXTERNAL_FILE.to_string(),
            start_line: 0,
            end_line: 0,
            is_async_declared: false,
            is_interface_member: false,
            is_sync_wrapper: false,
            requires_async: false,
            async_return_type: None,
            implements_interface_methods: Vec::new(),
            is_return_type_a_type_parameter: false,
            source_text: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.file_path == EXTERNAL_FILE
    }
}

fn split_identity(identity: &str) -> (String, String) {
    let head = identity.split('(').next().unwrap_or(identity);
    match head.rfind('.') {
        Some(dot) => (head[..dot].to_string(), head[dot + 1..].to_string()),
        None => (String::new(), head.to_string()),
    }
}

/// A caller → callee invocation edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodCall {
    pub caller: MethodId,
    pub callee: MethodId,
    pub file: String,
    pub line: usize,
    pub requires_await: bool,
}

/// Instruction to wrap a base-list type argument of an implementing class
/// in the task type instead of changing the interface declaration itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseTypeTransformation {
    /// Declared display of the interface, e.g. `IMapper<TIn, TOut>`.
    pub interface_display: String,
    /// The interface type parameter used as the member's return type,
    /// e.g. `TOut`.
    pub type_parameter: String,
}

/// Wrap a declared return type in the task type: `void` becomes `Task`,
/// task-shaped types are unchanged, anything else becomes `Task<T>`.
/// Idempotent by construction.
pub fn wrap_return_type(ty: &str) -> String {
    let t = ty.trim();
    if t == "void" {
        "Task".to_string()
    } else if is_task_shaped(t) {
        t.to_string()
    } else {
        format!("Task<{t}>")
    }
}

/// True for `Task`, `Task<...>`, and their fully qualified spellings.
pub fn is_task_shaped(ty: &str) -> bool {
    let t = ty.trim();
    for prefix in ["Task", "System.Threading.Tasks.Task"] {
        if t == prefix || (t.starts_with(prefix) && t[prefix.len()..].starts_with('<')) {
            return true;
        }
    }
    false
}
