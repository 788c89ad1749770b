//! Declaration model: types, methods, and the display printer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::cst;
use crate::parse::ParsedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Declared type, as written in source.
    pub ty: String,
    pub name: String,
}

/// A method or local-function declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    /// Canonical display of the containing type; filled when the
    /// compilation index is finalized.
    pub containing_type: String,
    pub namespace: String,
    /// Declared return type, as written in source.
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub type_parameters: Vec<String>,
    pub is_async: bool,
    pub is_static: bool,
    pub is_interface_member: bool,
    pub is_local_function: bool,
    /// Interface name from an explicit interface implementation
    /// (`void IFoo.Bar()`), as written.
    pub explicit_interface: Option<String>,
    pub has_body: bool,
    pub file: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

impl MethodInfo {
    /// Stable identity: `{type}.{name}({param_types_csv})`. Parameter types
    /// are the declared (original-definition) forms, so a generic method and
    /// its instantiations share one identity.
    pub fn identity(&self) -> String {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.ty.as_str()).collect();
        format!("{}.{}({})", self.containing_type, self.name, params.join(", "))
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// A type declaration and its members.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Short name, `Outer.Inner` for nested types.
    pub name: String,
    pub namespace: String,
    pub type_parameters: Vec<String>,
    /// Base-list entries as written (`BaseClass`, `IMapper<A, B>`, ...).
    pub base_types: Vec<String>,
    /// Canonical display; short form unless two analyzed types collide on
    /// it, in which case the namespace is prefixed.
    pub display: String,
    pub file: PathBuf,
    pub methods: Vec<MethodInfo>,
    /// Fields and properties, used for receiver-type resolution.
    pub members: Vec<(String, String)>,
}

impl TypeInfo {
    /// Display before global disambiguation: name plus declared type
    /// parameters, e.g. `Mapper<TIn, TOut>`.
    pub fn short_display(&self) -> String {
        if self.type_parameters.is_empty() {
            self.name.clone()
        } else {
            format!("{}<{}>", self.name, self.type_parameters.join(", "))
        }
    }
}

/// `IMapper<TIn, TOut>` → `("IMapper", 2)`; `Foo` → `("Foo", 0)`.
pub fn strip_type_arguments(ty: &str) -> (&str, usize) {
    let t = ty.trim();
    match t.find('<') {
        Some(open) if t.ends_with('>') => {
            let args = &t[open + 1..t.len() - 1];
            (t[..open].trim(), split_type_arguments(args).len())
        }
        _ => (t, 0),
    }
}

/// Split a type-argument list at top-level commas: `A, Dictionary<K, V>` →
/// `["A", "Dictionary<K, V>"]`.
pub fn split_type_arguments(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in args.chars() {
        match ch {
            '<' | '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            '>' | ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

/// A type declaration paired with its CST nodes, valid while the file's
/// tree is alive.
pub(crate) struct CollectedType<'t> {
    pub node: Node<'t>,
    pub info: TypeInfo,
    /// One node per entry in `info.methods`, same order.
    pub method_nodes: Vec<Node<'t>>,
}

const TYPE_DECL_KINDS: [&str; 4] = [
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "record_declaration",
];

fn type_kind(node: Node<'_>) -> Option<TypeKind> {
    match node.kind() {
        "class_declaration" => Some(TypeKind::Class),
        "interface_declaration" => Some(TypeKind::Interface),
        "struct_declaration" => Some(TypeKind::Struct),
        "record_declaration" => Some(TypeKind::Record),
        _ => None,
    }
}

/// Namespace of a node, from its enclosing namespace declarations.
fn namespace_of(node: Node<'_>, text: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = node;
    while let Some(parent) = current.parent() {
        if matches!(
            parent.kind(),
            "namespace_declaration" | "file_scoped_namespace_declaration"
        ) {
            if let Some(name) = parent.child_by_field_name("name") {
                if let Some(t) = text.get(name.start_byte()..name.end_byte()) {
                    parts.push(t.to_string());
                }
            }
        }
        current = parent;
    }
    parts.reverse();
    parts.join(".")
}

fn type_parameters_of(node: Node<'_>, text: &str) -> Vec<String> {
    let Some(list) = cst::first_child_of_kind(node, "type_parameter_list") else {
        return Vec::new();
    };
    cst::children_of_kind(list, "type_parameter")
        .into_iter()
        .filter_map(|p| {
            // A type parameter may carry variance keywords; the identifier
            // is its last named child.
            let mut cursor = p.walk();
            let ident = p
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "identifier")
                .last()?;
            text.get(ident.start_byte()..ident.end_byte()).map(str::to_string)
        })
        .collect()
}

fn base_types_of(node: Node<'_>, text: &str) -> Vec<String> {
    let Some(list) = cst::first_child_of_kind(node, "base_list") else {
        return Vec::new();
    };
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter_map(|c| text.get(c.start_byte()..c.end_byte()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parameters_of(node: Node<'_>, text: &str) -> Vec<Parameter> {
    let Some(list) = node
        .child_by_field_name("parameters")
        .or_else(|| cst::first_child_of_kind(node, "parameter_list"))
    else {
        return Vec::new();
    };
    cst::children_of_kind(list, "parameter")
        .into_iter()
        .filter_map(|p| {
            let ty = p.child_by_field_name("type")?;
            let name = p.child_by_field_name("name")?;
            Some(Parameter {
                ty: text.get(ty.start_byte()..ty.end_byte())?.trim().to_string(),
                name: text.get(name.start_byte()..name.end_byte())?.to_string(),
            })
        })
        .collect()
}

fn explicit_interface_of(node: Node<'_>, text: &str) -> Option<String> {
    let spec = cst::first_child_of_kind(node, "explicit_interface_specifier")?;
    let mut cursor = spec.walk();
    let name = spec.named_children(&mut cursor).next()?;
    text.get(name.start_byte()..name.end_byte()).map(str::to_string)
}

fn method_info(
    node: Node<'_>,
    file: &ParsedFile,
    namespace: &str,
    in_interface: bool,
    is_local: bool,
) -> Option<MethodInfo> {
    let name = node.child_by_field_name("name")?;
    let return_type = cst::return_type_node(node)?;
    let has_body = node.child_by_field_name("body").is_some()
        || cst::first_child_of_kind(node, "arrow_expression_clause").is_some();
    Some(MethodInfo {
        name: file.node_text(name).to_string(),
        containing_type: String::new(),
        namespace: namespace.to_string(),
        return_type: file.node_text(return_type).trim().to_string(),
        parameters: parameters_of(node, &file.text),
        type_parameters: type_parameters_of(node, &file.text),
        is_async: cst::has_modifier(node, &file.text, "async"),
        is_static: cst::has_modifier(node, &file.text, "static"),
        is_interface_member: in_interface,
        is_local_function: is_local,
        explicit_interface: explicit_interface_of(node, &file.text),
        has_body,
        file: file.path.clone(),
        start_line: cst::line_of(node),
        end_line: node.end_position().row + 1,
    })
}

/// Collect every type declared in a file, with its methods and local
/// functions. Nested types appear as separate entries named `Outer.Inner`.
pub(crate) fn collect_types<'t>(file: &'t ParsedFile) -> Vec<CollectedType<'t>> {
    let type_nodes = cst::descendants(
        file.root(),
        &|n| TYPE_DECL_KINDS.contains(&n.kind()),
        &|_| false,
    );

    let mut out = Vec::new();
    for node in type_nodes {
        let Some(kind) = type_kind(node) else { continue };
        let Some(name_node) = node.child_by_field_name("name") else {
            continue;
        };
        let mut name = file.node_text(name_node).to_string();
        // Prefix enclosing type names for nested declarations.
        let mut parent = node.parent();
        while let Some(p) = parent {
            if TYPE_DECL_KINDS.contains(&p.kind()) {
                if let Some(outer) = p.child_by_field_name("name") {
                    name = format!("{}.{}", file.node_text(outer), name);
                }
            }
            parent = p.parent();
        }

        let namespace = namespace_of(node, &file.text);
        let in_interface = kind == TypeKind::Interface;

        let mut methods = Vec::new();
        let mut method_nodes = Vec::new();
        let mut members = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            // Methods declared directly in this type (not in nested types),
            // plus local functions inside those methods.
            let declared = cst::descendants(
                body,
                &|n| matches!(n.kind(), "method_declaration" | "local_function_statement"),
                &|n| TYPE_DECL_KINDS.contains(&n.kind()),
            );
            for decl in declared {
                let is_local = decl.kind() == "local_function_statement";
                if let Some(info) =
                    method_info(decl, file, &namespace, in_interface && !is_local, is_local)
                {
                    methods.push(info);
                    method_nodes.push(decl);
                }
            }

            for field in cst::descendants(
                body,
                &|n| matches!(n.kind(), "field_declaration" | "property_declaration"),
                &|n| TYPE_DECL_KINDS.contains(&n.kind()),
            ) {
                members.extend(member_entries(field, file));
            }
        }

        out.push(CollectedType {
            node,
            info: TypeInfo {
                kind,
                name,
                namespace,
                type_parameters: type_parameters_of(node, &file.text),
                base_types: base_types_of(node, &file.text),
                display: String::new(),
                file: file.path.clone(),
                methods,
                members,
            },
            method_nodes,
        });
    }
    out
}

fn member_entries(node: Node<'_>, file: &ParsedFile) -> Vec<(String, String)> {
    match node.kind() {
        "property_declaration" => {
            let (Some(ty), Some(name)) = (
                node.child_by_field_name("type"),
                node.child_by_field_name("name"),
            ) else {
                return Vec::new();
            };
            vec![(
                file.node_text(name).to_string(),
                file.node_text(ty).trim().to_string(),
            )]
        }
        "field_declaration" => {
            let Some(decl) = cst::first_child_of_kind(node, "variable_declaration") else {
                return Vec::new();
            };
            let Some(ty) = decl.child_by_field_name("type") else {
                return Vec::new();
            };
            let ty_text = file.node_text(ty).trim().to_string();
            cst::children_of_kind(decl, "variable_declarator")
                .into_iter()
                .filter_map(|d| {
                    let name = d
                        .child_by_field_name("name")
                        .or_else(|| cst::first_child_of_kind(d, "identifier"))?;
                    Some((file.node_text(name).to_string(), ty_text.clone()))
                })
                .collect()
        }
        _ => Vec::new(),
    }
}
