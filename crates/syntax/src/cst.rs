//! Small helpers over the tree-sitter CST.
//!
//! A missing field or an unexpected child yields `None` and the caller
//! skips the construct; the analysis produces a sparser graph rather than
//! an error.

use tree_sitter::Node;

/// Collect every descendant (including `node` itself) for which `keep`
/// returns true. `prune` stops descent into a subtree without visiting it;
/// the pruned node itself is still offered to `keep`.
pub fn descendants<'t>(
    node: Node<'t>,
    keep: &dyn Fn(Node<'t>) -> bool,
    prune: &dyn Fn(Node<'t>) -> bool,
) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if keep(n) {
            out.push(n);
        }
        if n != node && prune(n) {
            continue;
        }
        let mut cursor = n.walk();
        // Reverse so the stack pops children in source order.
        let children: Vec<Node<'t>> = n.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

/// Direct children of a given kind, in source order.
pub fn children_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).filter(|c| c.kind() == kind).collect()
}

pub fn first_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == kind);
    result
}

/// Field lookup tolerant of the two names the grammar has used for a
/// declaration's return type.
pub fn return_type_node(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("returns")
        .or_else(|| node.child_by_field_name("type"))
}

/// Modifier keywords (`async`, `static`, `public`, ...) on a declaration.
pub fn modifier_texts<'s>(node: Node<'_>, text: &'s str) -> Vec<&'s str> {
    children_of_kind(node, "modifier")
        .into_iter()
        .filter_map(|m| text.get(m.start_byte()..m.end_byte()))
        .collect()
}

pub fn has_modifier(node: Node<'_>, text: &str, keyword: &str) -> bool {
    modifier_texts(node, text).iter().any(|m| *m == keyword)
}

/// True when the node is (transitively, through parentheses) the operand of
/// an `await` expression.
pub fn is_await_operand(node: Node<'_>) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "parenthesized_expression" => current = parent,
            "await_expression" => return true,
            _ => return false,
        }
    }
    false
}

/// 1-based line number of a node's first byte.
pub fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}
