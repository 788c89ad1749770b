//! The trivia-preserving rewriter.
//!
//! Works in byte edits over the original text, so every token it does not
//! touch keeps its exact trivia. Per method it picks one of four shapes:
//! return-type-only (interface members and other bodiless declarations),
//! direct task return (single-call bodies stay non-async and return the
//! callee's task), the constant-task shortcut (methods flooded for
//! signature parity fabricate ready tasks), or the general async/await
//! rewrite. Sync-wrapper calls are unwrapped to `await` on the inner
//! invocation. The rewriter never fails a file: shapes it does not
//! recognize are left as they were.

use std::collections::BTreeSet;

use tree_sitter::Node;

use asyncify_graph::{is_task_shaped, wrap_return_type, MethodId};
use asyncify_syntax::cst;
use asyncify_syntax::{
    split_type_arguments, strip_type_arguments, Compilation, MethodRef, ParsedFile, TypeSite,
};

use crate::edits::{apply_edits, TextEdit};
use crate::plan::{FileRewrite, RewritePlan};

/// Namespace of the task type; imported exactly once into rewritten files.
pub const TASKS_NAMESPACE: &str = "System.Threading.Tasks";

/// Rewrite one file against a plan. Never fails: unrecognized shapes pass
/// through unchanged.
pub fn rewrite_file(
    compilation: &Compilation,
    file: &ParsedFile,
    plan: &RewritePlan,
) -> FileRewrite {
    FileRewriter {
        compilation,
        file,
        plan,
        edits: Vec::new(),
        await_lines: Vec::new(),
        namespaces_to_import: BTreeSet::new(),
    }
    .run()
}

struct FileRewriter<'a, 't> {
    compilation: &'a Compilation,
    file: &'t ParsedFile,
    plan: &'a RewritePlan,
    edits: Vec<TextEdit>,
    await_lines: Vec<usize>,
    namespaces_to_import: BTreeSet<String>,
}

/// A resolved invocation inside the method body being rewritten.
struct CallSite<'t> {
    node: Node<'t>,
    is_wrapper: bool,
    is_async: bool,
}

impl<'a, 't> FileRewriter<'a, 't> {
    fn run(mut self) -> FileRewrite {
        for site in self.compilation.method_sites(self.file) {
            self.rewrite_method(site.method, site.node);
        }
        for site in self.compilation.type_sites(self.file) {
            self.rewrite_base_list(&site);
        }

        if !self.edits.is_empty() {
            self.namespaces_to_import.insert(TASKS_NAMESPACE.to_string());
            let imports: Vec<TextEdit> = self
                .namespaces_to_import
                .iter()
                .filter_map(|ns| self.missing_import(ns))
                .collect();
            self.edits.extend(imports);
        }

        let new_text = apply_edits(&self.file.text, &self.edits);
        let changed = new_text != self.file.text;
        self.await_lines.sort_unstable();
        self.await_lines.dedup();
        FileRewrite {
            path: self.file.path.clone(),
            original_text: self.file.text.clone(),
            new_text,
            await_lines: self.await_lines,
            changed,
        }
    }

    fn rewrite_method(&mut self, r: MethodRef, node: Node<'t>) {
        let info = self.compilation.method(r).clone();
        let id = MethodId::new(info.identity());
        if !self.plan.methods_to_transform.contains(&id) || info.is_async {
            return;
        }
        // A declaration that already returns a task satisfies the async
        // shape; leaving it alone also makes reruns no-ops.
        if is_task_shaped(&info.return_type) {
            return;
        }
        let Some(return_node) = cst::return_type_node(node) else {
            return;
        };
        let wrapped = wrap_return_type(&info.return_type);

        let body = node.child_by_field_name("body");
        let arrow = cst::first_child_of_kind(node, "arrow_expression_clause");
        let Some(scope) = body.or(arrow) else {
            // Interface member, abstract, extern: signature only.
            self.replace_node(return_node, wrapped);
            return;
        };
        if info.is_interface_member {
            self.replace_node(return_node, wrapped);
            return;
        }

        let calls = self.classify_calls(scope, r);
        let needs_body = calls
            .iter()
            .any(|c| c.is_wrapper || (c.is_async && !cst::is_await_operand(c.node)));

        if !needs_body {
            // Flooded without async callees (interface parity): present the
            // async signature with ready-made tasks.
            self.replace_node(return_node, wrapped);
            self.constant_task_body(&info.return_type, scope, arrow.is_some());
            return;
        }

        if let Some(extra) = self.direct_task_return(scope, arrow.is_some(), &calls) {
            self.replace_node(return_node, wrapped);
            if let Some(edit) = extra {
                self.edits.push(edit);
            }
            return;
        }

        // General shape: async modifier plus awaits.
        self.replace_node(return_node, format!("async {wrapped}"));
        for call in &calls {
            if call.is_wrapper {
                if let Some(inner) = unwrap_wrapper_argument(self.file, call.node) {
                    self.replace_node(call.node, format!("await {inner}"));
                    self.await_lines.push(cst::line_of(call.node));
                }
                // Unrecognized wrapper argument shapes stay as they are;
                // the call keeps its original non-task type.
            } else if call.is_async && !cst::is_await_operand(call.node) {
                self.edits
                    .push(TextEdit::insert(call.node.start_byte(), "await "));
                self.await_lines.push(cst::line_of(call.node));
            }
        }
    }

    /// Invocations in the body that resolve to a wrapper or an
    /// async-or-will-be-async callee. Nested lambdas and local functions
    /// are out of scope here; local functions are rewritten as their own
    /// declarations.
    fn classify_calls(&self, scope: Node<'t>, site: MethodRef) -> Vec<CallSite<'t>> {
        cst::descendants(
            scope,
            &|n| n.kind() == "invocation_expression",
            &|n| {
                matches!(
                    n.kind(),
                    "lambda_expression"
                        | "anonymous_method_expression"
                        | "local_function_statement"
                )
            },
        )
        .into_iter()
        .filter_map(|node| {
            let target = self.compilation.resolve_invocation(self.file, node, site)?;
            let id = MethodId::new(self.compilation.identity(target));
            let is_wrapper = self.plan.sync_wrappers.contains(&id);
            let is_async = self.plan.async_methods.contains(&id);
            (is_wrapper || is_async).then_some(CallSite {
                node,
                is_wrapper,
                is_async,
            })
        })
        .collect()
    }

    /// The direct-task-return optimization: a body that is a single call to
    /// an async callee (as a statement or as the returned expression) keeps
    /// the method non-async and returns the task itself. Sync-wrapper calls
    /// are excluded, they need unwrapping and therefore `await`.
    ///
    /// Returns `None` when the shape does not apply, `Some(extra_edit)`
    /// when it does.
    fn direct_task_return(
        &self,
        scope: Node<'t>,
        is_arrow: bool,
        calls: &[CallSite<'t>],
    ) -> Option<Option<TextEdit>> {
        let qualifies = |expr: Node<'t>| {
            expr.kind() == "invocation_expression"
                && calls
                    .iter()
                    .any(|c| c.node == expr && c.is_async && !c.is_wrapper)
        };

        if is_arrow {
            let expr = expression_of(scope)?;
            return qualifies(expr).then_some(None);
        }

        let statements: Vec<Node<'t>> = {
            let mut cursor = scope.walk();
            scope
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .collect()
        };
        let [statement] = statements.as_slice() else {
            return None;
        };
        match statement.kind() {
            "expression_statement" => {
                let expr = expression_of(*statement)?;
                qualifies(expr)
                    .then_some(Some(TextEdit::insert(expr.start_byte(), "return ")))
            }
            "return_statement" => {
                let expr = expression_of(*statement)?;
                qualifies(expr).then_some(None)
            }
            _ => None,
        }
    }

    /// The constant-task shortcut: satisfy the async signature without
    /// suspending. Value returns are wrapped in `Task.FromResult<T>`, bare
    /// returns become `return Task.CompletedTask;`, and a void block with
    /// no explicit return gets one appended. An expression-bodied void
    /// method is left unchanged: there is no block to append to.
    fn constant_task_body(&mut self, return_type: &str, scope: Node<'t>, is_arrow: bool) {
        if is_arrow {
            if return_type == "void" {
                return;
            }
            if let Some(expr) = expression_of(scope) {
                self.edits.push(TextEdit::insert(
                    expr.start_byte(),
                    format!("Task.FromResult<{return_type}>("),
                ));
                self.edits.push(TextEdit::insert(expr.end_byte(), ")"));
            }
            return;
        }

        let returns = cst::descendants(
            scope,
            &|n| n.kind() == "return_statement",
            &|n| {
                matches!(
                    n.kind(),
                    "lambda_expression"
                        | "anonymous_method_expression"
                        | "local_function_statement"
                )
            },
        );
        for ret in &returns {
            let expr = expression_of(*ret);
            if return_type == "void" {
                if expr.is_none() {
                    self.replace_node(*ret, "return Task.CompletedTask;");
                }
            } else if let Some(expr) = expr {
                self.edits.push(TextEdit::insert(
                    expr.start_byte(),
                    format!("Task.FromResult<{return_type}>("),
                ));
                self.edits.push(TextEdit::insert(expr.end_byte(), ")"));
            }
        }
        if return_type == "void" && returns.is_empty() {
            self.append_completed_return(scope);
        }
    }

    /// Append `return Task.CompletedTask;` before the closing brace of a
    /// void block, matching the block's layout: inline for single-line
    /// bodies, indented one level for multi-line ones.
    fn append_completed_return(&mut self, block: Node<'t>) {
        let mut cursor = block.walk();
        let Some(close) = block.children(&mut cursor).find(|c| c.kind() == "}") else {
            return;
        };
        let brace_start = close.start_byte();
        let before = &self.file.text[block.start_byte()..brace_start];
        if !before.contains('\n') {
            let insertion = if before.ends_with(char::is_whitespace) {
                "return Task.CompletedTask; "
            } else {
                " return Task.CompletedTask; "
            };
            self.edits.push(TextEdit::insert(brace_start, insertion));
        } else {
            let line_start = self.file.text[..brace_start]
                .rfind('\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let indent = &self.file.text[line_start..brace_start];
            let indent = if indent.chars().all(char::is_whitespace) {
                indent
            } else {
                ""
            };
            let eol = line_ending(&self.file.text);
            self.edits.push(TextEdit::insert(
                brace_start,
                format!("    return Task.CompletedTask;{eol}{indent}"),
            ));
        }
    }

    /// Base-list rewrites for one type: generic covariant-return wraps and
    /// sync→async interface replacements.
    fn rewrite_base_list(&mut self, site: &TypeSite<'t>) {
        let info = self.compilation.type_info(site.type_index);
        let Some(base_list) = cst::first_child_of_kind(site.node, "base_list") else {
            return;
        };
        let entries: Vec<Node<'t>> = {
            let mut cursor = base_list.walk();
            base_list.named_children(&mut cursor).collect()
        };

        if let Some(transforms) = self.plan.base_type_transformations.get(&info.display) {
            for transform in transforms {
                let (iface_name, _) = strip_type_arguments(&transform.interface_display);
                let declared_args = declared_type_arguments(&transform.interface_display);
                let Some(param_index) = declared_args
                    .iter()
                    .position(|a| a == &transform.type_parameter)
                else {
                    continue;
                };
                for entry in &entries {
                    let text = self.file.node_text(*entry);
                    let (name, _) = strip_type_arguments(text);
                    if name != iface_name && !name.ends_with(&format!(".{iface_name}")) {
                        continue;
                    }
                    let Some((start, end)) = type_argument_range(text, param_index) else {
                        continue;
                    };
                    let argument = &text[start..end];
                    if is_task_shaped(argument) {
                        continue;
                    }
                    self.edits.push(TextEdit::replace(
                        entry.start_byte() + start,
                        entry.start_byte() + end,
                        format!("Task<{argument}>"),
                    ));
                }
            }
        }

        for entry in &entries {
            let text = self.file.node_text(*entry);
            let Some(ti) = self.compilation.find_type(text) else {
                continue;
            };
            let display = self.compilation.type_info(ti).display.clone();
            let Some(target) = self.plan.interface_mappings.get(&display) else {
                continue;
            };
            let (namespace, short) = match target.rfind('.') {
                Some(dot) => (&target[..dot], &target[dot + 1..]),
                None => ("", target.as_str()),
            };
            // Replace the name portion only so type arguments survive.
            let name_node = if entry.kind() == "generic_name" {
                cst::first_child_of_kind(*entry, "identifier").unwrap_or(*entry)
            } else {
                *entry
            };
            self.replace_node(name_node, short.to_string());
            if !namespace.is_empty() {
                self.namespaces_to_import.insert(namespace.to_string());
            }
        }
    }

    /// An insertion at offset 0 for a missing `using`, or `None` when the
    /// namespace is already imported (fully qualified comparison). Usings
    /// nested inside namespace declarations count as present too.
    fn missing_import(&self, namespace: &str) -> Option<TextEdit> {
        let usings = cst::descendants(
            self.file.root(),
            &|n| n.kind() == "using_directive",
            &|n| {
                !matches!(
                    n.kind(),
                    "compilation_unit"
                        | "namespace_declaration"
                        | "file_scoped_namespace_declaration"
                        | "declaration_list"
                )
            },
        );
        for using in usings {
            let mut cursor = using.walk();
            let Some(name) = using.named_children(&mut cursor).last() else {
                continue;
            };
            let normalized: String = self
                .file
                .node_text(name)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if normalized == namespace {
                return None;
            }
        }
        let eol = line_ending(&self.file.text);
        Some(TextEdit::insert(0, format!("using {namespace};{eol}")))
    }

    fn replace_node(&mut self, node: Node<'t>, replacement: impl Into<String>) {
        let replacement = replacement.into();
        if self.file.node_text(node) != replacement {
            self.edits
                .push(TextEdit::replace(node.start_byte(), node.end_byte(), replacement));
        }
    }
}

/// First expression child of a statement or arrow clause.
fn expression_of(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let result = node.named_children(&mut cursor)
        .find(|c| !matches!(c.kind(), "comment" | "attribute_list"));
    result
}

/// Extract the inner invocation of a sync-wrapper call whose first argument
/// is one of the recognized lambda shapes:
/// a parameterless lambda with an expression body, a parameterless lambda
/// whose block body's only return is an invocation, or a single-parameter
/// lambda whose expression body is an invocation.
fn unwrap_wrapper_argument(file: &ParsedFile, invocation: Node<'_>) -> Option<String> {
    let args = invocation.child_by_field_name("arguments")?;
    let first = cst::children_of_kind(args, "argument").into_iter().next()?;
    let mut cursor = first.walk();
    let lambda = first.named_children(&mut cursor).next()?;
    if lambda.kind() != "lambda_expression" {
        return None;
    }

    let params = lambda_parameter_count(lambda);
    let body = lambda
        .child_by_field_name("body")
        .or_else(|| last_named_child(lambda))?;

    match (params, body.kind()) {
        (0, "block") => {
            // The first return of the block decides the shape.
            let ret = *cst::descendants(
                body,
                &|n| n.kind() == "return_statement",
                &|n| n.kind() == "lambda_expression",
            )
            .first()?;
            let expr = expression_of(ret)?;
            (expr.kind() == "invocation_expression").then(|| file.node_text(expr).to_string())
        }
        (0, _) => Some(file.node_text(body).to_string()),
        (1, "invocation_expression") => Some(file.node_text(body).to_string()),
        _ => None,
    }
}

fn lambda_parameter_count(lambda: Node<'_>) -> usize {
    if let Some(list) = lambda
        .child_by_field_name("parameters")
        .filter(|n| n.kind() == "parameter_list")
        .or_else(|| cst::first_child_of_kind(lambda, "parameter_list"))
    {
        return cst::children_of_kind(list, "parameter").len();
    }
    // Bare `x => ...` form: a lone identifier before the arrow.
    if cst::first_child_of_kind(lambda, "identifier").is_some() {
        1
    } else {
        0
    }
}

fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).last()
}

/// The file's existing line ending, for inserted lines.
fn line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Type arguments as declared inside the angle brackets of a display
/// string: `IMapper<TIn, TOut>` → `["TIn", "TOut"]`.
fn declared_type_arguments(display: &str) -> Vec<String> {
    match display.find('<') {
        Some(open) if display.ends_with('>') => {
            split_type_arguments(&display[open + 1..display.len() - 1])
        }
        _ => Vec::new(),
    }
}

/// Byte range (trimmed) of the `index`-th top-level type argument within a
/// type reference's text.
fn type_argument_range(text: &str, index: usize) -> Option<(usize, usize)> {
    let open = text.find('<')?;
    if !text.ends_with('>') {
        return None;
    }
    let inner_start = open + 1;
    let inner_end = text.len() - 1;
    let mut depth = 0usize;
    let mut current = 0usize;
    let mut start = inner_start;
    for (offset, ch) in text[inner_start..inner_end].char_indices() {
        let at = inner_start + offset;
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                if current == index {
                    return Some(trim_range(text, start, at));
                }
                current += 1;
                start = at + 1;
            }
            _ => {}
        }
    }
    (current == index).then(|| trim_range(text, start, inner_end))
}

fn trim_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    (start + leading, end - trailing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asyncify_syntax::parse_source;

    #[test]
    fn test_type_argument_range() {
        let text = "IMapper<User, Dto>";
        assert_eq!(type_argument_range(text, 0), Some((8, 12)));
        assert_eq!(&text[8..12], "User");
        assert_eq!(type_argument_range(text, 1), Some((14, 17)));
        assert_eq!(&text[14..17], "Dto");
        assert_eq!(type_argument_range(text, 2), None);
        assert_eq!(type_argument_range("IMapper", 0), None);
    }

    #[test]
    fn test_type_argument_range_nested() {
        let text = "IMapper<Dictionary<int, string>, Dto>";
        let (s, e) = type_argument_range(text, 0).unwrap();
        assert_eq!(&text[s..e], "Dictionary<int, string>");
        let (s, e) = type_argument_range(text, 1).unwrap();
        assert_eq!(&text[s..e], "Dto");
    }

    #[test]
    fn test_declared_type_arguments() {
        assert_eq!(
            declared_type_arguments("IMapper<TIn, TOut>"),
            vec!["TIn", "TOut"]
        );
        assert!(declared_type_arguments("IStore").is_empty());
    }

    #[test]
    fn test_lambda_parameter_count() {
        let file = parse_source(
            "a.cs",
            "class C { void M() { F(() => G()); F(x => G(x)); F((a, b) => G(a)); } }".to_string(),
        )
        .unwrap();
        let lambdas = cst::descendants(
            file.root(),
            &|n| n.kind() == "lambda_expression",
            &|_| false,
        );
        assert_eq!(lambdas.len(), 3);
        assert_eq!(lambda_parameter_count(lambdas[0]), 0);
        assert_eq!(lambda_parameter_count(lambdas[1]), 1);
        assert_eq!(lambda_parameter_count(lambdas[2]), 2);
    }

    #[test]
    fn test_unwrap_wrapper_argument_shapes() {
        let src = "class C { void M() { \
                   Run(() => Inner()); \
                   Run(() => { return Inner(); }); \
                   Run(x => Inner(x)); \
                   Run(42); \
                   Run(() => { foo(); return Inner(); return Other(); }); } }";
        let file = parse_source("a.cs", src.to_string()).unwrap();
        let invocations: Vec<_> = cst::descendants(
            file.root(),
            &|n| n.kind() == "invocation_expression",
            &|n| n.kind() == "lambda_expression",
        )
        .into_iter()
        .filter(|n| file.node_text(*n).starts_with("Run("))
        .collect();
        assert_eq!(invocations.len(), 5);
        assert_eq!(
            unwrap_wrapper_argument(&file, invocations[0]).as_deref(),
            Some("Inner()")
        );
        assert_eq!(
            unwrap_wrapper_argument(&file, invocations[1]).as_deref(),
            Some("Inner()")
        );
        assert_eq!(
            unwrap_wrapper_argument(&file, invocations[2]).as_deref(),
            Some("Inner(x)")
        );
        assert_eq!(unwrap_wrapper_argument(&file, invocations[3]), None);
        // Several returns: the first one decides.
        assert_eq!(
            unwrap_wrapper_argument(&file, invocations[4]).as_deref(),
            Some("Inner()")
        );
    }
}
