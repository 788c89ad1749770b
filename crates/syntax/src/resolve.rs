//! The compilation index and invocation target resolution.
//!
//! Binding is intentionally lightweight: receivers resolve through declared
//! types of locals, parameters, fields, and properties; overloads
//! disambiguate by argument count; anything else is reported as unresolved
//! and skipped by the caller.

use std::collections::HashMap;
use std::path::PathBuf;

use tree_sitter::Node;

use crate::cst;
use crate::model::{collect_types, strip_type_arguments, MethodInfo, TypeInfo, TypeKind};
use crate::parse::ParsedFile;

/// Index of a method within a [`Compilation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRef {
    pub type_index: usize,
    pub method_index: usize,
}

/// A method declaration located in a live parse tree.
pub struct MethodSite<'t> {
    pub method: MethodRef,
    pub node: Node<'t>,
}

/// A type declaration located in a live parse tree.
pub struct TypeSite<'t> {
    pub type_index: usize,
    pub node: Node<'t>,
}

/// All parsed files of a project plus the semantic index built over them.
pub struct Compilation {
    files: Vec<ParsedFile>,
    types: Vec<TypeInfo>,
    /// Base type name (no arity, no namespace) → type indices.
    by_base_name: HashMap<String, Vec<usize>>,
    /// File → type indices in collection order, for re-walking files.
    by_file: HashMap<PathBuf, Vec<usize>>,
}

impl Compilation {
    /// Build the index. Files are sorted by path so type and method indices
    /// are deterministic regardless of discovery order.
    pub fn new(mut files: Vec<ParsedFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut types: Vec<TypeInfo> = Vec::new();
        for file in &files {
            for collected in collect_types(file) {
                types.push(collected.info);
            }
        }

        // Canonical displays: short form, namespace-qualified only when two
        // analyzed types collide on the short form.
        let mut short_counts: HashMap<String, usize> = HashMap::new();
        for t in &types {
            *short_counts.entry(t.short_display()).or_insert(0) += 1;
        }
        for t in &mut types {
            let short = t.short_display();
            t.display = if short_counts[&short] > 1 && !t.namespace.is_empty() {
                format!("{}.{}", t.namespace, short)
            } else {
                short
            };
            for m in &mut t.methods {
                m.containing_type = t.display.clone();
            }
        }

        let mut by_base_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_file: HashMap<PathBuf, Vec<usize>> = HashMap::new();
        for (i, t) in types.iter().enumerate() {
            let base = t.name.rsplit('.').next().unwrap_or(&t.name).to_string();
            by_base_name.entry(base).or_default().push(i);
            by_file.entry(t.file.clone()).or_default().push(i);
        }

        Self {
            files,
            types,
            by_base_name,
            by_file,
        }
    }

    pub fn files(&self) -> &[ParsedFile] {
        &self.files
    }

    pub fn types(&self) -> &[TypeInfo] {
        &self.types
    }

    pub fn type_info(&self, index: usize) -> &TypeInfo {
        &self.types[index]
    }

    pub fn method(&self, r: MethodRef) -> &MethodInfo {
        &self.types[r.type_index].methods[r.method_index]
    }

    pub fn identity(&self, r: MethodRef) -> String {
        self.method(r).identity()
    }

    /// Resolve a type reference as written in source (`Mapper<A, B>`,
    /// `App.Models.User`) to a declared type. Matching is by base name, then
    /// arity, then namespace qualifier when one was written.
    pub fn find_type(&self, reference: &str) -> Option<usize> {
        let (stripped, arity) = strip_type_arguments(reference);
        let (qualifier, base) = match stripped.rfind('.') {
            Some(dot) => (&stripped[..dot], &stripped[dot + 1..]),
            None => ("", stripped),
        };
        let candidates = self.by_base_name.get(base)?;
        let mut matches: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| {
                let t = &self.types[i];
                let arity_ok = t.type_parameters.len() == arity;
                let ns_ok = qualifier.is_empty()
                    || t.namespace == qualifier
                    || t.namespace.ends_with(&format!(".{qualifier}"))
                    || t.name.starts_with(&format!("{qualifier}."));
                arity_ok && ns_ok
            })
            .collect();
        if matches.is_empty() {
            // Tolerate arity mismatch for unconstructed references.
            matches = candidates
                .iter()
                .copied()
                .filter(|&i| {
                    qualifier.is_empty() || self.types[i].namespace == qualifier
                })
                .collect();
        }
        matches.first().copied()
    }

    /// Interfaces implemented by a type, transitively through its base list
    /// (including interfaces inherited via base classes). Deterministic
    /// order, duplicates removed.
    pub fn transitive_interfaces(&self, type_index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut queue = vec![type_index];
        let mut seen = vec![type_index];
        while let Some(current) = queue.pop() {
            for base in &self.types[current].base_types {
                let Some(bi) = self.find_type(base) else { continue };
                if seen.contains(&bi) {
                    continue;
                }
                seen.push(bi);
                if self.types[bi].kind == TypeKind::Interface {
                    out.push(bi);
                }
                queue.push(bi);
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Find a method on a type by name and argument count. Exact-arity
    /// overloads win; otherwise the first declaration with the name is
    /// returned (optional parameters make the count a lower bound).
    pub fn method_on_type(&self, type_index: usize, name: &str, argc: usize) -> Option<MethodRef> {
        let t = &self.types[type_index];
        let named: Vec<usize> = t
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == name && !m.is_local_function)
            .map(|(i, _)| i)
            .collect();
        let chosen = named
            .iter()
            .copied()
            .find(|&i| t.methods[i].arity() == argc)
            .or_else(|| named.first().copied())?;
        Some(MethodRef {
            type_index,
            method_index: chosen,
        })
    }

    /// Base classes of a type, nearest first, cycle-safe.
    pub fn base_classes(&self, type_index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = type_index;
        loop {
            let next = self.types[current].base_types.iter().find_map(|b| {
                self.find_type(b)
                    .filter(|&i| self.types[i].kind == TypeKind::Class)
            });
            match next {
                Some(base) if base != type_index && !out.contains(&base) => {
                    out.push(base);
                    current = base;
                }
                _ => break,
            }
        }
        out
    }

    /// Method lookup on a type, falling through to its base classes and
    /// then its transitive interfaces. Interface receivers bind to the
    /// interface member.
    fn method_on_type_or_bases(
        &self,
        type_index: usize,
        name: &str,
        argc: usize,
    ) -> Option<MethodRef> {
        if let Some(r) = self.method_on_type(type_index, name, argc) {
            return Some(r);
        }
        for base in self.base_classes(type_index) {
            if let Some(r) = self.method_on_type(base, name, argc) {
                return Some(r);
            }
        }
        for iface in self.transitive_interfaces(type_index) {
            if let Some(r) = self.method_on_type(iface, name, argc) {
                return Some(r);
            }
        }
        None
    }

    /// Interface members this method implements: the explicit interface of
    /// an explicit implementation, plus every member of the containing
    /// type's transitive interface set whose name and arity this method
    /// satisfies. Deterministic, deduplicated.
    pub fn implemented_interface_methods(&self, r: MethodRef) -> Vec<MethodRef> {
        let t = &self.types[r.type_index];
        let m = &t.methods[r.method_index];
        if t.kind == TypeKind::Interface || m.is_local_function {
            return Vec::new();
        }

        let mut out: Vec<MethodRef> = Vec::new();
        if let Some(explicit) = &m.explicit_interface {
            if let Some(ti) = self.find_type(explicit) {
                if let Some(im) = self.method_on_type(ti, &m.name, m.arity()) {
                    out.push(im);
                }
            }
        }
        if m.explicit_interface.is_none() {
            for iface in self.transitive_interfaces(r.type_index) {
                for (i, member) in self.types[iface].methods.iter().enumerate() {
                    if member.name == m.name && member.arity() == m.arity() {
                        let candidate = MethodRef {
                            type_index: iface,
                            method_index: i,
                        };
                        if !out.contains(&candidate) {
                            out.push(candidate);
                        }
                    }
                }
            }
        }
        out
    }

    /// Every implementation of an interface member across the compilation.
    pub fn implementations_of(&self, interface_member: MethodRef) -> Vec<MethodRef> {
        let mut out = Vec::new();
        for (ti, t) in self.types.iter().enumerate() {
            if t.kind == TypeKind::Interface {
                continue;
            }
            for mi in 0..t.methods.len() {
                let r = MethodRef {
                    type_index: ti,
                    method_index: mi,
                };
                if self.implemented_interface_methods(r).contains(&interface_member) {
                    out.push(r);
                }
            }
        }
        out
    }

    /// Locate every method declaration of a file in its live parse tree,
    /// paired with the compilation-wide [`MethodRef`].
    pub fn method_sites<'t>(&self, file: &'t ParsedFile) -> Vec<MethodSite<'t>> {
        let Some(indices) = self.by_file.get(&file.path) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        // collect_types is deterministic, so the k-th collected type of a
        // file is the k-th type index recorded for it at build time.
        for (collected, &type_index) in collect_types(file).into_iter().zip(indices) {
            for (method_index, node) in collected.method_nodes.into_iter().enumerate() {
                out.push(MethodSite {
                    method: MethodRef {
                        type_index,
                        method_index,
                    },
                    node,
                });
            }
        }
        out
    }

    /// Locate every type declaration of a file in its live parse tree.
    pub fn type_sites<'t>(&self, file: &'t ParsedFile) -> Vec<TypeSite<'t>> {
        let Some(indices) = self.by_file.get(&file.path) else {
            return Vec::new();
        };
        collect_types(file)
            .into_iter()
            .zip(indices)
            .map(|(collected, &type_index)| TypeSite {
                type_index,
                node: collected.node,
            })
            .collect()
    }

    /// Resolve the target of an invocation expression found inside the body
    /// of `site` to a declared method. Returns `None` for anything the
    /// lightweight binder cannot see; callers skip those.
    pub fn resolve_invocation(
        &self,
        file: &ParsedFile,
        invocation: Node<'_>,
        site: MethodRef,
    ) -> Option<MethodRef> {
        let function = invocation.child_by_field_name("function")?;
        let argc = invocation
            .child_by_field_name("arguments")
            .map(|args| {
                let mut cursor = args.walk();
                args.named_children(&mut cursor).count()
            })
            .unwrap_or(0);

        match function.kind() {
            "identifier" | "generic_name" => {
                let name = callee_name(function, file)?;
                // Local functions declared within the enclosing method
                // shadow type members.
                let enclosing = self.method(site);
                let t = &self.types[site.type_index];
                if let Some((i, _)) = t.methods.iter().enumerate().find(|(_, m)| {
                    m.is_local_function
                        && m.name == name
                        && m.file == enclosing.file
                        && m.start_line >= enclosing.start_line
                        && m.end_line <= enclosing.end_line
                }) {
                    return Some(MethodRef {
                        type_index: site.type_index,
                        method_index: i,
                    });
                }
                if let Some(r) = self.method_on_type_or_bases(site.type_index, &name, argc) {
                    return Some(r);
                }
                // Nested types can call methods of their enclosing types.
                let mut outer = self.types[site.type_index].name.as_str();
                while let Some(dot) = outer.rfind('.') {
                    outer = &outer[..dot];
                    if let Some(oi) = self.find_type(outer) {
                        if let Some(r) = self.method_on_type_or_bases(oi, &name, argc) {
                            return Some(r);
                        }
                    }
                }
                None
            }
            "member_access_expression" => {
                let name = callee_name(function.child_by_field_name("name")?, file)?;
                let receiver = function.child_by_field_name("expression")?;
                let type_index = self.resolve_receiver_type(file, receiver, site)?;
                self.method_on_type_or_bases(type_index, &name, argc)
            }
            _ => None,
        }
    }

    /// Declared type of a receiver expression, when statically visible.
    fn resolve_receiver_type(
        &self,
        file: &ParsedFile,
        receiver: Node<'_>,
        site: MethodRef,
    ) -> Option<usize> {
        match receiver.kind() {
            "this_expression" => Some(site.type_index),
            "base_expression" => self.base_classes(site.type_index).first().copied(),
            "identifier" => {
                let name = file.node_text(receiver);
                let method = self.method(site);
                if let Some(p) = method.parameters.iter().find(|p| p.name == name) {
                    return self.find_type(&p.ty);
                }
                if let Some(ty) = local_declaration_type(file, receiver, name) {
                    return self.find_type(&ty);
                }
                if let Some((_, ty)) = self.types[site.type_index]
                    .members
                    .iter()
                    .find(|(n, _)| n.as_str() == name)
                {
                    return self.find_type(ty);
                }
                // Otherwise treat the identifier as a type name (static call).
                self.find_type(name)
            }
            // Qualified type name (`App.Models.Cache.Get(...)`).
            "member_access_expression" | "qualified_name" => {
                self.find_type(file.node_text(receiver))
            }
            _ => {
                tracing::debug!(
                    kind = receiver.kind(),
                    file = %file.path.display(),
                    line = cst::line_of(receiver),
                    "unresolved receiver"
                );
                None
            }
        }
    }
}

/// Name of a callee node: the identifier itself, or the identifier part of
/// a generic name (`M<int>` → `M`).
fn callee_name(node: Node<'_>, file: &ParsedFile) -> Option<String> {
    match node.kind() {
        "identifier" => Some(file.node_text(node).to_string()),
        "generic_name" => {
            let ident = cst::first_child_of_kind(node, "identifier")?;
            Some(file.node_text(ident).to_string())
        }
        _ => None,
    }
}

/// Walk outward from an identifier use to the method body, then scan the
/// body's local declarations for the name. Explicit types are taken as
/// written; `var` is inferred only from a `new T(...)` initializer.
fn local_declaration_type(file: &ParsedFile, usage: Node<'_>, name: &str) -> Option<String> {
    let mut body = usage;
    while let Some(parent) = body.parent() {
        body = parent;
        if matches!(
            body.kind(),
            "method_declaration" | "local_function_statement"
        ) {
            break;
        }
    }
    let declarations = cst::descendants(
        body,
        &|n| n.kind() == "variable_declaration",
        &|_| false,
    );
    for decl in declarations {
        let Some(ty) = decl.child_by_field_name("type") else { continue };
        let ty_text = file.node_text(ty).trim().to_string();
        for declarator in cst::children_of_kind(decl, "variable_declarator") {
            let ident = declarator
                .child_by_field_name("name")
                .or_else(|| cst::first_child_of_kind(declarator, "identifier"));
            let Some(ident) = ident else { continue };
            if file.node_text(ident) != name {
                continue;
            }
            if ty_text != "var" {
                return Some(ty_text);
            }
            return object_creation_type(file, declarator);
        }
    }
    None
}

/// `var x = new Repo(...)` → `Repo`.
fn object_creation_type(file: &ParsedFile, declarator: Node<'_>) -> Option<String> {
    let creation = cst::descendants(
        declarator,
        &|n| n.kind() == "object_creation_expression",
        &|n| n.kind() == "lambda_expression",
    )
    .into_iter()
    .next()?;
    let ty = creation.child_by_field_name("type")?;
    Some(file.node_text(ty).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;
    use pretty_assertions::assert_eq;

    fn compile(sources: &[(&str, &str)]) -> Compilation {
        let files = sources
            .iter()
            .map(|(path, text)| parse_source(*path, text.to_string()).unwrap())
            .collect();
        Compilation::new(files)
    }

    fn resolve_all(comp: &Compilation) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for file in comp.files() {
            for site in comp.method_sites(file) {
                let body = site.node.child_by_field_name("body").or_else(|| {
                    cst::first_child_of_kind(site.node, "arrow_expression_clause")
                });
                let Some(body) = body else { continue };
                for inv in cst::descendants(
                    body,
                    &|n| n.kind() == "invocation_expression",
                    &|n| {
                        matches!(
                            n.kind(),
                            "lambda_expression"
                                | "anonymous_method_expression"
                                | "local_function_statement"
                        )
                    },
                ) {
                    if let Some(target) = comp.resolve_invocation(file, inv, site.method) {
                        out.push((comp.identity(site.method), comp.identity(target)));
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_resolve_same_class_call() {
        let comp = compile(&[("a.cs", "class C { void A() { B(); } void B() { } }")]);
        let edges = resolve_all(&comp);
        assert_eq!(edges, vec![("C.A()".to_string(), "C.B()".to_string())]);
    }

    #[test]
    fn test_resolve_through_field_receiver() {
        let comp = compile(&[(
            "a.cs",
            "class Repo { public int Load() { return 1; } }
             class Service { private Repo _repo; int Get() { return _repo.Load(); } }",
        )]);
        let edges = resolve_all(&comp);
        assert_eq!(
            edges,
            vec![("Service.Get()".to_string(), "Repo.Load()".to_string())]
        );
    }

    #[test]
    fn test_resolve_through_local_and_parameter() {
        let comp = compile(&[(
            "a.cs",
            "class Repo { public int Load() { return 1; } }
             class S {
                 int FromLocal() { Repo r = Make(); return r.Load(); }
                 int FromParam(Repo r) { return r.Load(); }
                 Repo Make() { return null; }
             }",
        )]);
        let edges = resolve_all(&comp);
        assert!(edges.contains(&("S.FromLocal()".to_string(), "Repo.Load()".to_string())));
        assert!(edges.contains(&("S.FromParam(Repo)".to_string(), "Repo.Load()".to_string())));
    }

    #[test]
    fn test_resolve_static_call_via_type_name() {
        let comp = compile(&[(
            "a.cs",
            "class Cache { public static void Clear() { } }
             class S { void M() { Cache.Clear(); } }",
        )]);
        let edges = resolve_all(&comp);
        assert_eq!(
            edges,
            vec![("S.M()".to_string(), "Cache.Clear()".to_string())]
        );
    }

    #[test]
    fn test_resolve_interface_receiver_binds_to_interface_member() {
        let comp = compile(&[(
            "a.cs",
            "interface IStore { int Read(); }
             class Store : IStore { public int Read() { return 0; } }
             class S { int M(IStore s) { return s.Read(); } }",
        )]);
        let edges = resolve_all(&comp);
        assert!(edges.contains(&("S.M(IStore)".to_string(), "IStore.Read()".to_string())));
    }

    #[test]
    fn test_resolve_local_function_call() {
        let comp = compile(&[(
            "a.cs",
            "class C { void M() { Helper(); void Helper() { } } }",
        )]);
        let edges = resolve_all(&comp);
        assert_eq!(edges, vec![("C.M()".to_string(), "C.Helper()".to_string())]);
    }

    #[test]
    fn test_unresolvable_invocation_is_skipped() {
        let comp = compile(&[(
            "a.cs",
            "class C { void M() { Console.WriteLine(\"hi\"); } }",
        )]);
        assert!(resolve_all(&comp).is_empty());
    }

    #[test]
    fn test_generic_method_instantiation_shares_identity() {
        let comp = compile(&[(
            "a.cs",
            "class C { T Echo<T>(T x) { return x; } void M() { Echo<int>(1); } }",
        )]);
        let edges = resolve_all(&comp);
        assert_eq!(
            edges,
            vec![("C.M()".to_string(), "C.Echo(T)".to_string())]
        );
    }

    #[test]
    fn test_overload_disambiguation_by_argument_count() {
        let comp = compile(&[(
            "a.cs",
            "class C { void F() { } void F(int x) { } void M() { F(1); } }",
        )]);
        let edges = resolve_all(&comp);
        assert_eq!(edges, vec![("C.M()".to_string(), "C.F(int)".to_string())]);
    }

    #[test]
    fn test_implemented_interface_methods_implicit() {
        let comp = compile(&[(
            "a.cs",
            "interface IStore { int Read(); }
             class Store : IStore { public int Read() { return 0; } }",
        )]);
        let store = comp
            .types()
            .iter()
            .position(|t| t.name == "Store")
            .unwrap();
        let refs = comp.implemented_interface_methods(MethodRef {
            type_index: store,
            method_index: 0,
        });
        assert_eq!(refs.len(), 1);
        assert_eq!(comp.identity(refs[0]), "IStore.Read()");
    }

    #[test]
    fn test_implemented_interface_methods_explicit() {
        let comp = compile(&[(
            "a.cs",
            "interface IFoo { void Bar(); }
             class C : IFoo { void IFoo.Bar() { } }",
        )]);
        let c = comp.types().iter().position(|t| t.name == "C").unwrap();
        let refs = comp.implemented_interface_methods(MethodRef {
            type_index: c,
            method_index: 0,
        });
        assert_eq!(refs.len(), 1);
        assert_eq!(comp.identity(refs[0]), "IFoo.Bar()");
    }

    #[test]
    fn test_implementations_of_interface_member() {
        let comp = compile(&[(
            "a.cs",
            "interface IStore { int Read(); }
             class A : IStore { public int Read() { return 1; } }
             class B : IStore { public int Read() { return 2; } }",
        )]);
        let iface = comp
            .types()
            .iter()
            .position(|t| t.name == "IStore")
            .unwrap();
        let impls = comp.implementations_of(MethodRef {
            type_index: iface,
            method_index: 0,
        });
        let names: Vec<String> = impls.iter().map(|r| comp.identity(*r)).collect();
        assert_eq!(names, vec!["A.Read()", "B.Read()"]);
    }

    #[test]
    fn test_nested_type_calls_enclosing_type_method() {
        let comp = compile(&[(
            "a.cs",
            "class Outer {
                 static int Shared() { return 1; }
                 class Inner { int M() { return Shared(); } }
             }",
        )]);
        let edges = resolve_all(&comp);
        assert!(edges.contains(&(
            "Outer.Inner.M()".to_string(),
            "Outer.Shared()".to_string()
        )));
    }

    #[test]
    fn test_resolve_inherited_method_through_base_class() {
        let comp = compile(&[(
            "a.cs",
            "class ServiceBase { protected void Log(string msg) { } }
             class Service : ServiceBase { void M() { Log(\"hi\"); } }",
        )]);
        let edges = resolve_all(&comp);
        assert_eq!(
            edges,
            vec![("Service.M()".to_string(), "ServiceBase.Log(string)".to_string())]
        );
    }

    #[test]
    fn test_resolve_base_receiver() {
        let comp = compile(&[(
            "a.cs",
            "class ServiceBase { protected virtual void Init() { } }
             class Service : ServiceBase { protected override void Init() { base.Init(); } }",
        )]);
        let edges = resolve_all(&comp);
        assert!(edges.contains(&(
            "Service.Init()".to_string(),
            "ServiceBase.Init()".to_string()
        )));
    }

    #[test]
    fn test_resolve_var_with_object_creation_initializer() {
        let comp = compile(&[(
            "a.cs",
            "class Repo { public int Load() { return 1; } }
             class S { int M() { var r = new Repo(); return r.Load(); } }",
        )]);
        let edges = resolve_all(&comp);
        assert!(edges.contains(&("S.M()".to_string(), "Repo.Load()".to_string())));
    }

    #[test]
    fn test_var_without_creation_initializer_stays_unresolved() {
        let comp = compile(&[(
            "a.cs",
            "class Repo { public int Load() { return 1; } }
             class S { int M() { var r = Make(); return r.Load(); } object Make() { return null; } }",
        )]);
        let edges = resolve_all(&comp);
        assert!(!edges.contains(&("S.M()".to_string(), "Repo.Load()".to_string())));
    }

    #[test]
    fn test_display_disambiguation_on_collision() {
        let comp = compile(&[(
            "a.cs",
            "namespace One { class Dup { void M() { } } }
             namespace Two { class Dup { void M() { } } }",
        )]);
        let displays: Vec<&str> = comp.types().iter().map(|t| t.display.as_str()).collect();
        assert!(displays.contains(&"One.Dup"));
        assert!(displays.contains(&"Two.Dup"));
    }

    #[test]
    fn test_transitive_interfaces_through_base_class() {
        let comp = compile(&[(
            "a.cs",
            "interface IBase { void M(); }
             interface IDerived : IBase { void N(); }
             class Mid : IDerived { public void M() { } public void N() { } }
             class Leaf : Mid { }",
        )]);
        let leaf = comp.types().iter().position(|t| t.name == "Leaf").unwrap();
        let ifaces = comp.transitive_interfaces(leaf);
        let names: Vec<&str> = ifaces.iter().map(|&i| comp.types()[i].name.as_str()).collect();
        assert!(names.contains(&"IBase"));
        assert!(names.contains(&"IDerived"));
    }
}
