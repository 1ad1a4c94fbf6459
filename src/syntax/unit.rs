//! An owned index of one compilation unit: package, imports, declared types and their members,
//! plus scope-aware variable lookup on the live tree.

use std::collections::BTreeSet;

use tree_sitter::Node;

use super::{ParsedSource, Span, ancestors, named_children, text_of};

const JAVA_LANG_TYPES: &[&str] = &[
    "Boolean",
    "Byte",
    "Character",
    "Class",
    "Double",
    "Enum",
    "Error",
    "Exception",
    "Float",
    "IllegalArgumentException",
    "IllegalStateException",
    "Integer",
    "Iterable",
    "Long",
    "Math",
    "NullPointerException",
    "Number",
    "Object",
    "Runnable",
    "RuntimeException",
    "Short",
    "String",
    "StringBuilder",
    "System",
    "Thread",
    "Throwable",
    "UnsupportedOperationException",
    "Void",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Dotted path without `static`, `.*` or the trailing semicolon.
    pub path: String,
    pub is_static: bool,
    pub wildcard: bool,
    pub span: Span,
}

impl ImportDecl {
    /// Last path segment, i.e. the imported type or static member name.
    pub fn simple_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_constructor: bool,
    pub params: Vec<Param>,
    pub return_type: String,
    pub annotations: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub ty: String,
    pub names: Vec<String>,
    pub annotations: Vec<String>,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    /// Dotted nesting path inside the file, e.g. `Outer.Inner`.
    pub path: String,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub has_superclass: bool,
    pub methods: Vec<MethodDecl>,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
    pub body: Span,
}

impl TypeDecl {
    pub fn is_top_level(&self) -> bool {
        !self.path.contains('.')
    }
}

/// A type reference resolved against the compilation unit, without a classpath.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeRef {
    pub qualified: String,
    /// Qualified name minus the package portion.
    pub path: String,
    /// How generated code spells the type.
    pub display: String,
    pub declared: bool,
}

impl TypeRef {
    pub fn simple(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableOrigin {
    Local,
    Parameter,
    Resource,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: String,
    pub annotations: Vec<String>,
    pub origin: VariableOrigin,
}

#[derive(Debug, Clone, Default)]
pub struct JavaUnit {
    package: Option<String>,
    imports: Vec<ImportDecl>,
    types: Vec<TypeDecl>,
    identifiers: BTreeSet<String>,
}

impl JavaUnit {
    pub fn index(parsed: &ParsedSource) -> Self {
        let source = parsed.text();
        let root = parsed.root();
        let mut unit = Self::default();

        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    unit.package = named_children(child)
                        .into_iter()
                        .find(|node| matches!(node.kind(), "scoped_identifier" | "identifier"))
                        .map(|node| text_of(node, source).to_string());
                }
                "import_declaration" => unit.imports.push(index_import(child, source)),
                _ => {}
            }
        }

        collect_types(named_children(root), source, "", &mut unit.types);
        collect_identifiers(root, source, &mut unit.identifiers);
        unit
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn imports(&self) -> &[ImportDecl] {
        &self.imports
    }

    pub fn types(&self) -> &[TypeDecl] {
        &self.types
    }

    /// Every identifier spelled anywhere in the file.
    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    pub fn type_by_path(&self, path: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|decl| decl.path == path)
    }

    /// Innermost declared type whose body contains `offset`.
    pub fn type_at(&self, offset: usize) -> Option<&TypeDecl> {
        self.types
            .iter()
            .filter(|decl| decl.body.contains_offset(offset))
            .max_by_key(|decl| decl.body.start)
    }

    /// Resolves `text` as seen from the type whose path is `context`.
    pub fn resolve_type(&self, text: &str, context: Option<&str>) -> TypeRef {
        let base = erase_type(text);

        if let Some(decl) = self.lookup_declared(&base, context) {
            return self.declared_ref(decl);
        }

        let (first, rest) = match base.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (base.as_str(), None),
        };

        if let Some(import) = self
            .imports
            .iter()
            .find(|import| !import.is_static && !import.wildcard && import.simple_name() == first)
        {
            let qualified = match rest {
                Some(rest) => format!("{}.{rest}", import.path),
                None => import.path.clone(),
            };
            let (_, path) = split_qualified(&qualified);
            return TypeRef {
                path,
                display: base.clone(),
                qualified,
                declared: false,
            };
        }

        if rest.is_some() && starts_lowercase(first) {
            let (_, path) = split_qualified(&base);
            return TypeRef {
                display: base.clone(),
                qualified: base.clone(),
                path,
                declared: false,
            };
        }

        let qualified = if rest.is_none() && JAVA_LANG_TYPES.contains(&first) {
            format!("java.lang.{base}")
        } else {
            match self.package.as_deref() {
                Some(package) => format!("{package}.{base}"),
                None => base.clone(),
            }
        };
        TypeRef {
            qualified,
            path: base.clone(),
            display: base,
            declared: false,
        }
    }

    /// `true` when `name` spells a type declared in or explicitly imported into the file.
    pub fn names_type(&self, name: &str, context: Option<&str>) -> bool {
        let base = erase_type(name);
        if self.lookup_declared(&base, context).is_some() {
            return true;
        }
        let first = base.split('.').next().unwrap_or(&base);
        self.imports
            .iter()
            .any(|import| !import.is_static && !import.wildcard && import.simple_name() == first)
    }

    fn declared_ref(&self, decl: &TypeDecl) -> TypeRef {
        let qualified = match self.package.as_deref() {
            Some(package) => format!("{package}.{}", decl.path),
            None => decl.path.clone(),
        };
        TypeRef {
            qualified,
            path: decl.path.clone(),
            display: decl.path.clone(),
            declared: true,
        }
    }

    fn lookup_declared(&self, base: &str, context: Option<&str>) -> Option<&TypeDecl> {
        let relative = match self.package.as_deref() {
            Some(package) => base
                .strip_prefix(package)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(base),
            None => base,
        };

        if let Some(context) = context {
            let mut scope = Some(context);
            while let Some(current) = scope {
                let candidate = format!("{current}.{relative}");
                if let Some(decl) = self.type_by_path(&candidate) {
                    return Some(decl);
                }
                scope = current.rsplit_once('.').map(|(outer, _)| outer);
            }
        }

        if let Some(decl) = self.type_by_path(relative) {
            return Some(decl);
        }

        if !relative.contains('.') {
            return self.types.iter().find(|decl| decl.name == relative);
        }
        None
    }
}

/// Drops generic arguments, array dimensions, varargs and whitespace from a type spelling.
pub fn erase_type(text: &str) -> String {
    let mut erased = String::with_capacity(text.len());
    let mut depth = 0usize;
    for character in text.chars() {
        match character {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            '[' | ']' => {}
            character if character.is_whitespace() => {}
            character => erased.push(character),
        }
    }
    erased.trim_end_matches('.').to_string()
}

/// Splits `com.acme.Outer.Inner` into (`com.acme`, `Outer.Inner`) at the first capitalized segment.
pub fn split_qualified(qualified: &str) -> (String, String) {
    let segments: Vec<&str> = qualified.split('.').collect();
    let type_start = segments
        .iter()
        .position(|segment| !starts_lowercase(segment))
        .unwrap_or(segments.len().saturating_sub(1));
    (
        segments[..type_start].join("."),
        segments[type_start..].join("."),
    )
}

fn starts_lowercase(segment: &str) -> bool {
    segment
        .chars()
        .next()
        .is_some_and(|character| character.is_ascii_lowercase())
}

fn index_import(node: Node<'_>, source: &str) -> ImportDecl {
    let mut is_static = false;
    let mut wildcard = false;
    let mut path = String::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "static" => is_static = true,
            "asterisk" => wildcard = true,
            "scoped_identifier" | "identifier" => path = text_of(child, source).to_string(),
            _ => {}
        }
    }

    ImportDecl {
        path,
        is_static,
        wildcard,
        span: Span::of(node),
    }
}

fn collect_types(nodes: Vec<Node<'_>>, source: &str, outer: &str, types: &mut Vec<TypeDecl>) {
    for node in nodes {
        let kind = match node.kind() {
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            "annotation_type_declaration" => TypeKind::Annotation,
            _ => continue,
        };
        let (Some(name_node), Some(body)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("body"),
        ) else {
            continue;
        };

        let name = text_of(name_node, source).to_string();
        let path = if outer.is_empty() {
            name.clone()
        } else {
            format!("{outer}.{name}")
        };

        let members = member_nodes(body);
        let methods = members
            .iter()
            .filter(|member| {
                matches!(member.kind(), "method_declaration" | "constructor_declaration")
            })
            .map(|member| index_method(*member, source))
            .collect();
        let fields = members
            .iter()
            .filter(|member| matches!(member.kind(), "field_declaration" | "constant_declaration"))
            .map(|member| index_field(*member, source))
            .collect();

        types.push(TypeDecl {
            name,
            path: path.clone(),
            kind,
            is_abstract: has_modifier(node, "abstract"),
            has_superclass: node.child_by_field_name("superclass").is_some(),
            methods,
            fields,
            span: Span::of(node),
            body: Span::of(body),
        });

        collect_types(members, source, &path, types);
    }
}

/// Declarations inside a class, interface, enum or record body.
fn member_nodes(body: Node<'_>) -> Vec<Node<'_>> {
    let mut members = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            members.extend(named_children(child));
        } else {
            members.push(child);
        }
    }
    members
}

fn index_method(node: Node<'_>, source: &str) -> MethodDecl {
    let is_constructor = node.kind() == "constructor_declaration";
    let name = node
        .child_by_field_name("name")
        .map(|name| text_of(name, source).to_string())
        .unwrap_or_default();
    let return_type = node
        .child_by_field_name("type")
        .map(|ty| text_of(ty, source).to_string())
        .unwrap_or_default();
    let params = node
        .child_by_field_name("parameters")
        .map(|parameters| formal_parameters(parameters, source))
        .unwrap_or_default();
    let has_body = node.child_by_field_name("body").is_some();

    MethodDecl {
        name,
        is_static: has_modifier(node, "static"),
        is_abstract: has_modifier(node, "abstract")
            || (!is_constructor && !has_body && !has_modifier(node, "native")),
        is_constructor,
        params,
        return_type,
        annotations: declaration_annotations(node, source),
        span: Span::of(node),
    }
}

fn index_field(node: Node<'_>, source: &str) -> FieldDecl {
    let ty = node
        .child_by_field_name("type")
        .map(|ty| text_of(ty, source).to_string())
        .unwrap_or_default();
    let mut cursor = node.walk();
    let names = node
        .children_by_field_name("declarator", &mut cursor)
        .filter_map(|declarator| declarator.child_by_field_name("name"))
        .map(|name| text_of(name, source).to_string())
        .collect();

    FieldDecl {
        ty,
        names,
        annotations: declaration_annotations(node, source),
        is_static: has_modifier(node, "static"),
        span: Span::of(node),
    }
}

/// Parameters of a `formal_parameters` node, including a trailing varargs parameter.
pub fn formal_parameters(node: Node<'_>, source: &str) -> Vec<Param> {
    named_children(node)
        .into_iter()
        .filter_map(|parameter| match parameter.kind() {
            "formal_parameter" => {
                let ty = parameter.child_by_field_name("type")?;
                let name = parameter.child_by_field_name("name")?;
                Some(Param {
                    ty: text_of(ty, source).to_string(),
                    name: text_of(name, source).to_string(),
                })
            }
            "spread_parameter" => {
                let children = named_children(parameter);
                let ty = children
                    .iter()
                    .find(|child| !matches!(child.kind(), "modifiers" | "variable_declarator"))?;
                let name = children
                    .iter()
                    .find(|child| child.kind() == "variable_declarator")
                    .and_then(|declarator| declarator.child_by_field_name("name"))?;
                Some(Param {
                    ty: format!("{}...", text_of(*ty, source)),
                    name: text_of(name, source).to_string(),
                })
            }
            _ => None,
        })
        .collect()
}

fn modifiers_of(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind() == "modifiers")
}

pub fn has_modifier(node: Node<'_>, keyword: &str) -> bool {
    let Some(modifiers) = modifiers_of(node) else {
        return false;
    };
    let mut cursor = modifiers.walk();
    let found = modifiers
        .children(&mut cursor)
        .any(|child| child.kind() == keyword);
    found
}

/// Annotation names (as written, possibly qualified) on a declaration.
pub fn declaration_annotations(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(modifiers) = modifiers_of(node) else {
        return Vec::new();
    };
    named_children(modifiers)
        .into_iter()
        .filter(|child| matches!(child.kind(), "marker_annotation" | "annotation"))
        .filter_map(|annotation| annotation.child_by_field_name("name"))
        .map(|name| text_of(name, source).to_string())
        .collect()
}

fn collect_identifiers(node: Node<'_>, source: &str, identifiers: &mut BTreeSet<String>) {
    if matches!(node.kind(), "identifier" | "type_identifier") {
        identifiers.insert(text_of(node, source).to_string());
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_identifiers(child, source, identifiers);
    }
}

/// Innermost method or constructor declaration enclosing `node`.
pub fn enclosing_method(node: Node<'_>) -> Option<Node<'_>> {
    ancestors(node)
        .find(|ancestor| matches!(ancestor.kind(), "method_declaration" | "constructor_declaration"))
}

/// Resolves `name` as a variable visible at `at`: locals declared earlier in enclosing blocks,
/// resources, catch and loop variables, parameters, then fields of enclosing types.
pub fn visible_variable(at: Node<'_>, name: &str, source: &str) -> Option<Variable> {
    let mut child = at;
    for ancestor in ancestors(at) {
        let found = match ancestor.kind() {
            "block" | "constructor_body" | "switch_block_statement_group" => {
                named_children(ancestor)
                    .into_iter()
                    .take_while(|statement| statement.end_byte() <= child.start_byte())
                    .filter(|statement| statement.kind() == "local_variable_declaration")
                    .find_map(|statement| {
                        declared_variable(statement, name, source, VariableOrigin::Local)
                    })
            }
            "for_statement" => {
                let mut cursor = ancestor.walk();
                let found = ancestor
                    .children_by_field_name("init", &mut cursor)
                    .filter(|init| init.kind() == "local_variable_declaration")
                    .find_map(|init| declared_variable(init, name, source, VariableOrigin::Local));
                found
            }
            "enhanced_for_statement" => single_variable(ancestor, name, source, VariableOrigin::Local),
            "catch_clause" => named_children(ancestor)
                .into_iter()
                .find(|clause_child| clause_child.kind() == "catch_formal_parameter")
                .and_then(|parameter| {
                    let ty = named_children(parameter)
                        .into_iter()
                        .find(|node| node.kind() == "catch_type")?;
                    let declared = parameter.child_by_field_name("name")?;
                    (text_of(declared, source) == name).then(|| Variable {
                        name: name.to_string(),
                        ty: text_of(ty, source).to_string(),
                        annotations: Vec::new(),
                        origin: VariableOrigin::Local,
                    })
                }),
            "try_with_resources_statement" => ancestor
                .child_by_field_name("resources")
                .map(named_children)
                .unwrap_or_default()
                .into_iter()
                .filter(|resource| resource.end_byte() <= child.start_byte())
                .find_map(|resource| single_variable(resource, name, source, VariableOrigin::Resource)),
            "method_declaration" | "constructor_declaration" => ancestor
                .child_by_field_name("parameters")
                .and_then(|parameters| parameter_variable(parameters, name, source)),
            "lambda_expression" => ancestor
                .child_by_field_name("parameters")
                .and_then(|parameters| lambda_variable(parameters, name, source)),
            "class_body" | "enum_body_declarations" | "interface_body" => member_nodes(ancestor)
                .into_iter()
                .filter(|member| matches!(member.kind(), "field_declaration" | "constant_declaration"))
                .find_map(|member| declared_variable(member, name, source, VariableOrigin::Field)),
            _ => None,
        };
        if found.is_some() {
            return found;
        }
        child = ancestor;
    }
    None
}

fn declared_variable(
    declaration: Node<'_>,
    name: &str,
    source: &str,
    origin: VariableOrigin,
) -> Option<Variable> {
    let ty = declaration.child_by_field_name("type")?;
    let mut cursor = declaration.walk();
    let matches_name = declaration
        .children_by_field_name("declarator", &mut cursor)
        .filter_map(|declarator| declarator.child_by_field_name("name"))
        .any(|declared| text_of(declared, source) == name);
    matches_name.then(|| Variable {
        name: name.to_string(),
        ty: text_of(ty, source).to_string(),
        annotations: declaration_annotations(declaration, source),
        origin,
    })
}

fn single_variable(node: Node<'_>, name: &str, source: &str, origin: VariableOrigin) -> Option<Variable> {
    let declared = node.child_by_field_name("name")?;
    if text_of(declared, source) != name {
        return None;
    }
    let ty = node
        .child_by_field_name("type")
        .map(|ty| text_of(ty, source).to_string())
        .unwrap_or_else(|| "var".to_string());
    Some(Variable {
        name: name.to_string(),
        ty,
        annotations: declaration_annotations(node, source),
        origin,
    })
}

fn parameter_variable(parameters: Node<'_>, name: &str, source: &str) -> Option<Variable> {
    let params = formal_parameters(parameters, source);
    let index = params.iter().position(|param| param.name == name)?;
    let node = named_children(parameters)
        .into_iter()
        .filter(|node| matches!(node.kind(), "formal_parameter" | "spread_parameter"))
        .nth(index)?;
    Some(Variable {
        name: name.to_string(),
        ty: params[index].ty.clone(),
        annotations: declaration_annotations(node, source),
        origin: VariableOrigin::Parameter,
    })
}

fn lambda_variable(parameters: Node<'_>, name: &str, source: &str) -> Option<Variable> {
    match parameters.kind() {
        "identifier" => (text_of(parameters, source) == name).then(|| Variable {
            name: name.to_string(),
            ty: "var".to_string(),
            annotations: Vec::new(),
            origin: VariableOrigin::Parameter,
        }),
        "formal_parameters" => parameter_variable(parameters, name, source),
        _ => named_children(parameters)
            .into_iter()
            .any(|parameter| text_of(parameter, source) == name)
            .then(|| Variable {
                name: name.to_string(),
                ty: "var".to_string(),
                annotations: Vec::new(),
                origin: VariableOrigin::Parameter,
            }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{JavaUnit, TypeKind, VariableOrigin, erase_type, split_qualified, visible_variable};
    use crate::syntax::ParsedSource;

    const SOURCE: &str = r#"package com.acme;

import com.foo.Gateway;
import java.util.*;
import static org.junit.Assert.assertEquals;

public class ServiceTest {
    @Mocked
    private Gateway gateway;

    @Test
    public void run(String label) {
        int count = 1;
        try (AutoCloseable handle = open()) {
            call(count, label, handle, gateway);
        }
        int late = 2;
    }

    public static class Helper {
        public static int twice(int value) {
            return value * 2;
        }

        public String name() {
            return "helper";
        }
    }

    interface Port {
        void send(String message);
    }
}
"#;

    fn parse() -> ParsedSource {
        ParsedSource::parse(SOURCE.to_string()).expect("fixture should parse")
    }

    #[test]
    fn index_collects_package_imports_and_nested_types() {
        let parsed = parse();
        let unit = JavaUnit::index(&parsed);

        assert_eq!(unit.package(), Some("com.acme"));
        let imports: Vec<(&str, bool, bool)> = unit
            .imports()
            .iter()
            .map(|import| (import.path.as_str(), import.is_static, import.wildcard))
            .collect();
        assert_eq!(
            imports,
            vec![
                ("com.foo.Gateway", false, false),
                ("java.util", false, true),
                ("org.junit.Assert.assertEquals", true, false),
            ]
        );

        let paths: Vec<&str> = unit.types().iter().map(|decl| decl.path.as_str()).collect();
        assert_eq!(paths, vec!["ServiceTest", "ServiceTest.Helper", "ServiceTest.Port"]);

        let helper = unit
            .type_by_path("ServiceTest.Helper")
            .expect("helper should be indexed");
        assert!(helper.methods[0].is_static);
        assert_eq!(helper.methods[0].params[0].ty, "int");
        assert!(!helper.methods[1].is_static);

        let port = unit.type_by_path("ServiceTest.Port").expect("port should be indexed");
        assert_eq!(port.kind, TypeKind::Interface);
        assert!(port.methods[0].is_abstract);
    }

    #[test]
    fn resolve_type_prefers_declared_then_imported_then_package() {
        let parsed = parse();
        let unit = JavaUnit::index(&parsed);

        let helper = unit.resolve_type("Helper", Some("ServiceTest"));
        assert_eq!(helper.qualified, "com.acme.ServiceTest.Helper");
        assert_eq!(helper.display, "ServiceTest.Helper");
        assert!(helper.declared);

        let gateway = unit.resolve_type("Gateway", Some("ServiceTest"));
        assert_eq!(gateway.qualified, "com.foo.Gateway");
        assert_eq!(gateway.display, "Gateway");
        assert!(!gateway.declared);

        let sibling = unit.resolve_type("Clock<String>", None);
        assert_eq!(sibling.qualified, "com.acme.Clock");
        assert_eq!(sibling.path, "Clock");

        assert_eq!(unit.resolve_type("String", None).qualified, "java.lang.String");
        assert!(unit.names_type("Gateway", None));
        assert!(!unit.names_type("gateway", None));
    }

    #[test]
    fn visible_variable_respects_declaration_order_and_scopes() {
        let parsed = parse();
        let call = parsed
            .nodes_of_kind("method_invocation")
            .into_iter()
            .find(|node| parsed.node_text(*node).starts_with("call"))
            .expect("call should exist");
        let source = parsed.text();

        let count = visible_variable(call, "count", source).expect("count should be visible");
        assert_eq!(count.origin, VariableOrigin::Local);
        assert_eq!(count.ty, "int");

        let handle = visible_variable(call, "handle", source).expect("resource should be visible");
        assert_eq!(handle.origin, VariableOrigin::Resource);

        let label = visible_variable(call, "label", source).expect("parameter should be visible");
        assert_eq!(label.origin, VariableOrigin::Parameter);

        let gateway = visible_variable(call, "gateway", source).expect("field should be visible");
        assert_eq!(gateway.origin, VariableOrigin::Field);
        assert_eq!(gateway.annotations, vec!["Mocked".to_string()]);

        assert!(visible_variable(call, "late", source).is_none());
    }

    #[test]
    fn erase_and_split_handle_generics_and_nesting() {
        assert_eq!(erase_type("Map<String, List<Integer>>"), "Map");
        assert_eq!(erase_type("String[]"), "String");
        assert_eq!(erase_type("String..."), "String");
        assert_eq!(
            split_qualified("com.foo.Outer.Inner"),
            ("com.foo".to_string(), "Outer.Inner".to_string())
        );
    }
}
