//! Decides whether a construct's scopes live in a local try-with-resources or in fields of the
//! test class, and produces the field and teardown edits for the latter.

use tree_sitter::Node;

use super::SkipReason;
use super::strategy::{MOCKED_CONSTRUCTION, MOCKED_STATIC};
use crate::config::{Config, simple_name};
use crate::edit::TextEdit;
use crate::host::imports::ImportPlan;
use crate::host::template::Template;
use crate::syntax::indent::line_indent;
use crate::syntax::unit::{declaration_annotations, enclosing_method, erase_type, has_modifier};
use crate::syntax::{ancestors, named_children, text_of};

const FIELD_TEMPLATE: &str = "private #{}#{} #{};";
const RELEASE_TEMPLATE: &str = "#{}.closeOnDemand();";
const TEARDOWN_TEMPLATE: &str = "@#{}\n#{}void #{}() {#{}\n}";
const TEARDOWN_NAMES: &[&str] = &["tearDown", "tearDownMocks"];

#[derive(Debug, Clone, Copy)]
pub struct HoistTarget<'t> {
    pub method: Node<'t>,
    pub class_body: Node<'t>,
    /// Teardown annotation paired with the setup hook, as configured.
    pub teardown: &'t str,
    /// Whether the setup hook spelled its annotation with a qualified name.
    pub qualified: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum Lifetime<'t> {
    Local,
    Hoisted(HoistTarget<'t>),
}

/// A scope handle that becomes a field, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistedScope {
    pub name: String,
    pub ty: &'static str,
}

pub fn decide<'t>(statement: Node<'t>, source: &str, config: &'t Config) -> Lifetime<'t> {
    let Some(method) = enclosing_method(statement).filter(|method| method.kind() == "method_declaration")
    else {
        return Lifetime::Local;
    };
    let Some(class_body) = method.parent().filter(|parent| parent.kind() == "class_body") else {
        return Lifetime::Local;
    };
    // A construct inside a lambda or anonymous class runs later than the hook itself.
    let deferred = ancestors(statement)
        .take_while(|ancestor| ancestor.id() != method.id())
        .any(|ancestor| matches!(ancestor.kind(), "lambda_expression" | "class_body"));
    if deferred {
        return Lifetime::Local;
    }

    declaration_annotations(method, source)
        .iter()
        .find_map(|annotation| {
            config.teardown_for_setup(annotation).map(|teardown| {
                Lifetime::Hoisted(HoistTarget {
                    method,
                    class_body,
                    teardown,
                    qualified: annotation.contains('.'),
                    is_static: has_modifier(method, "static"),
                })
            })
        })
        .unwrap_or(Lifetime::Local)
}

/// Field declarations and teardown releases for `scopes`.
pub fn hoist_edits(
    target: &HoistTarget<'_>,
    scopes: &[HoistedScope],
    source: &str,
    indent_unit: &str,
    imports: &mut ImportPlan,
) -> Result<Vec<TextEdit>, SkipReason> {
    if scopes.is_empty() {
        return Ok(Vec::new());
    }
    let member_indent = line_indent(source, target.method.start_byte());
    let body_indent = format!("{member_indent}{indent_unit}");
    let static_modifier = if target.is_static { "static " } else { "" };

    let mut edits = Vec::new();

    let fields = scopes
        .iter()
        .map(|scope| Template::members(FIELD_TEMPLATE).apply(&[static_modifier, scope.ty, scope.name.as_str()]))
        .collect::<Result<Vec<_>, _>>()?;
    let existing_fields = named_children(target.class_body)
        .into_iter()
        .filter(|member| member.kind() == "field_declaration")
        .filter(|field| {
            field.child_by_field_name("type").is_some_and(|ty| {
                let ty = erase_type(text_of(ty, source));
                matches!(simple_name(&ty), MOCKED_STATIC | MOCKED_CONSTRUCTION)
            })
        })
        .last();
    let field_lines: String = fields
        .iter()
        .map(|field| format!("\n{member_indent}{field}"))
        .collect();
    edits.push(match existing_fields {
        Some(last) => TextEdit::insert(last.end_byte(), field_lines),
        None => TextEdit::insert(target.class_body.start_byte() + 1, format!("{field_lines}\n")),
    });

    let releases = scopes
        .iter()
        .rev()
        .map(|scope| Template::new(RELEASE_TEMPLATE).apply(&[&scope.name]))
        .collect::<Result<Vec<_>, _>>()?;
    let release_lines = |indent: &str| -> String {
        releases
            .iter()
            .map(|release| format!("\n{indent}{release}"))
            .collect()
    };

    match find_teardown(target, source) {
        Some(body) => edits.push(TextEdit::insert(body.start_byte() + 1, release_lines(&body_indent))),
        None => {
            let annotation = if target.qualified || !target.teardown.contains('.') {
                target.teardown.to_string()
            } else {
                imports.ensure_import(target.teardown, None);
                simple_name(target.teardown).to_string()
            };
            let modifiers = format!(
                "{}{static_modifier}",
                visibility(target.method).map_or(String::new(), |keyword| format!("{keyword} "))
            );
            let name = teardown_name(target.class_body, source);
            let releases = release_lines(indent_unit);
            let method = Template::members(TEARDOWN_TEMPLATE).apply(&[
                annotation.as_str(),
                modifiers.as_str(),
                name.as_str(),
                releases.as_str(),
            ])?;
            let indented = method.replace('\n', &format!("\n{member_indent}"));
            edits.push(TextEdit::insert(
                target.method.end_byte(),
                format!("\n\n{member_indent}{indented}"),
            ));
        }
    }

    Ok(edits)
}

/// Body of the class's method carrying the paired teardown annotation.
fn find_teardown<'t>(target: &HoistTarget<'t>, source: &str) -> Option<Node<'t>> {
    let wanted = simple_name(target.teardown);
    named_children(target.class_body)
        .into_iter()
        .filter(|member| member.kind() == "method_declaration")
        .find(|method| {
            declaration_annotations(*method, source)
                .iter()
                .any(|annotation| simple_name(annotation) == wanted)
        })
        .and_then(|method| method.child_by_field_name("body"))
}

fn teardown_name(class_body: Node<'_>, source: &str) -> String {
    let taken: Vec<&str> = named_children(class_body)
        .into_iter()
        .filter(|member| member.kind() == "method_declaration")
        .filter_map(|method| method.child_by_field_name("name"))
        .map(|name| text_of(name, source))
        .collect();
    TEARDOWN_NAMES
        .iter()
        .map(ToString::to_string)
        .chain((1..).map(|suffix| format!("tearDownMocks{suffix}")))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| "tearDownMocks".to_string())
}

fn visibility(method: Node<'_>) -> Option<&'static str> {
    ["public", "protected"]
        .into_iter()
        .find(|keyword| has_modifier(method, keyword))
}
