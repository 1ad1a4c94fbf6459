//! Splits an [`ExpectationBlock`] into relocated setup statements and verification entries.

use std::collections::BTreeSet;

use tree_sitter::Node;

use super::SkipReason;
use super::block::{BlockSource, ExpectationBlock, is_comment};
use crate::config::{Config, simple_name};
use crate::host::matcher::AnnotationPattern;
use crate::syntax::indent::{line_indent, rebase};
use crate::syntax::model::{Call, Expr, Stmt};
use crate::syntax::unit::{
    JavaUnit, Param, TypeRef, declaration_annotations, erase_type, formal_parameters,
    has_modifier, visible_variable,
};
use crate::syntax::{Span, named_children, text_of};

const MOCK_METHOD_ANNOTATION: &str = "mockit.Mock";
const INVOCATION_TYPE: &str = "Invocation";
const CONSTRUCTOR_FAKE: &str = "$init";
const CLASS_INITIALIZER_FAKE: &str = "$clinit";
/// Annotations whose variables hold real instances, stubbed with `doReturn` style calls.
const REAL_INSTANCE_ANNOTATIONS: &[&str] = &["Tested", "InjectMocks", "Spy"];

const ANY_FIELDS: &[&str] = &[
    "any",
    "anyString",
    "anyInt",
    "anyLong",
    "anyShort",
    "anyByte",
    "anyBoolean",
    "anyChar",
    "anyDouble",
    "anyFloat",
];

/// A statement moved in front of the generated code, as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocated {
    pub text: String,
    /// Indentation width of the line the statement started on.
    pub indent_width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// A mock-role variable or spy.
    Variable { text: String, ty: TypeRef, spy: bool },
    /// A type name: the recorded call is static.
    Type { text: String, owner: TypeRef },
    /// A call or field chain hanging off a mock.
    Nested { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Recorded {
        receiver: Receiver,
        method: String,
        args: Vec<String>,
    },
    Faked {
        owner: TypeRef,
        method: String,
        params: Vec<Param>,
    },
    Constructor {
        owner: TypeRef,
        params: Vec<Param>,
    },
}

impl Target {
    pub fn owner(&self) -> Option<&TypeRef> {
        match self {
            Self::Recorded { receiver, .. } => match receiver {
                Receiver::Variable { ty, .. } => Some(ty),
                Receiver::Type { owner, .. } => Some(owner),
                Receiver::Nested { .. } => None,
            },
            Self::Faked { owner, .. } | Self::Constructor { owner, .. } => Some(owner),
        }
    }

    pub fn method(&self) -> &str {
        match self {
            Self::Recorded { method, .. } | Self::Faked { method, .. } => method,
            Self::Constructor { .. } => CONSTRUCTOR_FAKE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultValue {
    Return(String),
    Throw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerBody {
    /// Parameters the body refers to, with their position.
    pub captured: Vec<(usize, Param)>,
    /// Body statements with their common indentation removed.
    pub lines: Vec<String>,
    pub returns_void: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Nothing recorded: the call is void or its default value is fine.
    Default,
    Values(Vec<ResultValue>),
    Body(AnswerBody),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityMode {
    Times,
    AtLeast,
    AtMost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cardinality {
    pub mode: CardinalityMode,
    pub count: String,
}

impl Cardinality {
    pub fn render(&self) -> String {
        let function = match self.mode {
            CardinalityMode::Times => "times",
            CardinalityMode::AtLeast => "atLeast",
            CardinalityMode::AtMost => "atMost",
        };
        format!("{function}({})", self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub target: Target,
    pub answer: Answer,
    pub cardinality: Option<Cardinality>,
    /// Whether the rendered arguments use argument matchers.
    pub matchers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub setup: Vec<Relocated>,
    pub entries: Vec<Entry>,
}

pub struct Classifier<'a> {
    config: &'a Config,
    unit: &'a JavaUnit,
    source: &'a str,
    context: Option<&'a str>,
}

struct Pending<'t> {
    receiver: Receiver,
    call: Call,
    at: Node<'t>,
    results: Vec<ResultValue>,
    cardinality: Option<Cardinality>,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Config, unit: &'a JavaUnit, source: &'a str, at: usize) -> Self {
        Self {
            config,
            unit,
            source,
            context: unit.type_at(at).map(|decl| decl.path.as_str()),
        }
    }

    pub fn classify(&self, block: &ExpectationBlock<'_>) -> Result<Classified, SkipReason> {
        match &block.source {
            BlockSource::Expectations => self.classify_expectations(block),
            BlockSource::MockUp { owner } => self.classify_mockup(block, owner),
        }
    }

    fn classify_expectations(&self, block: &ExpectationBlock<'_>) -> Result<Classified, SkipReason> {
        let mut classified = Classified::default();
        let mut pending: Option<Pending<'_>> = None;

        for &member in &block.members {
            match Stmt::lower(member, self.source) {
                Stmt::Comment { .. } => classified.setup.push(self.relocated(member)),
                Stmt::LocalVar { .. } => {
                    if let Some(name) = self.redeclared_local(member, block.statement) {
                        return Err(SkipReason::UnrecognizedStatement(format!(
                            "local `{name}` is declared again after the Expectations block"
                        )));
                    }
                    classified.setup.push(self.relocated(member));
                }
                Stmt::Assign {
                    target: Expr::Ident { name, .. },
                    operator,
                    value,
                    ..
                } if is_slot(&name) => {
                    let Some(current) = pending.as_mut() else {
                        return Err(SkipReason::MalformedExpectationBlock(format!(
                            "`{name}` assigned before any recorded call"
                        )));
                    };
                    if operator != "=" {
                        return Err(SkipReason::UnrecognizedStatement(format!(
                            "`{name} {operator}` is not a plain assignment"
                        )));
                    }
                    self.fill_slot(current, &name, &value, member)?;
                }
                Stmt::Assign { .. } => classified.setup.push(self.relocated(member)),
                Stmt::Call(call) if call.receiver.is_none() && call.name == "returns" => {
                    let Some(current) = pending.as_mut() else {
                        return Err(SkipReason::MalformedExpectationBlock(
                            "`returns(...)` before any recorded call".to_string(),
                        ));
                    };
                    current.results.extend(call.args.iter().map(|arg| {
                        ResultValue::Return(self.slice(arg.span()).to_string())
                    }));
                }
                Stmt::Call(call) => {
                    let receiver = call
                        .receiver
                        .as_deref()
                        .and_then(|receiver| self.receiver_role(receiver, member, &block.spies));
                    match receiver {
                        Some(receiver) => {
                            if let Some(done) = pending.take() {
                                classified.entries.push(self.finish(done)?);
                            }
                            pending = Some(Pending {
                                receiver,
                                call,
                                at: member,
                                results: Vec::new(),
                                cardinality: None,
                            });
                        }
                        None => classified.setup.push(self.relocated(member)),
                    }
                }
                Stmt::Other { kind, .. } => {
                    return Err(SkipReason::UnrecognizedStatement(format!(
                        "{kind} inside Expectations"
                    )));
                }
            }
        }

        if let Some(done) = pending.take() {
            classified.entries.push(self.finish(done)?);
        }
        Ok(classified)
    }

    fn fill_slot(
        &self,
        pending: &mut Pending<'_>,
        name: &str,
        value: &Expr,
        at: Node<'_>,
    ) -> Result<(), SkipReason> {
        let mode = match name {
            "result" => {
                pending.results.push(self.result_value(value, at));
                return Ok(());
            }
            "times" => CardinalityMode::Times,
            "minTimes" => CardinalityMode::AtLeast,
            _ => CardinalityMode::AtMost,
        };
        if pending.cardinality.is_some() {
            return Err(SkipReason::UnrecognizedStatement(format!(
                "`{name}` combined with another invocation count"
            )));
        }
        pending.cardinality = Some(Cardinality {
            mode,
            count: self.slice(value.span()).to_string(),
        });
        Ok(())
    }

    fn finish(&self, pending: Pending<'_>) -> Result<Entry, SkipReason> {
        let (args, matchers) = self.render_arguments(&pending.call.args, pending.at)?;
        Ok(Entry {
            target: Target::Recorded {
                receiver: pending.receiver,
                method: pending.call.name,
                args,
            },
            answer: if pending.results.is_empty() {
                Answer::Default
            } else {
                Answer::Values(pending.results)
            },
            cardinality: pending.cardinality,
            matchers,
        })
    }

    /// What a recorded call's receiver is, or `None` when the call is ordinary setup code.
    fn receiver_role(&self, receiver: &Expr, at: Node<'_>, spies: &[String]) -> Option<Receiver> {
        let text = self.slice(receiver.span()).to_string();
        match receiver {
            Expr::Ident { name, .. } => {
                let variable = visible_variable(at, name, self.source);
                if spies.contains(name) {
                    let ty = variable.map_or_else(|| "Object".to_string(), |variable| variable.ty);
                    return Some(Receiver::Variable {
                        text,
                        ty: self.resolve(&ty),
                        spy: true,
                    });
                }
                match variable {
                    Some(variable) => self.mock_variable(text, &variable.ty, &variable.annotations),
                    None if self.unit.names_type(name, self.context) => Some(Receiver::Type {
                        owner: self.resolve(name),
                        text,
                    }),
                    None => None,
                }
            }
            Expr::FieldAccess { object, field, .. } => match object.as_ref() {
                Expr::This { .. } => {
                    let variable = visible_variable(at, field, self.source)?;
                    self.mock_variable(text, &variable.ty, &variable.annotations)
                }
                _ if self.unit.names_type(&text, self.context) => Some(Receiver::Type {
                    owner: self.resolve(&text),
                    text,
                }),
                inner => self
                    .receiver_role(inner, at, spies)
                    .map(|_| Receiver::Nested { text }),
            },
            Expr::Call(inner) => inner
                .receiver
                .as_deref()
                .and_then(|inner| self.receiver_role(inner, at, spies))
                .map(|_| Receiver::Nested { text }),
            _ => None,
        }
    }

    fn mock_variable(&self, text: String, ty: &str, annotations: &[String]) -> Option<Receiver> {
        if !annotations
            .iter()
            .any(|annotation| self.config.is_mock_annotation(annotation))
        {
            return None;
        }
        let spy = annotations
            .iter()
            .any(|annotation| REAL_INSTANCE_ANNOTATIONS.contains(&simple_name(annotation)));
        Some(Receiver::Variable {
            text,
            ty: self.resolve(ty),
            spy,
        })
    }

    fn result_value(&self, value: &Expr, at: Node<'_>) -> ResultValue {
        let text = self.slice(value.span()).to_string();
        let throwable = match value {
            Expr::New { type_name, .. } => is_throwable(type_name),
            Expr::Ident { name, .. } => visible_variable(at, name, self.source)
                .is_some_and(|variable| is_throwable(&variable.ty)),
            _ => false,
        };
        if throwable {
            ResultValue::Throw(text)
        } else {
            ResultValue::Return(text)
        }
    }

    /// Mockito arguments for a recorded call. Concrete values are wrapped in `eq(...)` as soon
    /// as one argument is a matcher.
    fn render_arguments(&self, args: &[Expr], at: Node<'_>) -> Result<(Vec<String>, bool), SkipReason> {
        let rendered = args
            .iter()
            .map(|arg| self.render_argument(arg, at))
            .collect::<Result<Vec<_>, _>>()?;
        let matchers = rendered.iter().any(|(_, is_matcher)| *is_matcher);
        let args = rendered
            .into_iter()
            .map(|(text, is_matcher)| {
                if matchers && !is_matcher {
                    format!("eq({text})")
                } else {
                    text
                }
            })
            .collect();
        Ok((args, matchers))
    }

    fn render_argument(&self, arg: &Expr, at: Node<'_>) -> Result<(String, bool), SkipReason> {
        let text = self.slice(arg.span());
        match arg {
            Expr::Ident { name, .. } if self.is_any_field(name, at) => {
                Ok((format!("{name}()"), true))
            }
            Expr::Cast {
                type_name, value, ..
            } => match value.as_ref() {
                Expr::Ident { name, .. } if name == "any" && self.is_any_field(name, at) => {
                    Ok((typed_any(type_name), true))
                }
                Expr::Ident { name, .. } if self.is_any_field(name, at) => {
                    Ok((format!("{name}()"), true))
                }
                _ => Ok((text.to_string(), false)),
            },
            Expr::Call(call) if call.receiver.is_none() && call.name.starts_with("with") => {
                let first = call
                    .args
                    .first()
                    .map(|arg| self.slice(arg.span()))
                    .unwrap_or_default();
                let matcher = match (call.name.as_str(), call.args.len()) {
                    ("withAny", 1) => "any()".to_string(),
                    ("withNotNull", 0) => "notNull()".to_string(),
                    ("withNull", 0) => "isNull()".to_string(),
                    ("withEqual", 1) => format!("eq({first})"),
                    ("withInstanceOf", 1) => format!("isA({first})"),
                    ("withSameInstance", 1) => format!("same({first})"),
                    ("withSubstring", 1) => format!("contains({first})"),
                    ("withPrefix", 1) => format!("startsWith({first})"),
                    ("withSuffix", 1) => format!("endsWith({first})"),
                    ("withMatch", 1) => format!("matches({first})"),
                    (name, count) => {
                        return Err(SkipReason::UnrecognizedStatement(format!(
                            "argument matcher {name} with {count} argument(s)"
                        )));
                    }
                };
                Ok((matcher, true))
            }
            _ => Ok((text.to_string(), false)),
        }
    }

    /// `anyString` and friends, unless a variable of the same name shadows the inherited field.
    fn is_any_field(&self, name: &str, at: Node<'_>) -> bool {
        ANY_FIELDS.contains(&name) && visible_variable(at, name, self.source).is_none()
    }

    fn classify_mockup(
        &self,
        block: &ExpectationBlock<'_>,
        owner: &TypeRef,
    ) -> Result<Classified, SkipReason> {
        let mock_annotation = AnnotationPattern::parse(MOCK_METHOD_ANNOTATION)
            .map_err(|error| SkipReason::UnrecognizedStatement(error.to_string()))?;
        let mut classified = Classified::default();
        let fields = self.captured_fields(&block.members)?;

        for &member in &block.members {
            match member.kind() {
                _ if is_comment(member) => {}
                "field_declaration" => classified.setup.push(self.relocated_field(member)),
                "method_declaration" => {
                    let name = member
                        .child_by_field_name("name")
                        .map(|name| text_of(name, self.source))
                        .unwrap_or_default();
                    let annotated = declaration_annotations(member, self.source)
                        .iter()
                        .any(|annotation| mock_annotation.matches(annotation, self.unit));
                    if !annotated {
                        return Err(SkipReason::UnrecognizedStatement(format!(
                            "MockUp method {name} without @Mock"
                        )));
                    }
                    if name == CLASS_INITIALIZER_FAKE {
                        return Err(SkipReason::UnrecognizedStatement(
                            "static initializer fake".to_string(),
                        ));
                    }

                    let params = member
                        .child_by_field_name("parameters")
                        .map(|parameters| formal_parameters(parameters, self.source))
                        .unwrap_or_default();
                    if params
                        .first()
                        .is_some_and(|param| simple_name(&erase_type(&param.ty)) == INVOCATION_TYPE)
                    {
                        return Err(SkipReason::UnrecognizedStatement(format!(
                            "{name} takes an Invocation parameter"
                        )));
                    }
                    let Some(body) = member.child_by_field_name("body") else {
                        return Err(SkipReason::MalformedExpectationBlock(format!(
                            "@Mock method {name} has no body"
                        )));
                    };
                    if let Some(field) = assigned_field(body, &fields, self.source) {
                        return Err(SkipReason::UnrecognizedStatement(format!(
                            "@Mock method {name} writes to MockUp field `{field}`"
                        )));
                    }
                    let returns_void = member
                        .child_by_field_name("type")
                        .is_some_and(|ty| text_of(ty, self.source) == "void");

                    let answer = Answer::Body(self.answer_body(body, &params, returns_void));
                    let target = if name == CONSTRUCTOR_FAKE {
                        Target::Constructor {
                            owner: owner.clone(),
                            params,
                        }
                    } else {
                        Target::Faked {
                            owner: owner.clone(),
                            method: name.to_string(),
                            params,
                        }
                    };
                    classified.entries.push(Entry {
                        target,
                        answer,
                        cardinality: None,
                        matchers: true,
                    });
                }
                other => {
                    return Err(SkipReason::UnrecognizedStatement(format!(
                        "{other} inside MockUp"
                    )));
                }
            }
        }
        Ok(classified)
    }

    /// Names of the MockUp's fields. Each becomes a local captured by the generated lambdas, so it
    /// needs an initializer.
    fn captured_fields(&self, members: &[Node<'_>]) -> Result<Vec<&'a str>, SkipReason> {
        let mut names = Vec::new();
        for field in members
            .iter()
            .filter(|member| member.kind() == "field_declaration")
        {
            let mut cursor = field.walk();
            for declarator in field.children_by_field_name("declarator", &mut cursor) {
                let name = declarator
                    .child_by_field_name("name")
                    .map(|name| text_of(name, self.source))
                    .unwrap_or_default();
                if declarator.child_by_field_name("value").is_none() {
                    return Err(SkipReason::UnrecognizedStatement(format!(
                        "MockUp field `{name}` has no initializer"
                    )));
                }
                names.push(name);
            }
        }
        Ok(names)
    }

    /// A name declared by `declaration` that the rest of the enclosing block declares again.
    fn redeclared_local(&self, declaration: Node<'_>, statement: Node<'_>) -> Option<&'a str> {
        let scope = statement.parent()?;
        let later: Vec<Node<'_>> = named_children(scope)
            .into_iter()
            .filter(|sibling| sibling.start_byte() >= statement.end_byte())
            .collect();
        let mut cursor = declaration.walk();
        let declared: Vec<&'a str> = declaration
            .children_by_field_name("declarator", &mut cursor)
            .filter_map(|declarator| declarator.child_by_field_name("name"))
            .map(|name| text_of(name, self.source))
            .collect();
        declared.into_iter().find(|name| {
            later
                .iter()
                .any(|sibling| declares(*sibling, name, self.source))
        })
    }

    fn answer_body(&self, body: Node<'_>, params: &[Param], returns_void: bool) -> AnswerBody {
        let mut used = BTreeSet::new();
        collect_identifiers(body, self.source, &mut used);
        let captured = params
            .iter()
            .enumerate()
            .filter(|(_, param)| used.contains(param.name.as_str()))
            .map(|(index, param)| (index, param.clone()))
            .collect();

        let statements = named_children(body);
        let lines = match (statements.first(), statements.last()) {
            (Some(first), Some(last)) => {
                let width = line_indent(self.source, first.start_byte()).len();
                let fragment = self.slice(Span::new(first.start_byte(), last.end_byte()));
                rebase(fragment, width, "")
                    .split('\n')
                    .map(ToString::to_string)
                    .collect()
            }
            _ => Vec::new(),
        };

        AnswerBody {
            captured,
            lines,
            returns_void,
        }
    }

    fn relocated(&self, node: Node<'_>) -> Relocated {
        Relocated {
            text: text_of(node, self.source).to_string(),
            indent_width: line_indent(self.source, node.start_byte()).len(),
        }
    }

    /// A MockUp field as a local declaration: annotations and modifiers other than `final` go.
    fn relocated_field(&self, node: Node<'_>) -> Relocated {
        let start = node
            .child_by_field_name("type")
            .map_or(node.start_byte(), |ty| ty.start_byte());
        let declaration = self.slice(Span::new(start, node.end_byte()));
        let text = if has_modifier(node, "final") {
            format!("final {declaration}")
        } else {
            declaration.to_string()
        };
        Relocated {
            text,
            indent_width: line_indent(self.source, node.start_byte()).len(),
        }
    }

    fn resolve(&self, ty: &str) -> TypeRef {
        self.unit.resolve_type(ty, self.context)
    }

    fn slice(&self, span: Span) -> &'a str {
        self.source.get(span.start..span.end).unwrap_or_default()
    }
}

fn is_slot(name: &str) -> bool {
    matches!(name, "result" | "times" | "minTimes" | "maxTimes")
}

fn is_throwable(type_name: &str) -> bool {
    let erased = erase_type(type_name);
    let simple = simple_name(&erased);
    simple.ends_with("Exception") || simple.ends_with("Error") || simple == "Throwable"
}

/// `(T) any` as a typed matcher; primitives get their dedicated matcher.
fn typed_any(type_name: &str) -> String {
    match type_name.trim() {
        "int" => "anyInt()".to_string(),
        "long" => "anyLong()".to_string(),
        "short" => "anyShort()".to_string(),
        "byte" => "anyByte()".to_string(),
        "boolean" => "anyBoolean()".to_string(),
        "char" => "anyChar()".to_string(),
        "double" => "anyDouble()".to_string(),
        "float" => "anyFloat()".to_string(),
        other => format!("any({}.class)", erase_type(other)),
    }
}

/// First of `fields` that `node` assigns to or increments.
fn assigned_field<'f>(node: Node<'_>, fields: &[&'f str], source: &str) -> Option<&'f str> {
    let target = match node.kind() {
        "assignment_expression" => node.child_by_field_name("left"),
        "update_expression" => named_children(node).into_iter().next(),
        _ => None,
    };
    if let Some(target) = target
        && let Some(written) = written_name(target, source)
        && let Some(field) = fields.iter().find(|field| **field == written)
    {
        return Some(*field);
    }
    named_children(node)
        .into_iter()
        .find_map(|child| assigned_field(child, fields, source))
}

fn written_name<'s>(target: Node<'_>, source: &'s str) -> Option<&'s str> {
    match target.kind() {
        "identifier" => Some(text_of(target, source)),
        "field_access"
            if target
                .child_by_field_name("object")
                .is_some_and(|object| object.kind() == "this") =>
        {
            target
                .child_by_field_name("field")
                .map(|field| text_of(field, source))
        }
        _ => None,
    }
}

/// Whether `node` declares a local, parameter or loop variable called `name`. Anonymous class
/// bodies are a scope of their own and are not entered.
fn declares(node: Node<'_>, name: &str, source: &str) -> bool {
    let named = |node: Node<'_>| {
        node.child_by_field_name("name")
            .is_some_and(|declared| text_of(declared, source) == name)
    };
    match node.kind() {
        "class_body" => return false,
        "variable_declarator"
        | "catch_formal_parameter"
        | "formal_parameter"
        | "enhanced_for_statement"
        | "resource"
            if named(node) =>
        {
            return true;
        }
        "lambda_expression" => {
            let inferred = node.child_by_field_name("parameters").is_some_and(|parameters| {
                match parameters.kind() {
                    "identifier" => text_of(parameters, source) == name,
                    "inferred_parameters" => named_children(parameters)
                        .into_iter()
                        .any(|parameter| text_of(parameter, source) == name),
                    _ => false,
                }
            });
            if inferred {
                return true;
            }
        }
        _ => {}
    }
    named_children(node)
        .into_iter()
        .any(|child| declares(child, name, source))
}

fn collect_identifiers<'s>(node: Node<'_>, source: &'s str, names: &mut BTreeSet<&'s str>) {
    if node.kind() == "identifier" {
        names.insert(text_of(node, source));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_identifiers(child, source, names);
    }
}
