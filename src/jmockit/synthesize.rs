//! Renders Mockito statements for planned mock groups and splices them over the construct.

use tree_sitter::Node;

use super::SkipReason;
use super::block::BlockSource;
use super::classify::{Answer, AnswerBody, Classified, Entry, Receiver, Relocated, ResultValue, Target};
use super::lifecycle::HoistedScope;
use super::strategy::{MOCKED_CONSTRUCTION, MOCKED_STATIC, MockGroup, Strategy};
use crate::edit::TextEdit;
use crate::host::imports::ImportPlan;
use crate::host::template::Template;
use crate::syntax::indent::{full_line, rebase, shift_lines};
use crate::syntax::unit::{JavaUnit, Param, TypeRef, erase_type};
use crate::syntax::{ParsedSource, Span, named_children};

const MOCKITO: &str = "org.mockito.Mockito";
const ARGUMENT_MATCHERS: &str = "org.mockito.ArgumentMatchers";
const ADDITIONAL_ANSWERS: &str = "org.mockito.AdditionalAnswers";
const MOCKED_STATIC_TYPE: &str = "org.mockito.MockedStatic";
const MOCKED_CONSTRUCTION_TYPE: &str = "org.mockito.MockedConstruction";

const OBJECT_TEMPLATE: &str = "#{} #{} = mock(#{}.class, withSettings().defaultAnswer(CALLS_REAL_METHODS));";
const INSTANCE_ANSWER_TEMPLATE: &str = "doAnswer(invocation -> {#{}\n#{}}).when(#{}).#{}(#{});";
const STATIC_ANSWER_TEMPLATE: &str = "#{}.when(() -> #{}.#{}(#{})).thenAnswer(invocation -> {#{}\n#{}});";
const STATIC_STUB_TEMPLATE: &str = "#{}.when(() -> #{})#{};";
const WHEN_TEMPLATE: &str = "when(#{})#{};";
const STUBBER_TEMPLATE: &str = "#{}.when(#{}).#{}(#{});";
/// Valid for void and non-void methods alike; Mockito maps `null` to the primitive default.
const DEFAULT_STUBBER: &str = "doAnswer(invocation -> null)";
const VERIFY_TEMPLATE: &str = "verify(#{}, #{}).#{}(#{});";
const STATIC_VERIFY_TEMPLATE: &str = "#{}.verify(() -> #{}, #{});";
const CONSTRUCTION_RESOURCE: &str =
    "MockedConstruction #{} = mockConstructionWithAnswer(#{}.class, delegatesTo(#{}));";
const INITIALIZER_RESOURCE: &str = "MockedConstruction #{} = mockConstruction(#{}.class, withSettings().defaultAnswer(delegatesTo(#{})), (mock, context) -> {#{}\n#{}});";
const STATIC_RESOURCE: &str = "MockedStatic #{} = mockStatic(#{}.class);";
const CONSTRUCTION_ASSIGNMENT: &str = "#{} = mockConstructionWithAnswer(#{}.class, delegatesTo(#{}));";
const INITIALIZER_ASSIGNMENT: &str = "#{} = mockConstruction(#{}.class, withSettings().defaultAnswer(delegatesTo(#{})), (mock, context) -> {#{}\n#{}});";
const STATIC_ASSIGNMENT: &str = "#{} = mockStatic(#{}.class);";

#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    /// Indentation of the construct statement.
    pub indent: &'a str,
    pub unit: &'a str,
}

/// Generated statements in emission order, before they are spliced into the source.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    /// Statements at the construct's indentation, ahead of any new scope.
    pub prelude: Vec<String>,
    /// Try-with-resources resources, statics first.
    pub resources: Vec<String>,
    /// Statements opening the body of the new try.
    pub scoped: Vec<String>,
    /// Invocation-count checks for the end of the scope.
    pub verifications: Vec<String>,
    pub hoisted: Vec<HoistedScope>,
    pub imports: ImportPlan,
}

pub struct Synthesizer<'a> {
    classified: &'a Classified,
    unit: &'a JavaUnit,
    layout: Layout<'a>,
    hoisted: bool,
}

impl<'a> Synthesizer<'a> {
    pub fn new(classified: &'a Classified, unit: &'a JavaUnit, layout: Layout<'a>, hoisted: bool) -> Self {
        Self {
            classified,
            unit,
            layout,
            hoisted,
        }
    }

    pub fn synthesize(&self, groups: &[MockGroup], source: &BlockSource) -> Result<Synthesis, SkipReason> {
        let indent = self.layout.indent;
        let wraps = groups.iter().any(opens_scope);
        let inner = if wraps && !self.hoisted {
            format!("{indent}{}", self.layout.unit)
        } else {
            indent.to_string()
        };

        let mut synthesis = Synthesis::default();
        synthesis.prelude.extend(
            self.classified
                .setup
                .iter()
                .map(|statement| relocate(statement, indent)),
        );

        for group in groups {
            if let Strategy::Instance {
                object,
                reuse: false,
                ..
            } = &group.strategy
            {
                let display = group.owner.display.as_str();
                synthesis
                    .prelude
                    .push(Template::new(OBJECT_TEMPLATE).apply(&[display, object.as_str(), display])?);
            }
        }

        for group in groups {
            for entry in self.entries(group) {
                let stub = match &group.strategy {
                    Strategy::Instance { object, .. } => Some(self.instance_stub(entry, object, indent)?),
                    Strategy::Variable { name, spy } => self.variable_stub(entry, name, *spy)?,
                    Strategy::Static { handle, open: false } => self.static_stub(entry, handle, indent)?,
                    Strategy::Static { open: true, .. } => continue,
                };
                synthesis.prelude.extend(stub);
            }
        }

        let mut static_resources = Vec::new();
        let mut construction_resources = Vec::new();
        for group in groups {
            if let Strategy::Instance {
                object,
                scope,
                reuse: false,
            } = &group.strategy
            {
                let statement = self.construction(group, object, scope)?;
                if self.hoisted {
                    synthesis.prelude.push(statement);
                    synthesis.hoisted.push(HoistedScope {
                        name: scope.clone(),
                        ty: MOCKED_CONSTRUCTION,
                    });
                } else {
                    construction_resources.push(statement);
                }
            }
        }
        for group in groups {
            if let Strategy::Static { handle, open: true } = &group.strategy {
                let display = group.owner.display.as_str();
                if self.hoisted {
                    synthesis
                        .prelude
                        .push(Template::new(STATIC_ASSIGNMENT).apply(&[handle.as_str(), display])?);
                    synthesis.hoisted.push(HoistedScope {
                        name: handle.clone(),
                        ty: MOCKED_STATIC,
                    });
                } else {
                    static_resources.push(resource(
                        Template::new(STATIC_RESOURCE).apply(&[handle.as_str(), display])?,
                    ));
                }
            }
        }
        synthesis.resources = static_resources;
        synthesis.resources.extend(construction_resources);

        for group in groups {
            if let Strategy::Static { handle, open: true } = &group.strategy {
                for entry in self.entries(group) {
                    let stub = self.static_stub(entry, handle, &inner)?;
                    if self.hoisted {
                        synthesis.prelude.extend(stub);
                    } else {
                        synthesis.scoped.extend(stub);
                    }
                }
            }
        }

        for group in groups {
            for entry in self.entries(group) {
                if let Some(verification) = self.verification(entry, &group.strategy)? {
                    synthesis.verifications.push(verification);
                }
            }
        }

        synthesis.imports = self.imports(groups, source);
        Ok(synthesis)
    }

    /// The edit replacing the construct. A new try wraps everything after the construct up to
    /// the end of its block; so do trailing verifications.
    pub fn replacement(&self, synthesis: &Synthesis, statement: Node<'_>, parsed: &ParsedSource) -> TextEdit {
        let text = parsed.text();
        let indent = self.layout.indent;
        let unit = self.layout.unit;
        let separator = format!("\n{indent}");
        let prelude = synthesis.prelude.join(&separator);
        let construct = Span::of(statement);

        if synthesis.resources.is_empty() && synthesis.verifications.is_empty() {
            if prelude.is_empty() {
                return TextEdit::delete(full_line(text, construct));
            }
            return TextEdit::replace(construct, prelude);
        }

        let block_end = statement
            .parent()
            .and_then(|block| named_children(block).last().map(|last| last.end_byte()))
            .unwrap_or(construct.end)
            .max(construct.end);
        let remainder = Span::new(construct.end, block_end);
        let mut replacement = prelude;

        if synthesis.resources.is_empty() {
            let rest = parsed.slice(remainder);
            if replacement.is_empty() {
                replacement.push_str(rest.trim_start());
            } else {
                replacement.push_str(rest);
            }
            for verification in &synthesis.verifications {
                if !replacement.is_empty() {
                    replacement.push_str(&separator);
                }
                replacement.push_str(verification);
            }
            return TextEdit::replace(Span::new(construct.start, block_end), replacement);
        }

        if !replacement.is_empty() {
            replacement.push_str(&separator);
        }
        replacement.push_str(&format!("try ({}) {{", synthesis.resources.join("; ")));
        for statement in &synthesis.scoped {
            replacement.push_str(&format!("{separator}{unit}{statement}"));
        }
        replacement.push_str(&shift_lines(text, remainder, unit, &text_blocks(parsed, remainder)));
        for verification in &synthesis.verifications {
            replacement.push_str(&format!("{separator}{unit}{verification}"));
        }
        replacement.push_str(&format!("{separator}}}"));
        TextEdit::replace(Span::new(construct.start, block_end), replacement)
    }

    fn entries<'g>(&'g self, group: &'g MockGroup) -> impl Iterator<Item = &'a Entry> + 'g {
        group
            .entries
            .iter()
            .filter_map(|index| self.classified.entries.get(*index))
    }

    fn instance_stub(&self, entry: &Entry, object: &str, base: &str) -> Result<String, SkipReason> {
        let Target::Faked { method, params, .. } = &entry.target else {
            return Err(SkipReason::UnrecognizedStatement(format!(
                "{} cannot be faked on a delegate mock",
                entry.target.method()
            )));
        };
        let Answer::Body(body) = &entry.answer else {
            return Err(SkipReason::MalformedExpectationBlock(format!(
                "fake {method} has no body"
            )));
        };
        let answer = self.answer_lines(body, "invocation.getArgument", base, true);
        Ok(Template::new(INSTANCE_ANSWER_TEMPLATE).apply(&[
            answer.as_str(),
            base,
            object,
            method.as_str(),
            permissive_matchers(params).as_str(),
        ])?)
    }

    fn static_stub(&self, entry: &Entry, handle: &str, base: &str) -> Result<Option<String>, SkipReason> {
        match (&entry.target, &entry.answer) {
            (Target::Faked { owner, method, params }, Answer::Body(body)) => {
                let answer = self.answer_lines(body, "invocation.getArgument", base, true);
                Ok(Some(Template::new(STATIC_ANSWER_TEMPLATE).apply(&[
                    handle,
                    owner.display.as_str(),
                    method.as_str(),
                    permissive_matchers(params).as_str(),
                    answer.as_str(),
                    base,
                ])?))
            }
            (
                Target::Recorded {
                    receiver: Receiver::Type { text, owner },
                    method,
                    args,
                },
                answer,
            ) => {
                let call = format!("{text}.{method}({})", args.join(", "));
                let chain = match answer {
                    Answer::Values(values) => then_chain(values),
                    _ if self.returns_value(owner, method, args.len()) => return Ok(None),
                    _ => ".thenAnswer(invocation -> null)".to_string(),
                };
                Ok(Some(
                    Template::new(STATIC_STUB_TEMPLATE).apply(&[handle, call.as_str(), chain.as_str()])?,
                ))
            }
            (target, _) => Err(SkipReason::UnrecognizedStatement(format!(
                "{} cannot be stubbed statically",
                target.method()
            ))),
        }
    }

    fn variable_stub(&self, entry: &Entry, name: &str, spy: bool) -> Result<Option<String>, SkipReason> {
        let Target::Recorded {
            receiver: Receiver::Variable { ty, .. },
            method,
            args,
        } = &entry.target
        else {
            return Err(SkipReason::UnrecognizedStatement(format!(
                "{} is not a call on {name}",
                entry.target.method()
            )));
        };
        let arguments = args.join(", ");
        let stub = match &entry.answer {
            Answer::Values(values) if spy => {
                Template::new(STUBBER_TEMPLATE).apply(&[
                    stubber_chain(values).as_str(),
                    name,
                    method.as_str(),
                    arguments.as_str(),
                ])?
            }
            Answer::Values(values) => {
                let call = format!("{name}.{method}({arguments})");
                Template::new(WHEN_TEMPLATE).apply(&[call, then_chain(values)])?
            }
            _ if self.returns_value(ty, method, args.len()) => return Ok(None),
            _ => Template::new(STUBBER_TEMPLATE).apply(&[
                DEFAULT_STUBBER,
                name,
                method.as_str(),
                arguments.as_str(),
            ])?,
        };
        Ok(Some(stub))
    }

    fn verification(&self, entry: &Entry, strategy: &Strategy) -> Result<Option<String>, SkipReason> {
        let Some(cardinality) = &entry.cardinality else {
            return Ok(None);
        };
        let Target::Recorded { receiver, method, args } = &entry.target else {
            return Ok(None);
        };
        let arguments = args.join(", ");
        let count = cardinality.render();
        let verification = match (receiver, strategy) {
            (Receiver::Variable { .. }, Strategy::Variable { name, .. }) => {
                Template::new(VERIFY_TEMPLATE).apply(&[
                    name.as_str(),
                    count.as_str(),
                    method.as_str(),
                    arguments.as_str(),
                ])?
            }
            (Receiver::Type { text, .. }, Strategy::Static { handle, .. }) => {
                let call = format!("{text}.{method}({arguments})");
                Template::new(STATIC_VERIFY_TEMPLATE).apply(&[handle.as_str(), call.as_str(), count.as_str()])?
            }
            _ => {
                return Err(SkipReason::UnrecognizedStatement(format!(
                    "cannot verify invocations of {method}"
                )));
            }
        };
        Ok(Some(verification))
    }

    fn construction(&self, group: &MockGroup, object: &str, scope: &str) -> Result<String, SkipReason> {
        let display = group.owner.display.as_str();
        let initializer = group
            .constructor
            .and_then(|index| self.classified.entries.get(index));
        let statement = match initializer {
            Some(Entry {
                answer: Answer::Body(body),
                ..
            }) => {
                let base = self.layout.indent;
                let answer = self.answer_lines(body, "context.arguments().get", base, false);
                let template = if self.hoisted {
                    INITIALIZER_ASSIGNMENT
                } else {
                    INITIALIZER_RESOURCE
                };
                Template::new(template).apply(&[scope, display, object, answer.as_str(), base])?
            }
            _ => {
                let template = if self.hoisted {
                    CONSTRUCTION_ASSIGNMENT
                } else {
                    CONSTRUCTION_RESOURCE
                };
                Template::new(template).apply(&[scope, display, object])?
            }
        };
        Ok(if self.hoisted { statement } else { resource(statement) })
    }

    /// Body lines of a lambda answer, one indentation unit inside `base`.
    fn answer_lines(&self, body: &AnswerBody, argument: &str, base: &str, returns: bool) -> String {
        let inner = format!("{base}{}", self.layout.unit);
        let mut lines: Vec<String> = body
            .captured
            .iter()
            .map(|(index, param)| {
                let ty = capture_type(param);
                format!("{ty} {} = ({ty}) {argument}({index});", param.name)
            })
            .collect();
        lines.extend(body.lines.iter().cloned());
        if returns && body.returns_void {
            lines.push("return null;".to_string());
        }
        lines
            .iter()
            .map(|line| {
                if line.is_empty() {
                    "\n".to_string()
                } else {
                    format!("\n{inner}{line}")
                }
            })
            .collect()
    }

    /// `true` when `owner` is declared in the file and its `method` returns something.
    fn returns_value(&self, owner: &TypeRef, method: &str, arity: usize) -> bool {
        if !owner.declared {
            return false;
        }
        self.unit.type_by_path(&owner.path).is_some_and(|decl| {
            decl.methods.iter().any(|candidate| {
                !candidate.is_constructor
                    && candidate.name == method
                    && candidate.params.len() == arity
                    && candidate.return_type != "void"
            })
        })
    }

    fn imports(&self, groups: &[MockGroup], source: &BlockSource) -> ImportPlan {
        let mut imports = ImportPlan::default();
        match source {
            BlockSource::Expectations => imports.remove_import_if_unused("mockit.Expectations"),
            BlockSource::MockUp { .. } => {
                imports.remove_import_if_unused("mockit.MockUp");
                imports.remove_import_if_unused("mockit.Mock");
            }
        }
        if groups.is_empty() {
            return imports;
        }

        imports.ensure_import(MOCKITO, Some("*"));
        let uses_matchers = groups.iter().any(|group| {
            group.entries.iter().any(|index| {
                self.classified.entries.get(*index).is_some_and(|entry| match &entry.target {
                    Target::Faked { params, .. } => !params.is_empty(),
                    _ => entry.matchers,
                })
            })
        });
        if uses_matchers {
            imports.ensure_import(ARGUMENT_MATCHERS, Some("*"));
        }
        for group in groups {
            match &group.strategy {
                Strategy::Instance { reuse: false, .. } => {
                    imports.ensure_import(ADDITIONAL_ANSWERS, Some("delegatesTo"));
                    imports.ensure_import(MOCKED_CONSTRUCTION_TYPE, None);
                }
                Strategy::Static { open: true, .. } => {
                    imports.ensure_import(MOCKED_STATIC_TYPE, None);
                }
                _ => {}
            }
        }
        imports
    }
}

fn opens_scope(group: &MockGroup) -> bool {
    matches!(
        group.strategy,
        Strategy::Static { open: true, .. } | Strategy::Instance { reuse: false, .. }
    )
}

fn relocate(statement: &Relocated, indent: &str) -> String {
    let rebased = rebase(&statement.text, statement.indent_width, indent);
    match rebased.strip_prefix(indent) {
        Some(stripped) => stripped.to_string(),
        None => rebased,
    }
}

/// A validated statement used as a try resource.
fn resource(statement: String) -> String {
    statement.trim_end_matches(';').to_string()
}

fn then_chain(values: &[ResultValue]) -> String {
    let mut chain = String::new();
    let mut run: Vec<&str> = Vec::new();
    let mut throwing = false;
    for value in values {
        let (text, throws) = match value {
            ResultValue::Return(text) => (text.as_str(), false),
            ResultValue::Throw(text) => (text.as_str(), true),
        };
        if !run.is_empty() && throws != throwing {
            chain.push_str(&then_call(throwing, &run));
            run.clear();
        }
        throwing = throws;
        run.push(text);
    }
    if !run.is_empty() {
        chain.push_str(&then_call(throwing, &run));
    }
    chain
}

fn then_call(throwing: bool, values: &[&str]) -> String {
    let method = if throwing { "thenThrow" } else { "thenReturn" };
    format!(".{method}({})", values.join(", "))
}

fn stubber_chain(values: &[ResultValue]) -> String {
    values
        .iter()
        .map(|value| match value {
            ResultValue::Return(text) => format!("doReturn({text})"),
            ResultValue::Throw(text) => format!("doThrow({text})"),
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn permissive_matchers(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| permissive_matcher(&param.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A matcher accepting any value of `ty`, null included for reference types.
fn permissive_matcher(ty: &str) -> String {
    let trimmed = ty.trim();
    let primitive = match trimmed {
        "int" => Some("anyInt()"),
        "long" => Some("anyLong()"),
        "short" => Some("anyShort()"),
        "byte" => Some("anyByte()"),
        "boolean" => Some("anyBoolean()"),
        "char" => Some("anyChar()"),
        "double" => Some("anyDouble()"),
        "float" => Some("anyFloat()"),
        _ => None,
    };
    if let Some(matcher) = primitive {
        return matcher.to_string();
    }
    if trimmed.ends_with("...") || trimmed.contains('[') {
        return "any()".to_string();
    }
    let erased = erase_type(trimmed);
    let type_variable = erased.len() == 1 && erased.chars().all(|character| character.is_ascii_uppercase());
    if type_variable {
        return "any()".to_string();
    }
    format!("nullable({erased}.class)")
}

fn capture_type(param: &Param) -> String {
    match param.ty.strip_suffix("...") {
        Some(element) => format!("{}[]", element.trim()),
        None => param.ty.clone(),
    }
}

fn text_blocks(parsed: &ParsedSource, within: Span) -> Vec<Span> {
    parsed
        .nodes_of_kind("string_literal")
        .into_iter()
        .filter(|literal| parsed.node_text(*literal).starts_with("\"\"\""))
        .map(Span::of)
        .filter(|span| within.contains(*span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{permissive_matcher, stubber_chain, then_chain};
    use crate::jmockit::classify::ResultValue;

    #[test]
    fn permissive_matchers_follow_parameter_types() {
        assert_eq!(permissive_matcher("int"), "anyInt()");
        assert_eq!(permissive_matcher("String"), "nullable(String.class)");
        assert_eq!(permissive_matcher("List<String>"), "nullable(List.class)");
        assert_eq!(permissive_matcher("byte[]"), "any()");
        assert_eq!(permissive_matcher("T"), "any()");
    }

    #[test]
    fn result_chains_group_consecutive_kinds() {
        let values = vec![
            ResultValue::Return("1".to_string()),
            ResultValue::Return("2".to_string()),
            ResultValue::Throw("new IllegalStateException()".to_string()),
        ];
        assert_eq!(
            then_chain(&values),
            ".thenReturn(1, 2).thenThrow(new IllegalStateException())"
        );
        assert_eq!(
            stubber_chain(&values),
            "doReturn(1).doReturn(2).doThrow(new IllegalStateException())"
        );
    }
}
