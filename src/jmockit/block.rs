//! Locates `new Expectations() {{ ... }}` and `new MockUp<T>() { ... }` constructs and unpacks
//! them into an [`ExpectationBlock`].

use tree_sitter::Node;

use super::SkipReason;
use crate::host::matcher::TypePattern;
use crate::syntax::unit::{JavaUnit, TypeRef};
use crate::syntax::{ParsedSource, Span, named_children, text_of};

const EXPECTATIONS_TYPE: &str = "mockit.Expectations";
const MOCKUP_TYPE: &str = "mockit.MockUp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructKind {
    Expectations,
    MockUp,
}

impl ConstructKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Expectations => "Expectations",
            Self::MockUp => "MockUp",
        }
    }
}

/// One declarative construct found in the tree, before it is unpacked.
#[derive(Debug, Clone, Copy)]
pub struct Construct<'t> {
    pub kind: ConstructKind,
    pub creation: Node<'t>,
}

impl<'t> Construct<'t> {
    /// The `expression_statement` holding the creation, when it stands alone in a block.
    pub fn statement(&self) -> Option<Node<'t>> {
        let parent = self.creation.parent()?;
        let block = parent.parent()?;
        (parent.kind() == "expression_statement"
            && matches!(block.kind(), "block" | "constructor_body"))
        .then_some(parent)
    }

    pub fn line(&self) -> usize {
        self.creation.start_position().row + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSource {
    Expectations,
    MockUp { owner: TypeRef },
}

#[derive(Debug, Clone)]
pub struct ExpectationBlock<'t> {
    pub source: BlockSource,
    pub statement: Node<'t>,
    /// Plain identifiers passed to the `Expectations` constructor.
    pub spies: Vec<String>,
    /// Initializer statements or anonymous-class members, comments included.
    pub members: Vec<Node<'t>>,
}

impl ExpectationBlock<'_> {
    pub fn span(&self) -> Span {
        Span::of(self.statement)
    }
}

/// Every construct in document order.
pub fn find_constructs<'t>(parsed: &'t ParsedSource, unit: &JavaUnit) -> Vec<Construct<'t>> {
    let (Ok(expectations), Ok(mockup)) = (
        TypePattern::parse(EXPECTATIONS_TYPE),
        TypePattern::parse(MOCKUP_TYPE),
    ) else {
        return Vec::new();
    };

    parsed
        .nodes_of_kind("object_creation_expression")
        .into_iter()
        .filter_map(|creation| {
            let type_node = creation.child_by_field_name("type")?;
            let raw = raw_type(type_node, parsed.text());
            let context = unit
                .type_at(creation.start_byte())
                .map(|decl| decl.path.as_str());
            let kind = if expectations.matches(raw, unit, context) {
                ConstructKind::Expectations
            } else if mockup.matches(raw, unit, context) {
                ConstructKind::MockUp
            } else {
                return None;
            };
            Some(Construct { kind, creation })
        })
        .collect()
}

/// Unpacks `construct` into its members.
pub fn expectation_block<'t>(
    construct: &Construct<'t>,
    parsed: &'t ParsedSource,
    unit: &JavaUnit,
) -> Result<ExpectationBlock<'t>, SkipReason> {
    let source = parsed.text();
    let statement = construct.statement().ok_or_else(|| {
        SkipReason::UnrecognizedStatement(format!(
            "{} is not a standalone statement",
            construct.kind.label()
        ))
    })?;
    let body = named_children(construct.creation)
        .into_iter()
        .find(|child| child.kind() == "class_body")
        .ok_or_else(|| {
            SkipReason::MalformedExpectationBlock(format!(
                "{} has no anonymous class body",
                construct.kind.label()
            ))
        })?;
    let arguments = construct
        .creation
        .child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default();

    match construct.kind {
        ConstructKind::Expectations => {
            let mut initializers = named_children(body)
                .into_iter()
                .filter(|member| !is_comment(*member));
            let (Some(initializer), None) = (initializers.next(), initializers.next()) else {
                return Err(SkipReason::MalformedExpectationBlock(
                    "Expectations must hold exactly one instance initializer".to_string(),
                ));
            };
            if initializer.kind() != "block" {
                return Err(SkipReason::MalformedExpectationBlock(format!(
                    "unexpected {} inside Expectations",
                    initializer.kind()
                )));
            }

            let spies = arguments
                .iter()
                .filter(|argument| argument.kind() == "identifier")
                .map(|argument| text_of(*argument, source).to_string())
                .collect();
            Ok(ExpectationBlock {
                source: BlockSource::Expectations,
                statement,
                spies,
                members: named_children(initializer),
            })
        }
        ConstructKind::MockUp => {
            if !arguments.is_empty() {
                return Err(SkipReason::UnrecognizedStatement(
                    "MockUp bound to a target instance".to_string(),
                ));
            }
            let owner = mockup_owner(construct.creation, source).ok_or_else(|| {
                SkipReason::UnresolvedTarget("MockUp without a type argument".to_string())
            })?;
            let context = unit
                .type_at(construct.creation.start_byte())
                .map(|decl| decl.path.as_str());
            Ok(ExpectationBlock {
                source: BlockSource::MockUp {
                    owner: unit.resolve_type(owner, context),
                },
                statement,
                spies: Vec::new(),
                members: named_children(body),
            })
        }
    }
}

fn raw_type<'s>(type_node: Node<'_>, source: &'s str) -> &'s str {
    let base = if type_node.kind() == "generic_type" {
        named_children(type_node)
            .into_iter()
            .find(|child| child.kind() != "type_arguments")
            .unwrap_or(type_node)
    } else {
        type_node
    };
    text_of(base, source)
}

fn mockup_owner<'s>(creation: Node<'_>, source: &'s str) -> Option<&'s str> {
    let type_node = creation.child_by_field_name("type")?;
    if type_node.kind() != "generic_type" {
        return None;
    }
    let arguments = named_children(type_node)
        .into_iter()
        .find(|child| child.kind() == "type_arguments")?;
    match named_children(arguments).as_slice() {
        [single] => Some(text_of(*single, source)),
        _ => None,
    }
}

pub(crate) fn is_comment(node: Node<'_>) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment")
}

#[cfg(test)]
mod tests {
    use super::{BlockSource, ConstructKind, expectation_block, find_constructs};
    use crate::jmockit::SkipReason;
    use crate::syntax::ParsedSource;
    use crate::syntax::unit::JavaUnit;

    fn parse(source: &str) -> (ParsedSource, JavaUnit) {
        let parsed = ParsedSource::parse(source.to_string()).expect("fixture should parse");
        let unit = JavaUnit::index(&parsed);
        (parsed, unit)
    }

    #[test]
    fn finds_both_construct_kinds_in_document_order() {
        let (parsed, unit) = parse(
            "import mockit.Expectations;\nimport mockit.MockUp;\n\
             class T {\n  void t() {\n    new MockUp<Clock>() {};\n    new Expectations() {{ }};\n    new Other() {};\n  }\n}\n",
        );
        let kinds: Vec<ConstructKind> = find_constructs(&parsed, &unit)
            .iter()
            .map(|construct| construct.kind)
            .collect();
        assert_eq!(kinds, vec![ConstructKind::MockUp, ConstructKind::Expectations]);
    }

    #[test]
    fn expectations_collect_spies_and_initializer_statements() {
        let (parsed, unit) = parse(
            "import mockit.Expectations;\n\
             class T {\n  void t() {\n    new Expectations(cache, \"x\") {{\n      cache.get(); result = 1;\n    }};\n  }\n}\n",
        );
        let constructs = find_constructs(&parsed, &unit);
        let block = expectation_block(&constructs[0], &parsed, &unit)
            .expect("well-formed block should unpack");
        assert_eq!(block.source, BlockSource::Expectations);
        assert_eq!(block.spies, vec!["cache".to_string()]);
        assert_eq!(block.members.len(), 2);
    }

    #[test]
    fn mockup_owner_resolves_against_the_unit() {
        let (parsed, unit) = parse(
            "package a;\nimport mockit.MockUp;\nimport com.foo.Clock;\n\
             class T {\n  void t() {\n    new MockUp<Clock>() {\n      int calls;\n    };\n  }\n}\n",
        );
        let constructs = find_constructs(&parsed, &unit);
        let block = expectation_block(&constructs[0], &parsed, &unit)
            .expect("MockUp should unpack");
        let BlockSource::MockUp { owner } = block.source else {
            panic!("expected MockUp source");
        };
        assert_eq!(owner.qualified, "com.foo.Clock");
        assert_eq!(block.members.len(), 1);
    }

    #[test]
    fn malformed_and_embedded_constructs_are_skipped() {
        let (parsed, unit) = parse(
            "import mockit.Expectations;\nimport mockit.MockUp;\n\
             class T {\n  void t() {\n    new Expectations() {{ }  { }};\n    Object fake = new MockUp<Clock>() {}.getMockInstance();\n  }\n}\n",
        );
        let constructs = find_constructs(&parsed, &unit);
        assert!(matches!(
            expectation_block(&constructs[0], &parsed, &unit),
            Err(SkipReason::MalformedExpectationBlock(_))
        ));
        assert!(matches!(
            expectation_block(&constructs[1], &parsed, &unit),
            Err(SkipReason::UnrecognizedStatement(_))
        ));
    }
}
