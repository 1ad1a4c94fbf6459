//! Per-block state machine folding consecutive `assertThat(x).m(..);` statements into one chain.

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::edit::TextEdit;
use crate::host::matcher::MethodPattern;
use crate::syntax::indent::line_indent;
use crate::syntax::model::{Call, Expr, Stmt};
use crate::syntax::unit::JavaUnit;
use crate::syntax::{ParsedSource, Span, named_children};

pub const ASSERT_THAT: &str = "org.assertj.core.api.Assertions assertThat(*)";

/// Assertion methods whose result asserts on something other than the original subject.
const SUBJECT_CHANGING: &[&str] = &[
    "asInstanceOf",
    "asList",
    "asString",
    "element",
    "elements",
    "first",
    "flatMap",
    "last",
    "map",
    "singleElement",
    "size",
    "succeedsWithin",
];

const SUBJECT_CHANGING_PREFIXES: &[&str] = &["extracting", "flatExtracting", "filteredOn"];

const BLOCK_KINDS: &[&str] = &["block", "constructor_body"];

/// One eligible single-step assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Assertion {
    subject: String,
    /// `assertThat(x)` as written.
    head: String,
    /// The asserting call without its leading dot, e.g. `hasSize(3)`.
    step: String,
    span: Span,
}

/// A run of two or more assertions on one subject, replaced by a single chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub span: Span,
    pub statements: usize,
    pub replacement: String,
}

impl Run {
    pub fn edit(&self) -> TextEdit {
        TextEdit::replace(self.span, self.replacement.clone())
    }
}

pub struct Collapser<'a> {
    parsed: &'a ParsedSource,
    unit: &'a JavaUnit,
    pattern: &'a MethodPattern,
    indent_unit: &'a str,
}

impl<'a> Collapser<'a> {
    pub fn new(
        parsed: &'a ParsedSource,
        unit: &'a JavaUnit,
        pattern: &'a MethodPattern,
        indent_unit: &'a str,
    ) -> Self {
        Self {
            parsed,
            unit,
            pattern,
            indent_unit,
        }
    }

    /// Runs found in every block, dropping any run that encloses another so edits never overlap.
    pub fn runs(&self) -> Vec<Run> {
        let mut runs: Vec<Run> = BLOCK_KINDS
            .iter()
            .flat_map(|kind| self.parsed.nodes_of_kind(kind))
            .flat_map(|block| self.block_runs(block))
            .collect();
        runs.sort_by_key(|run| (run.span.start, run.span.end));

        let spans: Vec<Span> = runs.iter().map(|run| run.span).collect();
        runs.retain(|run| {
            !spans
                .iter()
                .any(|other| *other != run.span && run.span.contains(*other))
        });
        runs
    }

    fn block_runs(&self, block: Node<'_>) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut chained: BTreeSet<String> = BTreeSet::new();
        let mut pending: Vec<Assertion> = Vec::new();

        for statement in named_children(block) {
            match self.shape(statement) {
                Some(Shape::Single(assertion)) if !chained.contains(&assertion.subject) => {
                    if pending
                        .last()
                        .is_some_and(|last| last.subject != assertion.subject)
                    {
                        runs.extend(self.flush(&mut pending));
                    }
                    pending.push(assertion);
                    continue;
                }
                Some(Shape::Chain(subject)) => {
                    chained.insert(subject);
                }
                _ => {}
            }
            runs.extend(self.flush(&mut pending));
        }
        runs.extend(self.flush(&mut pending));
        runs
    }

    fn flush(&self, pending: &mut Vec<Assertion>) -> Option<Run> {
        let run = std::mem::take(pending);
        let (first, last) = (run.first()?, run.last()?);
        if run.len() < 2 {
            return None;
        }

        let source = self.parsed.text();
        let continuation = format!(
            "{}{}{}",
            line_indent(source, first.span.start),
            self.indent_unit,
            self.indent_unit
        );
        let mut replacement = first.head.clone();
        for assertion in &run {
            replacement.push('\n');
            replacement.push_str(&continuation);
            replacement.push('.');
            replacement.push_str(&assertion.step);
        }
        replacement.push(';');

        Some(Run {
            span: Span::new(first.span.start, last.span.end),
            statements: run.len(),
            replacement,
        })
    }

    fn shape(&self, statement: Node<'_>) -> Option<Shape> {
        let source = self.parsed.text();
        let Stmt::Call(outer) = Stmt::lower(statement, source) else {
            return None;
        };

        let mut steps = 1usize;
        let mut current = &outer;
        let head = loop {
            match current.receiver.as_deref() {
                Some(Expr::Call(inner)) if self.is_assert_that(inner) => break inner,
                Some(Expr::Call(inner)) => {
                    steps += 1;
                    current = inner;
                }
                _ => return None,
            }
        };
        let subject = head.args.first()?;
        if !subject.is_stable_reference() {
            return None;
        }
        let subject_text = compact(self.parsed.slice(subject.span()));

        if steps > 1 {
            return Some(Shape::Chain(subject_text));
        }
        if changes_subject(&outer.name) {
            return None;
        }

        let tail = self.parsed.slice(Span::new(head.span.end, outer.span.end));
        let step = tail.trim_start().strip_prefix('.')?.trim_start().to_string();
        Some(Shape::Single(Assertion {
            subject: subject_text,
            head: self.parsed.slice(head.span).to_string(),
            step,
            span: Span::of(statement),
        }))
    }

    fn is_assert_that(&self, call: &Call) -> bool {
        self.pattern.matches(call, self.unit, self.parsed.text())
    }
}

enum Shape {
    Single(Assertion),
    /// A multi-step chain already asserting on the subject.
    Chain(String),
}

fn changes_subject(method: &str) -> bool {
    SUBJECT_CHANGING.contains(&method)
        || SUBJECT_CHANGING_PREFIXES
            .iter()
            .any(|prefix| method.starts_with(prefix))
}

fn compact(text: &str) -> String {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .collect()
}
