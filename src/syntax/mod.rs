use serde::Serialize;
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

use crate::error::MigrateError;

pub mod indent;
pub mod model;
pub mod unit;
mod util;

pub(crate) use util::{ancestors, named_children, text_of};

/// A half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "invalid span: {start}..{end}");
        Self { start, end }
    }

    pub fn of(node: Node<'_>) -> Self {
        Self::new(node.start_byte(), node.end_byte())
    }

    pub fn contains(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("{0}")]
    Language(String),
    #[error("tree-sitter returned no syntax tree")]
    NoTree,
    #[error("syntax error at line {line}, column {column}")]
    Invalid { line: usize, column: usize },
}

impl SyntaxError {
    pub fn into_migrate_error(self, file: &str) -> MigrateError {
        match self {
            Self::Language(message) => MigrateError::LanguageSetup { message },
            other => MigrateError::ParseFailure {
                file: file.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Source text together with its tree-sitter-java syntax tree.
pub struct ParsedSource {
    text: String,
    tree: Tree,
}

impl ParsedSource {
    /// Parses `text`, rejecting sources that contain syntax errors.
    pub fn parse(text: String) -> Result<Self, SyntaxError> {
        let tree = parse_tree(&text)?;
        if let Some((line, column)) = first_error_position(tree.root_node()) {
            return Err(SyntaxError::Invalid { line, column });
        }
        Ok(Self { text, tree })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn node_text(&self, node: Node<'_>) -> &str {
        text_of(node, &self.text)
    }

    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or_default()
    }

    /// Every node of `kind` in document order.
    pub fn nodes_of_kind(&self, kind: &str) -> Vec<Node<'_>> {
        let mut found = Vec::new();
        collect_kind(self.root(), kind, &mut found);
        found
    }
}

pub(crate) fn parse_tree(text: &str) -> Result<Tree, SyntaxError> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|error| SyntaxError::Language(error.to_string()))?;
    parser.parse(text, None).ok_or(SyntaxError::NoTree)
}

/// Line and column (both 1-based) of the first ERROR or MISSING node, if any.
pub(crate) fn first_error_position(root: Node<'_>) -> Option<(usize, usize)> {
    if !root.has_error() {
        return None;
    }
    if root.is_error() || root.is_missing() {
        let position = root.start_position();
        return Some((position.row + 1, position.column + 1));
    }

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if let Some(position) = first_error_position(child) {
            return Some(position);
        }
    }

    let position = root.start_position();
    Some((position.row + 1, position.column + 1))
}

fn collect_kind<'t>(node: Node<'t>, kind: &str, found: &mut Vec<Node<'t>>) {
    if node.kind() == kind {
        found.push(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_kind(child, kind, found);
    }
}

#[cfg(test)]
mod tests {
    use super::{ParsedSource, Span, SyntaxError};

    #[test]
    fn parse_accepts_valid_java() {
        let parsed = ParsedSource::parse("class A { void a() { int x = 1; } }".to_string())
            .expect("valid source should parse");
        assert_eq!(parsed.root().kind(), "program");
        assert_eq!(parsed.nodes_of_kind("local_variable_declaration").len(), 1);
    }

    #[test]
    fn parse_reports_first_error_location() {
        let error = match ParsedSource::parse("class A {\n  void a( {\n}\n".to_string()) {
            Ok(_) => panic!("broken source should be rejected"),
            Err(error) => error,
        };
        match error {
            SyntaxError::Invalid { line, .. } => assert!(line >= 2, "unexpected line {line}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn span_containment_is_inclusive_of_bounds() {
        let outer = Span::new(2, 10);
        assert!(outer.contains(Span::new(2, 10)));
        assert!(outer.contains(Span::new(4, 6)));
        assert!(!outer.contains(Span::new(1, 6)));
        assert!(outer.contains_offset(9));
        assert!(!outer.contains_offset(10));
    }
}
