use tree_sitter::Node;

pub(crate) fn text_of<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    let start = node.start_byte();
    let end = node.end_byte();

    if start > end || end > source.len() {
        return "";
    }

    source.get(start..end).unwrap_or_default()
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Strict ancestors of `node`, innermost first.
pub(crate) fn ancestors(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    std::iter::successors(node.parent(), |current| current.parent())
}

#[cfg(test)]
mod tests {
    use super::{ancestors, text_of};
    use crate::syntax::ParsedSource;

    #[test]
    fn text_of_rejects_out_of_range_nodes() {
        let parsed = ParsedSource::parse("class A {}".to_string()).expect("source should parse");
        let class = parsed.nodes_of_kind("class_declaration")[0];
        assert_eq!(text_of(class, parsed.text()), "class A {}");
        assert_eq!(text_of(class, "class"), "", "truncated source must not panic");
    }

    #[test]
    fn ancestors_walk_up_to_program() {
        let parsed = ParsedSource::parse("class A { int x; }".to_string())
            .expect("source should parse");
        let field = parsed.nodes_of_kind("field_declaration")[0];
        let kinds: Vec<&str> = ancestors(field).map(|node| node.kind()).collect();
        assert_eq!(kinds, vec!["class_body", "class_declaration", "program"]);
    }
}
