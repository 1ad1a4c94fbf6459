//! A closed, owned view of the Java statement and expression shapes the rewrites reason about.
//!
//! Everything outside these shapes lowers to `Other`, which callers treat as opaque text.

use tree_sitter::Node;

use super::{Span, named_children, text_of};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident {
        name: String,
        span: Span,
    },
    FieldAccess {
        object: Box<Expr>,
        field: String,
        span: Span,
    },
    Call(Call),
    This {
        span: Span,
    },
    New {
        type_name: String,
        args: Vec<Expr>,
        has_body: bool,
        span: Span,
    },
    Cast {
        type_name: String,
        value: Box<Expr>,
        span: Span,
    },
    Other {
        kind: String,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub receiver: Option<Box<Expr>>,
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Call(Call),
    Assign {
        target: Expr,
        operator: String,
        value: Expr,
        span: Span,
    },
    LocalVar {
        span: Span,
    },
    Comment {
        span: Span,
    },
    Other {
        kind: String,
        span: Span,
    },
}

impl Expr {
    pub fn lower(node: Node<'_>, source: &str) -> Self {
        let span = Span::of(node);
        match node.kind() {
            "identifier" => Self::Ident {
                name: text_of(node, source).to_string(),
                span,
            },
            "this" => Self::This { span },
            "field_access" => {
                let (Some(object), Some(field)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("field"),
                ) else {
                    return Self::other(node);
                };
                Self::FieldAccess {
                    object: Box::new(Self::lower(object, source)),
                    field: text_of(field, source).to_string(),
                    span,
                }
            }
            "method_invocation" => match Call::lower(node, source) {
                Some(call) => Self::Call(call),
                None => Self::other(node),
            },
            "object_creation_expression" => {
                let Some(type_node) = node.child_by_field_name("type") else {
                    return Self::other(node);
                };
                let args = node
                    .child_by_field_name("arguments")
                    .map(|arguments| lower_arguments(arguments, source))
                    .unwrap_or_default();
                let has_body = named_children(node)
                    .iter()
                    .any(|child| child.kind() == "class_body");
                Self::New {
                    type_name: text_of(type_node, source).to_string(),
                    args,
                    has_body,
                    span,
                }
            }
            "cast_expression" => {
                let (Some(type_node), Some(value)) = (
                    node.child_by_field_name("type"),
                    node.child_by_field_name("value"),
                ) else {
                    return Self::other(node);
                };
                Self::Cast {
                    type_name: text_of(type_node, source).to_string(),
                    value: Box::new(Self::lower(value, source)),
                    span,
                }
            }
            "parenthesized_expression" => match named_children(node).first() {
                Some(inner) if named_children(node).len() == 1 => Self::lower(*inner, source),
                _ => Self::other(node),
            },
            _ => Self::other(node),
        }
    }

    fn other(node: Node<'_>) -> Self {
        Self::Other {
            kind: node.kind().to_string(),
            span: Span::of(node),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Ident { span, .. }
            | Self::FieldAccess { span, .. }
            | Self::This { span }
            | Self::New { span, .. }
            | Self::Cast { span, .. }
            | Self::Other { span, .. } => *span,
            Self::Call(call) => call.span,
        }
    }

    /// `true` for identifiers and field accesses rooted at identifiers or `this`.
    pub fn is_stable_reference(&self) -> bool {
        match self {
            Self::Ident { .. } => true,
            Self::FieldAccess { object, .. } => {
                matches!(object.as_ref(), Self::This { .. }) || object.is_stable_reference()
            }
            _ => false,
        }
    }
}

impl Call {
    pub fn lower(node: Node<'_>, source: &str) -> Option<Self> {
        if node.kind() != "method_invocation" {
            return None;
        }
        let name = node.child_by_field_name("name")?;
        let receiver = node
            .child_by_field_name("object")
            .map(|object| Box::new(Expr::lower(object, source)));
        let args = node
            .child_by_field_name("arguments")
            .map(|arguments| lower_arguments(arguments, source))
            .unwrap_or_default();

        Some(Self {
            receiver,
            name: text_of(name, source).to_string(),
            args,
            span: Span::of(node),
        })
    }
}

impl Stmt {
    pub fn lower(node: Node<'_>, source: &str) -> Self {
        let span = Span::of(node);
        match node.kind() {
            "line_comment" | "block_comment" => Self::Comment { span },
            "local_variable_declaration" => Self::LocalVar { span },
            "expression_statement" => {
                let children = named_children(node);
                let Some(expression) = children.first() else {
                    return Self::Other {
                        kind: node.kind().to_string(),
                        span,
                    };
                };
                match expression.kind() {
                    "method_invocation" => match Call::lower(*expression, source) {
                        Some(call) => Self::Call(call),
                        None => Self::Other {
                            kind: expression.kind().to_string(),
                            span,
                        },
                    },
                    "assignment_expression" => {
                        let (Some(left), Some(right)) = (
                            expression.child_by_field_name("left"),
                            expression.child_by_field_name("right"),
                        ) else {
                            return Self::Other {
                                kind: expression.kind().to_string(),
                                span,
                            };
                        };
                        let operator = expression
                            .child_by_field_name("operator")
                            .map(|operator| text_of(operator, source).to_string())
                            .unwrap_or_else(|| "=".to_string());
                        Self::Assign {
                            target: Expr::lower(left, source),
                            operator,
                            value: Expr::lower(right, source),
                            span,
                        }
                    }
                    other => Self::Other {
                        kind: other.to_string(),
                        span,
                    },
                }
            }
            other => Self::Other {
                kind: other.to_string(),
                span,
            },
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Call(call) => call.span,
            Self::Assign { span, .. }
            | Self::LocalVar { span }
            | Self::Comment { span }
            | Self::Other { span, .. } => *span,
        }
    }
}

fn lower_arguments(arguments: Node<'_>, source: &str) -> Vec<Expr> {
    named_children(arguments)
        .into_iter()
        .filter(|child| !matches!(child.kind(), "line_comment" | "block_comment"))
        .map(|child| Expr::lower(child, source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Expr, Stmt};
    use crate::syntax::ParsedSource;

    fn lower_statements(body: &str) -> (ParsedSource, Vec<Stmt>) {
        let parsed = ParsedSource::parse(format!("class A {{ void a() {{ {body} }} }}"))
            .expect("statement fixture should parse");
        let block = parsed.nodes_of_kind("block")[0];
        let statements = crate::syntax::named_children(block)
            .into_iter()
            .map(|node| Stmt::lower(node, parsed.text()))
            .collect();
        (parsed, statements)
    }

    #[test]
    fn nested_call_receivers_lower_recursively() {
        let (parsed, statements) = lower_statements("dao.session().find(anyString, 3);");
        let Stmt::Call(call) = &statements[0] else {
            panic!("expected call statement, got {:?}", statements[0]);
        };
        assert_eq!(call.name, "find");
        assert_eq!(call.args.len(), 2);
        let Some(receiver) = call.receiver.as_deref() else {
            panic!("call should have a receiver");
        };
        let Expr::Call(inner) = receiver else {
            panic!("receiver should be a call, got {receiver:?}");
        };
        assert_eq!(inner.name, "session");
        assert!(matches!(inner.receiver.as_deref(), Some(Expr::Ident { name, .. }) if name == "dao"));
        assert_eq!(parsed.slice(call.args[1].span()), "3");
    }

    #[test]
    fn assignments_keep_target_shape_and_operator() {
        let (_, statements) = lower_statements("result = 1; this.count += 2; int x = 3; // note");
        assert!(matches!(
            &statements[0],
            Stmt::Assign { target: Expr::Ident { name, .. }, operator, .. } if name == "result" && operator == "="
        ));
        assert!(matches!(
            &statements[1],
            Stmt::Assign { target: Expr::FieldAccess { field, .. }, operator, .. } if field == "count" && operator == "+="
        ));
        assert!(matches!(statements[2], Stmt::LocalVar { .. }));
        assert!(matches!(statements[3], Stmt::Comment { .. }));
    }

    #[test]
    fn stable_references_exclude_calls() {
        let (_, statements) =
            lower_statements("check(list); check(this.items); check(a.b.c); check(make());");
        let stable: Vec<bool> = statements
            .iter()
            .map(|statement| match statement {
                Stmt::Call(call) => call.args[0].is_stable_reference(),
                other => panic!("unexpected statement {other:?}"),
            })
            .collect();
        assert_eq!(stable, vec![true, true, true, false]);
    }

    #[test]
    fn object_creation_records_anonymous_body() {
        let (_, statements) = lower_statements("value = new IllegalStateException(\"x\") {};");
        let Stmt::Assign { value, .. } = &statements[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(
            value,
            Expr::New { type_name, has_body: true, args, .. } if type_name == "IllegalStateException" && args.len() == 1
        ));
    }
}
