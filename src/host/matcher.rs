use regex::Regex;
use thiserror::Error;

use crate::syntax::model::{Call, Expr};
use crate::syntax::unit::{JavaUnit, erase_type};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern '{pattern}' must look like 'pkg.Type method(args)'")]
    Shape { pattern: String },
    #[error("pattern '{pattern}' compiles to an invalid expression: {message}")]
    Regex { pattern: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentShape {
    Any,
    Exactly(usize),
}

impl ArgumentShape {
    fn parse(arguments: &str) -> Self {
        let trimmed = arguments.trim();
        if trimmed == ".." {
            return Self::Any;
        }
        if trimmed.is_empty() {
            return Self::Exactly(0);
        }
        Self::Exactly(trimmed.split(',').count())
    }

    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(expected) => expected == count,
        }
    }
}

/// Qualified type-name pattern: `*` spans one segment, `..` any number of packages.
#[derive(Debug, Clone)]
pub struct TypePattern {
    regex: Regex,
}

impl TypePattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut expression = String::from("^");
        let mut rest = pattern.trim();
        while let Some(character) = rest.chars().next() {
            if let Some(tail) = rest.strip_prefix("..") {
                expression.push_str(r"(\.[^.]+)*\.");
                rest = tail;
                continue;
            }
            match character {
                '*' => expression.push_str("[^.]*"),
                '.' => expression.push_str(r"\."),
                other => expression.push_str(&regex::escape(&other.to_string())),
            }
            rest = &rest[character.len_utf8()..];
        }
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|error| PatternError::Regex {
            pattern: pattern.to_string(),
            message: error.to_string(),
        })?;
        Ok(Self { regex })
    }

    pub fn matches_qualified(&self, qualified: &str) -> bool {
        self.regex.is_match(qualified)
    }

    /// Does `text`, spelled inside the type at `context`, name a matching type?
    pub fn matches(&self, text: &str, unit: &JavaUnit, context: Option<&str>) -> bool {
        candidate_names(text, unit, context)
            .iter()
            .any(|candidate| self.matches_qualified(candidate))
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationPattern {
    annotation: TypePattern,
}

impl AnnotationPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            annotation: TypePattern::parse(pattern.trim_start_matches('@'))?,
        })
    }

    pub fn matches(&self, annotation: &str, unit: &JavaUnit) -> bool {
        self.annotation
            .matches(annotation.trim_start_matches('@'), unit, None)
    }
}

/// `pkg.Type method(args)` where `args` is `..`, empty, or a comma separated list.
#[derive(Debug, Clone)]
pub struct MethodPattern {
    declaring_type: TypePattern,
    method: Regex,
    arguments: ArgumentShape,
}

impl MethodPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let shape_error = || PatternError::Shape {
            pattern: pattern.to_string(),
        };
        let (declaring_type, signature) = pattern.trim().split_once(' ').ok_or_else(shape_error)?;
        let (method, arguments) = signature.trim().split_once('(').ok_or_else(shape_error)?;
        let arguments = arguments.strip_suffix(')').ok_or_else(shape_error)?;

        let method_expression = format!("^{}$", regex::escape(method.trim()).replace(r"\*", ".*"));
        let method = Regex::new(&method_expression).map_err(|error| PatternError::Regex {
            pattern: pattern.to_string(),
            message: error.to_string(),
        })?;

        Ok(Self {
            declaring_type: TypePattern::parse(declaring_type)?,
            method,
            arguments: ArgumentShape::parse(arguments),
        })
    }

    /// Matches `call` by name, argument count, and the declaring type implied by its receiver
    /// or by the static imports that bring an unqualified name into scope.
    pub fn matches(&self, call: &Call, unit: &JavaUnit, source: &str) -> bool {
        if !self.method.is_match(&call.name) || !self.arguments.accepts(call.args.len()) {
            return false;
        }

        match call.receiver.as_deref() {
            Some(receiver @ (Expr::Ident { .. } | Expr::FieldAccess { .. })) => {
                let span = receiver.span();
                let text = source.get(span.start..span.end).unwrap_or_default();
                self.declaring_type.matches(text, unit, None)
            }
            Some(_) => false,
            None => unit.imports().iter().filter(|import| import.is_static).any(|import| {
                if import.wildcard {
                    self.declaring_type.matches_qualified(&import.path)
                } else {
                    import.simple_name() == call.name
                        && import
                            .path
                            .rsplit_once('.')
                            .is_some_and(|(owner, _)| self.declaring_type.matches_qualified(owner))
                }
            }),
        }
    }
}

/// Qualified names `text` may denote: the unit's own resolution plus one guess per
/// on-demand import when the name is not otherwise bound.
fn candidate_names(text: &str, unit: &JavaUnit, context: Option<&str>) -> Vec<String> {
    let resolved = unit.resolve_type(text, context);
    let base = erase_type(text);
    let mut candidates = vec![resolved.qualified.clone()];

    let explicitly_bound = resolved.declared
        || base.contains('.')
        || unit
            .imports()
            .iter()
            .any(|import| !import.is_static && !import.wildcard && import.simple_name() == base);
    if !explicitly_bound {
        candidates.extend(
            unit.imports()
                .iter()
                .filter(|import| !import.is_static && import.wildcard)
                .map(|import| format!("{}.{base}", import.path)),
        );
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::{AnnotationPattern, ArgumentShape, MethodPattern, TypePattern};
    use crate::syntax::ParsedSource;
    use crate::syntax::model::Call;
    use crate::syntax::unit::JavaUnit;

    fn calls(source: &str) -> (ParsedSource, Vec<Call>) {
        let parsed = ParsedSource::parse(source.to_string()).expect("fixture should parse");
        let calls = parsed
            .nodes_of_kind("method_invocation")
            .into_iter()
            .filter_map(|node| Call::lower(node, parsed.text()))
            .collect();
        (parsed, calls)
    }

    #[test]
    fn type_pattern_wildcards_cover_segments_and_packages() {
        let single = TypePattern::parse("org.junit.*").expect("pattern should compile");
        assert!(single.matches_qualified("org.junit.Before"));
        assert!(!single.matches_qualified("org.junit.jupiter.api.BeforeEach"));

        let deep = TypePattern::parse("org..Before*").expect("pattern should compile");
        assert!(deep.matches_qualified("org.junit.Before"));
        assert!(deep.matches_qualified("org.junit.jupiter.api.BeforeEach"));
        assert!(!deep.matches_qualified("com.junit.Before"));
    }

    #[test]
    fn statically_imported_calls_match_their_declaring_type() {
        let (parsed, calls) = calls(
            "import static org.assertj.core.api.Assertions.assertThat;\n\
             class T { void t() { assertThat(a).isNull(); assertThat(a, b); } }",
        );
        let unit = JavaUnit::index(&parsed);
        let pattern = MethodPattern::parse("org.assertj.core.api.Assertions assertThat(*)")
            .expect("pattern should parse");

        let matched: Vec<(&str, bool)> = calls
            .iter()
            .map(|call| (call.name.as_str(), pattern.matches(call, &unit, parsed.text())))
            .collect();
        assert_eq!(
            matched,
            vec![("isNull", false), ("assertThat", true), ("assertThat", false)]
        );
    }

    #[test]
    fn qualified_receivers_resolve_through_imports() {
        let (parsed, calls) = calls(
            "import org.assertj.core.api.Assertions;\n\
             class T { void t() { Assertions.assertThat(a); Other.assertThat(a); } }",
        );
        let unit = JavaUnit::index(&parsed);
        let pattern = MethodPattern::parse("org.assertj.core.api.Assertions assertThat(..)")
            .expect("pattern should parse");
        assert!(pattern.matches(&calls[0], &unit, parsed.text()));
        assert!(!pattern.matches(&calls[1], &unit, parsed.text()));
    }

    #[test]
    fn annotations_resolve_through_on_demand_imports() {
        let parsed = ParsedSource::parse("import org.junit.*;\nclass T {}".to_string())
            .expect("fixture should parse");
        let unit = JavaUnit::index(&parsed);
        let before = AnnotationPattern::parse("@org.junit.Before").expect("pattern should parse");
        assert!(before.matches("Before", &unit));
        assert!(before.matches("org.junit.Before", &unit));
        assert!(!before.matches("BeforeEach", &unit));
    }

    #[test]
    fn argument_shapes_count_entries() {
        assert_eq!(ArgumentShape::parse(".."), ArgumentShape::Any);
        assert_eq!(ArgumentShape::parse(""), ArgumentShape::Exactly(0));
        assert_eq!(ArgumentShape::parse("*, java.lang.String"), ArgumentShape::Exactly(2));
    }
}
