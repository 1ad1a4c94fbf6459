use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::edit::TextEdit;
use crate::syntax::indent::{full_line, line_start};
use crate::syntax::unit::{ImportDecl, JavaUnit, split_qualified};
use crate::syntax::{ParsedSource, text_of};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ImportRequest {
    qualified: String,
    member: Option<String>,
}

impl ImportRequest {
    fn sort_key(&self) -> String {
        match &self.member {
            Some(member) => format!("{}.{member}", self.qualified),
            None => self.qualified.clone(),
        }
    }

    fn line(&self) -> String {
        match &self.member {
            Some(member) => format!("import static {}.{member};", self.qualified),
            None => format!("import {};", self.qualified),
        }
    }
}

/// Import additions and conditional removals accumulated over a file's rewrites and turned into
/// text edits once, against the final source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    ensure: BTreeSet<ImportRequest>,
    remove_if_unused: BTreeSet<String>,
}

impl ImportPlan {
    /// Requests `import qualified;`, or `import static qualified.member;` when a member is given
    /// (`*` for an on-demand static import).
    pub fn ensure_import(&mut self, qualified: &str, static_member: Option<&str>) {
        self.ensure.insert(ImportRequest {
            qualified: qualified.to_string(),
            member: static_member.map(ToString::to_string),
        });
    }

    pub fn remove_import_if_unused(&mut self, qualified: &str) {
        self.remove_if_unused.insert(qualified.to_string());
    }

    pub fn merge(&mut self, other: ImportPlan) {
        self.ensure.extend(other.ensure);
        self.remove_if_unused.extend(other.remove_if_unused);
    }

    pub fn is_empty(&self) -> bool {
        self.ensure.is_empty() && self.remove_if_unused.is_empty()
    }

    pub fn edits(&self, parsed: &ParsedSource, unit: &JavaUnit) -> Vec<TextEdit> {
        let text = parsed.text();
        let referenced = referenced_names(parsed);

        let removed: Vec<&ImportDecl> = unit
            .imports()
            .iter()
            .filter(|import| {
                !import.is_static
                    && !import.wildcard
                    && self.remove_if_unused.contains(&import.path)
                    && !referenced.contains(import.simple_name())
            })
            .collect();
        let kept: Vec<&ImportDecl> = unit
            .imports()
            .iter()
            .filter(|import| !removed.contains(import))
            .collect();

        let mut edits: Vec<TextEdit> = removed
            .iter()
            .map(|import| TextEdit::delete(full_line(text, import.span)))
            .collect();

        let missing: Vec<&ImportRequest> = self
            .ensure
            .iter()
            .filter(|request| !already_imported(request, unit))
            .collect();
        let (statics, types): (Vec<&ImportRequest>, Vec<&ImportRequest>) = missing
            .into_iter()
            .partition(|request| request.member.is_some());

        let kept_types: Vec<&ImportDecl> =
            kept.iter().copied().filter(|import| !import.is_static).collect();
        let kept_statics: Vec<&ImportDecl> =
            kept.iter().copied().filter(|import| import.is_static).collect();

        edits.extend(group_edits(text, &kept_types, &types, || {
            match kept_statics.first() {
                Some(first) => Fallback::Before(line_start(text, first.span.start)),
                None => package_fallback(parsed),
            }
        }));
        edits.extend(group_edits(text, &kept_statics, &statics, || {
            match kept.last() {
                Some(last) => Fallback::After(last.span.end),
                None => package_fallback(parsed),
            }
        }));
        edits
    }
}

enum Fallback {
    /// Insert the group as lines ahead of `offset`, followed by a blank line.
    Before(usize),
    /// Insert the group after `offset`, separated by a blank line.
    After(usize),
    /// No package and no imports: the group opens the file.
    Top,
}

fn group_edits<F>(
    text: &str,
    existing: &[&ImportDecl],
    requests: &[&ImportRequest],
    fallback: F,
) -> Vec<TextEdit>
where
    F: FnOnce() -> Fallback,
{
    if requests.is_empty() {
        return Vec::new();
    }

    if existing.is_empty() {
        let lines: Vec<String> = requests.iter().map(|request| request.line()).collect();
        let block = lines.join("\n");
        return vec![match fallback() {
            Fallback::Before(offset) => TextEdit::insert(offset, format!("{block}\n\n")),
            Fallback::After(offset) => TextEdit::insert(offset, format!("\n\n{block}")),
            Fallback::Top => TextEdit::insert(0, format!("{block}\n\n")),
        }];
    }

    let mut edits = Vec::with_capacity(requests.len());
    for request in requests {
        let key = request.sort_key();
        let successor = existing.iter().find(|import| import_key(import) > key);
        edits.push(match successor {
            Some(import) => TextEdit::insert(
                line_start(text, import.span.start),
                format!("{}\n", request.line()),
            ),
            None => {
                let last = existing[existing.len() - 1];
                TextEdit::insert(last.span.end, format!("\n{}", request.line()))
            }
        });
    }
    edits
}

fn package_fallback(parsed: &ParsedSource) -> Fallback {
    crate::syntax::named_children(parsed.root())
        .into_iter()
        .find(|node| node.kind() == "package_declaration")
        .map_or(Fallback::Top, |package| Fallback::After(package.end_byte()))
}

fn import_key(import: &ImportDecl) -> String {
    if import.wildcard {
        format!("{}.*", import.path)
    } else {
        import.path.clone()
    }
}

fn already_imported(request: &ImportRequest, unit: &JavaUnit) -> bool {
    let imports = unit.imports();
    match request.member.as_deref() {
        Some(member) => imports.iter().filter(|import| import.is_static).any(|import| {
            (import.wildcard && import.path == request.qualified)
                || (!import.wildcard && import.path == format!("{}.{member}", request.qualified))
        }),
        None => {
            let (package, path) = split_qualified(&request.qualified);
            let top_level = !path.contains('.');
            (top_level && package == "java.lang")
                || (top_level && unit.package().unwrap_or_default() == package)
                || imports.iter().filter(|import| !import.is_static).any(|import| {
                    (import.wildcard && top_level && import.path == package)
                        || (!import.wildcard && import.path == request.qualified)
                })
        }
    }
}

/// Simple names referenced anywhere outside the package and import declarations.
fn referenced_names(parsed: &ParsedSource) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_references(parsed.root(), parsed.text(), &mut names);
    names
}

fn collect_references(node: Node<'_>, source: &str, names: &mut BTreeSet<String>) {
    match node.kind() {
        "import_declaration" | "package_declaration" => return,
        "identifier" | "type_identifier" => {
            names.insert(text_of(node, source).to_string());
            return;
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_references(child, source, names);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::ImportPlan;
    use crate::edit::apply_edits;
    use crate::syntax::ParsedSource;
    use crate::syntax::unit::JavaUnit;

    fn run(plan: &ImportPlan, source: &str) -> String {
        let parsed = ParsedSource::parse(source.to_string()).expect("fixture should parse");
        let unit = JavaUnit::index(&parsed);
        apply_edits(source, plan.edits(&parsed, &unit)).expect("import edits should apply")
    }

    #[test]
    fn additions_land_in_sorted_position_and_unused_imports_go() {
        let mut plan = ImportPlan::default();
        plan.ensure_import("org.mockito.MockedConstruction", None);
        plan.ensure_import("org.mockito.Mockito", Some("*"));
        plan.ensure_import("org.mockito.AdditionalAnswers", Some("delegatesTo"));
        plan.remove_import_if_unused("mockit.MockUp");
        plan.remove_import_if_unused("mockit.Mock");

        let source = "import com.foo.MyClazz;\n\
                      import org.junit.Test;\n\
                      import mockit.Mock;\n\
                      import mockit.MockUp;\n\
                      import static org.junit.Assert.assertEquals;\n\
                      \n\
                      class T { @Test void t() { new MyClazz(); } }\n";

        assert_eq!(
            run(&plan, source),
            "import com.foo.MyClazz;\n\
             import org.junit.Test;\n\
             import org.mockito.MockedConstruction;\n\
             import static org.junit.Assert.assertEquals;\n\
             import static org.mockito.AdditionalAnswers.delegatesTo;\n\
             import static org.mockito.Mockito.*;\n\
             \n\
             class T { @Test void t() { new MyClazz(); } }\n"
        );
    }

    #[test]
    fn used_imports_and_covered_requests_are_left_alone() {
        let mut plan = ImportPlan::default();
        plan.ensure_import("org.junit.After", None);
        plan.ensure_import("org.mockito.Mockito", Some("mock"));
        plan.remove_import_if_unused("mockit.Mocked");

        let source = "import org.junit.*;\n\
                      import mockit.Mocked;\n\
                      import static org.mockito.Mockito.*;\n\
                      \n\
                      class T { @Mocked Object o; }\n";

        assert_eq!(run(&plan, source), source);
    }

    #[test]
    fn first_static_import_follows_package_with_blank_line() {
        let mut plan = ImportPlan::default();
        plan.ensure_import("org.mockito.Mockito", Some("*"));

        assert_eq!(
            run(&plan, "package a;\n\nclass T {}\n"),
            "package a;\n\nimport static org.mockito.Mockito.*;\n\nclass T {}\n"
        );
    }
}
