//! Line-oriented indentation helpers used when statements move between nesting levels.

use super::Span;

const DEFAULT_UNIT_WIDTH: usize = 4;

/// Leading whitespace of the line containing `offset`.
pub fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = line_start(text, offset);
    let rest = &text[line_start..];
    let width = rest
        .char_indices()
        .find(|(_, character)| *character != ' ' && *character != '\t')
        .map_or(rest.len(), |(index, _)| index);
    &rest[..width]
}

pub fn line_start(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[..offset].rfind('\n').map_or(0, |index| index + 1)
}

/// The span of the lines holding `span`, including the line break that ends them when nothing
/// but whitespace follows `span` on its last line.
pub fn full_line(text: &str, span: Span) -> Span {
    let start = line_start(text, span.start);
    let end = match text[span.end..].find('\n') {
        Some(index) if text[span.end..span.end + index].trim().is_empty() => span.end + index + 1,
        _ => span.end,
    };
    Span::new(start, end)
}

/// Returns `true` when only whitespace precedes `offset` on its line.
pub fn starts_line(text: &str, offset: usize) -> bool {
    let start = line_start(text, offset);
    text[start..offset.min(text.len())]
        .chars()
        .all(|character| character == ' ' || character == '\t')
}

/// Guesses one indentation level: a tab when tab indentation dominates, else the
/// smallest positive step between consecutive indented lines.
pub fn detect_unit(text: &str) -> String {
    let mut tab_lines = 0usize;
    let mut space_lines = 0usize;
    let mut smallest_step: Option<usize> = None;
    let mut previous_width = 0usize;

    for line in text.lines() {
        let trimmed = line.trim_start_matches([' ', '\t']);
        if trimmed.is_empty() || trimmed.starts_with('*') {
            continue;
        }
        let leading = &line[..line.len() - trimmed.len()];
        if leading.starts_with('\t') {
            tab_lines += 1;
            continue;
        }
        let width = leading.len();
        if width > 0 {
            space_lines += 1;
        }
        if width > previous_width {
            let step = width - previous_width;
            smallest_step = Some(smallest_step.map_or(step, |current| current.min(step)));
        }
        previous_width = width;
    }

    if tab_lines > space_lines {
        return "\t".to_string();
    }
    " ".repeat(smallest_step.unwrap_or(DEFAULT_UNIT_WIDTH))
}

/// Adds `extra` at the start of every non-blank line that begins inside `segment`,
/// except lines starting inside one of the `protected` spans (text blocks).
///
/// The first line of the segment is left alone: it continues a line that started before it.
pub fn shift_lines(text: &str, segment: Span, extra: &str, protected: &[Span]) -> String {
    let body = &text[segment.start..segment.end];
    let mut shifted = String::with_capacity(body.len() + extra.len() * 8);

    for (index, line) in body.split('\n').enumerate() {
        if index > 0 {
            shifted.push('\n');
            let absolute = segment.start + offset_of_line(body, index);
            let inside_protected = protected
                .iter()
                .any(|span| span.start < absolute && absolute < span.end);
            if !line.trim().is_empty() && !inside_protected {
                shifted.push_str(extra);
            }
        }
        shifted.push_str(line);
    }

    shifted
}

/// Re-bases a multi-line fragment whose first line starts at a node boundary: every line
/// loses up to `from_width` columns of leading whitespace and gains `to_indent`.
pub fn rebase(fragment: &str, from_width: usize, to_indent: &str) -> String {
    let mut rebased = String::with_capacity(fragment.len() + to_indent.len() * 4);

    for (index, line) in fragment.split('\n').enumerate() {
        if index > 0 {
            rebased.push('\n');
        }
        let stripped = if index == 0 {
            line.trim_start_matches([' ', '\t'])
        } else {
            strip_columns(line, from_width)
        };
        if stripped.trim().is_empty() {
            continue;
        }
        rebased.push_str(to_indent);
        rebased.push_str(stripped.trim_end_matches([' ', '\t', '\r']));
    }

    rebased
}

fn strip_columns(line: &str, width: usize) -> &str {
    let mut removed = 0usize;
    for (index, character) in line.char_indices() {
        if removed >= width || (character != ' ' && character != '\t') {
            return &line[index..];
        }
        removed += 1;
    }
    ""
}

fn offset_of_line(body: &str, line_index: usize) -> usize {
    body.match_indices('\n')
        .nth(line_index - 1)
        .map_or(body.len(), |(index, _)| index + 1)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{detect_unit, full_line, line_indent, rebase, shift_lines, starts_line};
    use crate::syntax::Span;

    #[test]
    fn line_indent_returns_leading_whitespace_only() {
        let text = "class A {\n    void a() {\n        call();\n    }\n}\n";
        let offset = text.find("call").expect("call should exist");
        assert_eq!(line_indent(text, offset), "        ");
        assert!(starts_line(text, offset));
        assert!(!starts_line(text, offset + 2));
    }

    #[test]
    fn full_line_swallows_trailing_line_break() {
        let text = "a();\n    b();\n    c(); d();\n";
        let b = text.find("b()").expect("b should exist");
        let span = full_line(text, Span::new(b, b + 4));
        assert_eq!(&text[span.start..span.end], "    b();\n");
        let c = text.find("c()").expect("c should exist");
        let span = full_line(text, Span::new(c, c + 4));
        assert_eq!(&text[span.start..span.end], "    c();", "trailing code keeps the line break");
    }

    #[test]
    fn detect_unit_prefers_smallest_step() {
        let text = "class A {\n  void a() {\n    call();\n  }\n}\n";
        assert_eq!(detect_unit(text), "  ");
        assert_eq!(detect_unit("class A {}"), "    ", "flat files fall back to four spaces");
        assert_eq!(detect_unit("class A {\n\tvoid a() {\n\t\tb();\n\t}\n}\n"), "\t");
    }

    #[test]
    fn shift_lines_skips_first_line_blank_lines_and_text_blocks() {
        let text = "a;\n\n    b();\n    String s = \"\"\"\n  raw\n  \"\"\";\n";
        let block_start = text.find("\"\"\"").expect("text block should exist");
        let block_end = text.rfind("\"\"\"").expect("text block end should exist") + 3;
        let shifted = shift_lines(
            text,
            Span::new(2, text.len()),
            "    ",
            &[Span::new(block_start, block_end)],
        );
        assert_eq!(
            shifted,
            "\n\n        b();\n        String s = \"\"\"\n  raw\n  \"\"\";\n"
        );
    }

    #[test]
    fn rebase_moves_fragment_to_new_indent() {
        let fragment = "if (x) {\n                y();\n            }";
        assert_eq!(
            rebase(fragment, 12, "        "),
            "        if (x) {\n            y();\n        }"
        );
    }
}
