use thiserror::Error;

use crate::syntax::Span;

/// Replace `span` of the source with `replacement`; an empty span is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::new(offset, offset), text)
    }

    pub fn delete(span: Span) -> Self {
        Self::replace(span, String::new())
    }

    fn is_insert(&self) -> bool {
        self.span.start == self.span.end
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("edit [{start}, {end}) is outside the source or splits a UTF-8 character")]
    OutOfBounds { start: usize, end: usize },
    #[error("overlapping edits are not supported: [{}, {}) conflicts with [{}, {})", first.start, first.end, second.start, second.end)]
    Overlap { first: Span, second: Span },
}

/// Applies `edits` to `source`.
///
/// Edits may touch but not overlap. Insertions at one offset keep their submission order, and an
/// insertion at the start of a replaced span lands before the replacement.
pub fn apply_edits(source: &str, edits: Vec<TextEdit>) -> Result<String, EditError> {
    let mut ordered: Vec<(usize, TextEdit)> = edits.into_iter().enumerate().collect();
    ordered.sort_by_key(|(index, edit)| {
        (edit.span.start, !edit.is_insert(), edit.span.end, *index)
    });
    ensure_non_overlapping(&ordered)?;

    let mut text = source.to_string();
    for (_, edit) in ordered.iter().rev() {
        let range = edit.span.start..edit.span.end;
        if text.get(range.clone()).is_none() {
            return Err(EditError::OutOfBounds {
                start: edit.span.start,
                end: edit.span.end,
            });
        }
        text.replace_range(range, &edit.replacement);
    }

    Ok(text)
}

fn ensure_non_overlapping(ordered: &[(usize, TextEdit)]) -> Result<(), EditError> {
    for window in ordered.windows(2) {
        let first = &window[0].1;
        let second = &window[1].1;
        if first.span.end > second.span.start {
            return Err(EditError::Overlap {
                first: first.span,
                second: second.span,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{EditError, TextEdit, apply_edits};
    use crate::syntax::Span;

    #[test]
    fn edits_apply_independently_of_submission_order() {
        let source = "alpha beta gamma";
        let edited = apply_edits(
            source,
            vec![
                TextEdit::replace(Span::new(11, 16), "GAMMA"),
                TextEdit::replace(Span::new(0, 5), "ALPHA"),
                TextEdit::delete(Span::new(5, 10)),
            ],
        )
        .expect("disjoint edits should apply");
        assert_eq!(edited, "ALPHA GAMMA");
    }

    #[test]
    fn insertions_at_same_offset_keep_submission_order() {
        let edited = apply_edits(
            "{}",
            vec![
                TextEdit::insert(1, "first;"),
                TextEdit::insert(1, "second;"),
                TextEdit::replace(Span::new(1, 2), "}"),
            ],
        )
        .expect("touching edits should apply");
        assert_eq!(edited, "{first;second;}");
    }

    #[test]
    fn overlapping_replacements_are_rejected() {
        let error = apply_edits(
            "abcdef",
            vec![
                TextEdit::replace(Span::new(0, 3), "x"),
                TextEdit::replace(Span::new(2, 5), "y"),
            ],
        )
        .expect_err("overlap should fail");
        assert!(matches!(error, EditError::Overlap { .. }));
    }

    #[test]
    fn out_of_bounds_edits_are_rejected() {
        let error = apply_edits("abc", vec![TextEdit::insert(9, "x")])
            .expect_err("out of range insert should fail");
        assert_eq!(error, EditError::OutOfBounds { start: 9, end: 9 });
    }
}
