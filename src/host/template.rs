use thiserror::Error;

use crate::syntax::{first_error_position, parse_tree};

const SLOT: &str = "#{}";
const STATEMENT_PROLOGUE: &str = "class __Template {\n    void __template() {\n";
const STATEMENT_EPILOGUE: &str = "\n    }\n}\n";
const MEMBER_PROLOGUE: &str = "class __Template {\n";
const MEMBER_EPILOGUE: &str = "\n}\n";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template expects {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("template output does not parse (line {line}, column {column}): {text}")]
    Rejected {
        line: usize,
        column: usize,
        text: String,
    },
    #[error("tree-sitter could not parse template output: {message}")]
    Parser { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateContext {
    Statements,
    Members,
}

/// Positional `#{}` substitution whose output is re-parsed before it is handed back.
#[derive(Debug, Clone, Copy)]
pub struct Template<'t> {
    text: &'t str,
    context: TemplateContext,
}

impl<'t> Template<'t> {
    /// A template producing statements for a method body.
    pub fn new(text: &'t str) -> Self {
        Self {
            text,
            context: TemplateContext::Statements,
        }
    }

    /// A template producing class members (fields, methods).
    pub fn members(text: &'t str) -> Self {
        Self {
            text,
            context: TemplateContext::Members,
        }
    }

    pub fn slots(&self) -> usize {
        self.text.matches(SLOT).count()
    }

    pub fn apply<S: AsRef<str>>(&self, args: &[S]) -> Result<String, TemplateError> {
        let expected = self.slots();
        if expected != args.len() {
            return Err(TemplateError::ArityMismatch {
                expected,
                actual: args.len(),
            });
        }

        let mut output = String::with_capacity(self.text.len() + 32 * args.len());
        let mut pieces = self.text.split(SLOT);
        if let Some(first) = pieces.next() {
            output.push_str(first);
        }
        for (piece, arg) in pieces.zip(args) {
            output.push_str(arg.as_ref());
            output.push_str(piece);
        }

        self.validate(&output)?;
        Ok(output)
    }

    fn validate(&self, output: &str) -> Result<(), TemplateError> {
        let (prologue, epilogue) = match self.context {
            TemplateContext::Statements => (STATEMENT_PROLOGUE, STATEMENT_EPILOGUE),
            TemplateContext::Members => (MEMBER_PROLOGUE, MEMBER_EPILOGUE),
        };
        let wrapped = format!("{prologue}{output}{epilogue}");
        let tree = parse_tree(&wrapped).map_err(|error| TemplateError::Parser {
            message: error.to_string(),
        })?;

        if let Some((line, column)) = first_error_position(tree.root_node()) {
            let prologue_lines = prologue.matches('\n').count();
            return Err(TemplateError::Rejected {
                line: line.saturating_sub(prologue_lines).max(1),
                column,
                text: output.to_string(),
            });
        }
        Ok(())
    }
}
