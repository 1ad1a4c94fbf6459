//! Collapses runs of single-step AssertJ assertions on one subject into fluent chains.

use tracing::debug;

use crate::edit::apply_edits;
use crate::error::MigrateError;
use crate::host::matcher::MethodPattern;
use crate::syntax::ParsedSource;
use crate::syntax::unit::JavaUnit;

pub mod collapse;

use collapse::{ASSERT_THAT, Collapser};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseOutcome {
    pub text: String,
    /// Statements folded into chains.
    pub collapsed: usize,
}

/// Collapses every run in `text`. Runs nested inside another run's arguments are handled on an
/// earlier round than the run around them.
pub fn collapse_source(
    text: String,
    indent_unit: &str,
    file: &str,
) -> Result<CollapseOutcome, MigrateError> {
    let pattern = MethodPattern::parse(ASSERT_THAT).map_err(|error| MigrateError::InvalidRequest {
        message: error.to_string(),
    })?;
    let mut outcome = CollapseOutcome {
        text,
        collapsed: 0,
    };

    loop {
        let parsed = ParsedSource::parse(outcome.text.clone())
            .map_err(|error| error.into_migrate_error(file))?;
        let unit = JavaUnit::index(&parsed);
        let runs = Collapser::new(&parsed, &unit, &pattern, indent_unit).runs();
        if runs.is_empty() {
            break;
        }

        let statements: usize = runs.iter().map(|run| run.statements).sum();
        debug!(file, runs = runs.len(), statements, "collapsing assertion runs");
        let next = apply_edits(parsed.text(), runs.iter().map(|run| run.edit()).collect())
            .map_err(|error| MigrateError::InvalidRequest {
                message: format!("assertion chains for '{file}' overlap: {error}"),
            })?;
        outcome.text = next;
        outcome.collapsed += statements;
    }

    Ok(outcome)
}
