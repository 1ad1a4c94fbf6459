//! Rewrites JMockit `Expectations` and `MockUp` constructs into Mockito stubbing.
//!
//! Constructs are visited in document order. Each successful rewrite is applied and the file is
//! re-parsed before the next one; a construct that cannot be rewritten stays as written and is
//! reported with its [`SkipReason`].

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::edit::{TextEdit, apply_edits};
use crate::error::MigrateError;
use crate::execution_context::FileContext;
use crate::host::imports::ImportPlan;
use crate::host::template::TemplateError;
use crate::syntax::ParsedSource;
use crate::syntax::indent::line_indent;
use crate::syntax::unit::JavaUnit;

pub mod block;
pub mod classify;
pub mod lifecycle;
pub mod naming;
pub mod strategy;
pub mod synthesize;


use block::{Construct, expectation_block, find_constructs};
use classify::Classifier;
use lifecycle::{Lifetime, decide, hoist_edits};
use strategy::Planner;
use synthesize::{Layout, Synthesizer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("unresolved target: {0}")]
    UnresolvedTarget(String),
    #[error("ambiguous mock strategy: {0}")]
    AmbiguousStrategy(String),
    #[error("malformed expectation block: {0}")]
    MalformedExpectationBlock(String),
    #[error("unrecognized statement: {0}")]
    UnrecognizedStatement(String),
    #[error("generated code rejected: {0}")]
    TemplateRejected(String),
}

impl From<TemplateError> for SkipReason {
    fn from(error: TemplateError) -> Self {
        Self::TemplateRejected(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedConstruct {
    /// The construct's type as written, e.g. `MockUp<Clock>`.
    pub construct: String,
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JmockitOutcome {
    pub text: String,
    pub rewritten: usize,
    pub skipped: Vec<SkippedConstruct>,
}

struct ConstructRewrite {
    edits: Vec<TextEdit>,
    imports: ImportPlan,
}

/// Rewrites every construct in `text` it can. Import changes are queued on `context`.
pub(crate) fn rewrite(
    text: String,
    context: &mut FileContext<'_>,
    file: &str,
) -> Result<JmockitOutcome, MigrateError> {
    let mut outcome = JmockitOutcome {
        text,
        ..JmockitOutcome::default()
    };

    loop {
        let parsed = ParsedSource::parse(outcome.text.clone())
            .map_err(|error| error.into_migrate_error(file))?;
        let unit = JavaUnit::index(&parsed);
        let constructs = find_constructs(&parsed, &unit);
        // Skipped constructs stay in place, so the next candidate sits right after them.
        let Some(construct) = constructs.get(outcome.skipped.len()) else {
            break;
        };
        let label = construct_label(construct, &parsed);
        let line = construct.line();

        let rewritten = transpile(construct, &parsed, &unit, context).and_then(|rewrite| {
            let next = apply_edits(parsed.text(), rewrite.edits)
                .map_err(|error| SkipReason::TemplateRejected(error.to_string()))?;
            if let Err(error) = ParsedSource::parse(next.clone()) {
                return Err(SkipReason::TemplateRejected(format!(
                    "rewritten file does not parse: {error}"
                )));
            }
            Ok((next, rewrite.imports))
        });

        match rewritten {
            Ok((next, imports)) => {
                debug!(file, construct = %label, line, "rewrote construct");
                context.imports.merge(imports);
                context.names.check_invariant()?;
                outcome.text = next;
                outcome.rewritten += 1;
            }
            Err(reason) => {
                warn!(file, construct = %label, line, reason = %reason, "skipped construct");
                outcome.skipped.push(SkippedConstruct {
                    construct: label,
                    line,
                    reason,
                });
            }
        }
    }

    Ok(outcome)
}

fn transpile(
    construct: &Construct<'_>,
    parsed: &ParsedSource,
    unit: &JavaUnit,
    context: &mut FileContext<'_>,
) -> Result<ConstructRewrite, SkipReason> {
    let source = parsed.text();
    let config = context.config;
    let block = expectation_block(construct, parsed, unit)?;
    let classified =
        Classifier::new(config, unit, source, construct.creation.start_byte()).classify(&block)?;

    let lifetime = decide(block.statement, source, config);
    let hoisted = matches!(lifetime, Lifetime::Hoisted(_));
    if hoisted
        && classified
            .entries
            .iter()
            .any(|entry| entry.cardinality.is_some())
    {
        return Err(SkipReason::UnrecognizedStatement(
            "invocation counts cannot be checked from a setup hook".to_string(),
        ));
    }

    let groups = Planner::new(unit, source, block.statement).plan(&classified, &mut context.names)?;
    debug!(
        construct = construct.kind.label(),
        groups = groups.len(),
        hoisted,
        "planned mock groups"
    );

    let indent = line_indent(source, block.statement.start_byte());
    let layout = Layout {
        indent,
        unit: &context.indent_unit,
    };
    let synthesizer = Synthesizer::new(&classified, unit, layout, hoisted);
    let mut synthesis = synthesizer.synthesize(&groups, &block.source)?;

    let mut edits = vec![synthesizer.replacement(&synthesis, block.statement, parsed)];
    if let Lifetime::Hoisted(target) = &lifetime {
        edits.extend(hoist_edits(
            target,
            &synthesis.hoisted,
            source,
            &context.indent_unit,
            &mut synthesis.imports,
        )?);
    }

    Ok(ConstructRewrite {
        edits,
        imports: synthesis.imports,
    })
}

fn construct_label(construct: &Construct<'_>, parsed: &ParsedSource) -> String {
    construct
        .creation
        .child_by_field_name("type")
        .map_or_else(
            || construct.kind.label().to_string(),
            |ty| parsed.node_text(ty).to_string(),
        )
}
