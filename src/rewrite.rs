use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::assertj::collapse_source;
use crate::config::Pass;
use crate::edit::apply_edits;
use crate::error::{ErrorBody, MigrateError};
use crate::execution_context::ExecutionContext;
use crate::hash::source_fingerprint;
use crate::jmockit::{self, SkippedConstruct};
use crate::syntax::ParsedSource;
use crate::syntax::unit::JavaUnit;
use crate::write::commit_rewrite;

/// The outcome of running the enabled passes over one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRewrite {
    pub text: String,
    pub constructs_rewritten: usize,
    pub assertions_collapsed: usize,
    pub skipped: Vec<SkippedConstruct>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub changed: bool,
    pub old_hash: String,
    pub new_hash: String,
    pub constructs_rewritten: usize,
    pub assertions_collapsed: usize,
    pub skipped: Vec<SkippedConstruct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteSummary {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub files_failed: usize,
    pub constructs_rewritten: usize,
    pub constructs_skipped: usize,
    pub assertions_collapsed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteResponse {
    pub summary: RewriteSummary,
    pub written: bool,
    pub files: Vec<FileReport>,
}

/// Runs the enabled passes in order, then settles imports against the final text.
pub fn rewrite_source(
    context: &ExecutionContext,
    source: &str,
    file: &str,
) -> Result<SourceRewrite, MigrateError> {
    let parsed =
        ParsedSource::parse(source.to_string()).map_err(|error| error.into_migrate_error(file))?;
    let unit = JavaUnit::index(&parsed);
    let mut file_context = context.file_context(source, unit.identifiers().iter().cloned());
    let config = context.config();

    let mut rewrite = SourceRewrite {
        text: source.to_string(),
        constructs_rewritten: 0,
        assertions_collapsed: 0,
        skipped: Vec::new(),
    };

    if config.pass_enabled(Pass::Jmockit) {
        let outcome = jmockit::rewrite(rewrite.text, &mut file_context, file)?;
        rewrite.text = outcome.text;
        rewrite.constructs_rewritten = outcome.rewritten;
        rewrite.skipped = outcome.skipped;
    }

    if config.pass_enabled(Pass::Assertj) {
        let outcome = collapse_source(rewrite.text, &file_context.indent_unit, file)?;
        rewrite.text = outcome.text;
        rewrite.assertions_collapsed = outcome.collapsed;
    }

    if !file_context.imports.is_empty() {
        let parsed =
            ParsedSource::parse(rewrite.text).map_err(|error| error.into_migrate_error(file))?;
        let unit = JavaUnit::index(&parsed);
        let edits = file_context.imports.edits(&parsed, &unit);
        rewrite.text = apply_edits(parsed.text(), edits).map_err(|error| {
            MigrateError::InvalidRequest {
                message: format!("import edits for '{file}' could not be applied: {error}"),
            }
        })?;
    }

    Ok(rewrite)
}

/// Rewrites every file under `paths` in parallel. Per-file failures are reported in the
/// response; only input expansion errors fail the whole run.
pub fn rewrite_paths(
    context: &ExecutionContext,
    paths: &[PathBuf],
    write: bool,
) -> Result<RewriteResponse, MigrateError> {
    let files = expand_paths(paths, &context.config().include)?;
    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|file| rewrite_file(context, file, write))
        .collect();

    let mut summary = RewriteSummary {
        files_scanned: reports.len(),
        ..RewriteSummary::default()
    };
    for report in &reports {
        summary.files_changed += usize::from(report.changed);
        summary.files_failed += usize::from(report.error.is_some());
        summary.constructs_rewritten += report.constructs_rewritten;
        summary.constructs_skipped += report.skipped.len();
        summary.assertions_collapsed += report.assertions_collapsed;
    }

    Ok(RewriteResponse {
        summary,
        written: write,
        files: reports,
    })
}

fn rewrite_file(context: &ExecutionContext, path: &Path, write: bool) -> FileReport {
    let file = path.display().to_string();
    let source = match context.read_file_utf8(path) {
        Ok(source) => source,
        Err(error) => return failed_report(file, String::new(), &error),
    };
    let old_hash = source_fingerprint(&source);

    let rewrite = match rewrite_source(context, &source, &file) {
        Ok(rewrite) => rewrite,
        Err(error) => return failed_report(file, old_hash, &error),
    };
    let changed = rewrite.text != source;
    let new_hash = source_fingerprint(&rewrite.text);

    if write
        && changed
        && let Err(error) = commit_rewrite(path, &rewrite.text, &old_hash)
    {
        return failed_report(file, old_hash, &error);
    }
    if changed {
        info!(
            file = %file,
            constructs = rewrite.constructs_rewritten,
            assertions = rewrite.assertions_collapsed,
            written = write,
            "rewrote file"
        );
    }

    FileReport {
        file,
        changed,
        old_hash,
        new_hash,
        constructs_rewritten: rewrite.constructs_rewritten,
        assertions_collapsed: rewrite.assertions_collapsed,
        skipped: rewrite.skipped,
        new_text: (!write).then_some(rewrite.text),
        error: None,
    }
}

fn failed_report(file: String, old_hash: String, error: &MigrateError) -> FileReport {
    warn!(file = %file, error = %error, "file left unchanged");
    FileReport {
        file,
        changed: false,
        new_hash: old_hash.clone(),
        old_hash,
        constructs_rewritten: 0,
        assertions_collapsed: 0,
        skipped: Vec::new(),
        new_text: None,
        error: Some(error.to_error_response().error),
    }
}

/// Files named on the command line plus the `include` matches under each directory, sorted and
/// without repeats.
fn expand_paths(paths: &[PathBuf], include: &str) -> Result<Vec<PathBuf>, MigrateError> {
    if paths.is_empty() {
        return Err(MigrateError::InvalidRequest {
            message: "at least one file or directory is required".to_string(),
        });
    }

    let mut seen = BTreeSet::new();
    let mut files = Vec::new();
    for path in paths {
        let candidates = if path.is_dir() {
            directory_matches(path, include)?
        } else {
            vec![path.clone()]
        };
        for candidate in candidates {
            let key = fs::canonicalize(&candidate).unwrap_or_else(|_| candidate.clone());
            if seen.insert(key) {
                files.push(candidate);
            }
        }
    }
    Ok(files)
}

fn directory_matches(directory: &Path, include: &str) -> Result<Vec<PathBuf>, MigrateError> {
    let root = glob::Pattern::escape(&directory.display().to_string());
    let pattern = format!("{root}/**/{include}");
    let entries = glob::glob(&pattern).map_err(|error| MigrateError::InvalidRequest {
        message: format!("include pattern '{pattern}': {}", error.msg),
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        let path = entry.map_err(|error| {
            let path = error.path().to_path_buf();
            MigrateError::io(&path, error.into())
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}
