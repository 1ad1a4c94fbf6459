use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::config::{Config, Pass};
use crate::error::{ErrorBody, MigrateError};
use crate::execution_context::ExecutionContext;
use crate::rewrite::{RewriteResponse, rewrite_paths};

#[derive(Debug, Args)]
pub struct PassOptions {
    #[arg(
        long,
        value_name = "FILE",
        help = "Configuration file (.toml, .yaml/.yml or .json); defaults to ./testmigrate.toml when present"
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long = "pass",
        value_enum,
        value_name = "PASS",
        help = "Run only the named pass; repeat to select several"
    )]
    pub passes: Vec<Pass>,
}

impl PassOptions {
    fn context(&self) -> Result<ExecutionContext, MigrateError> {
        let mut config = Config::load(self.config.as_deref())?;
        if !self.passes.is_empty() {
            config.passes = self.passes.clone();
        }
        Ok(ExecutionContext::new(config))
    }
}

#[derive(Debug, Args)]
pub struct RewriteArgs {
    #[arg(long, help = "Commit changes in place instead of returning new_text")]
    pub write: bool,
    #[command(flatten)]
    pub options: PassOptions,
    #[arg(
        value_name = "PATH",
        required = true,
        help = "Java files, or directories searched with the configured include glob"
    )]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub options: PassOptions,
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub files_scanned: usize,
    pub would_change: Vec<String>,
    pub failed: Vec<CheckFailure>,
}

#[derive(Debug, Serialize)]
pub struct CheckFailure {
    pub file: String,
    pub error: ErrorBody,
}

impl CheckResponse {
    /// `true` when nothing would change and every file was processed.
    pub fn is_clean(&self) -> bool {
        self.would_change.is_empty() && self.failed.is_empty()
    }
}

pub fn run_rewrite(args: RewriteArgs) -> Result<RewriteResponse, MigrateError> {
    let context = args.options.context()?;
    rewrite_paths(&context, &args.paths, args.write)
}

pub fn run_check(args: CheckArgs) -> Result<CheckResponse, MigrateError> {
    let context = args.options.context()?;
    let response = rewrite_paths(&context, &args.paths, false)?;

    let mut would_change = Vec::new();
    let mut failed = Vec::new();
    for report in response.files {
        match report.error {
            Some(error) => failed.push(CheckFailure {
                file: report.file,
                error,
            }),
            None if report.changed => would_change.push(report.file),
            None => {}
        }
    }

    Ok(CheckResponse {
        files_scanned: response.summary.files_scanned,
        would_change,
        failed,
    })
}
