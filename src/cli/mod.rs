use clap::{Parser, Subcommand};

pub mod rewrite;

#[derive(Debug, Parser)]
#[command(name = "testmigrate")]
#[command(version, about = "Migrates JMockit tests to Mockito and collapses AssertJ assertions")]
#[command(
    long_about = "Rewrites JMockit Expectations and MockUp blocks into Mockito stubbing and folds consecutive AssertJ assertions into chains. Output is JSON on stdout; set TESTMIGRATE_LOG for diagnostics on stderr."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Rewrite files and report the result, writing in place with --write")]
    Rewrite(rewrite::RewriteArgs),
    #[command(about = "Report which files a rewrite would change; exits 1 if any would")]
    Check(rewrite::CheckArgs),
}
