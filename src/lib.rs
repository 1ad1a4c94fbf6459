mod execution_context;
mod write;

pub mod assertj;
pub mod cli;
pub mod config;
pub mod edit;
pub mod error;
pub mod hash;
pub mod host;
pub mod jmockit;
pub mod rewrite;
pub mod syntax;

pub use execution_context::ExecutionContext;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
