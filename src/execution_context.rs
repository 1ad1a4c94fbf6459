use std::path::Path;

use crate::config::Config;
use crate::error::MigrateError;
use crate::host::imports::ImportPlan;
use crate::jmockit::naming::NameTable;
use crate::syntax::indent::detect_unit;

/// Run-scoped context that owns the loaded configuration and hands out per-file state.
pub struct ExecutionContext {
    config: Config,
}

impl ExecutionContext {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn read_file_utf8(&self, file: &Path) -> Result<String, MigrateError> {
        let source = std::fs::read(file).map_err(|error| MigrateError::io(file, error))?;
        String::from_utf8(source).map_err(|error| {
            MigrateError::io(
                file,
                std::io::Error::new(std::io::ErrorKind::InvalidData, error),
            )
        })
    }

    /// Fresh state for one file. Never shared between files or threads.
    pub(crate) fn file_context(&self, source: &str, identifiers: impl IntoIterator<Item = String>) -> FileContext<'_> {
        let indent_unit = match self.config.indent {
            Some(width) => " ".repeat(width),
            None => detect_unit(source),
        };
        FileContext {
            config: &self.config,
            names: NameTable::new(identifiers),
            indent_unit,
            imports: ImportPlan::default(),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

pub(crate) struct FileContext<'c> {
    pub(crate) config: &'c Config,
    pub(crate) names: NameTable,
    pub(crate) indent_unit: String,
    pub(crate) imports: ImportPlan,
}
