use std::path::Path;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MigrateError {
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize response JSON: {source}")]
    ResponseSerialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid configuration '{path}': {message}")]
    InvalidConfig { path: String, message: String },

    #[error("File '{path}' is busy: another rewrite is in progress")]
    ResourceBusy { path: String },

    #[error("Tree-sitter language initialization failed: {message}")]
    LanguageSetup { message: String },

    #[error("Failed to parse '{file}' as Java: {message}")]
    ParseFailure { file: String, message: String },

    #[error(
        "File changed while it was being rewritten. Expected hash '{expected_hash}', got '{actual_hash}'"
    )]
    PreconditionFailed {
        expected_hash: String,
        actual_hash: String,
    },

    #[error("Synthesized name '{name}' was issued for both '{first}' and '{second}'")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },
}

impl MigrateError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io_error",
            Self::ResponseSerialization { .. } => "serialization_error",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::ResourceBusy { .. } => "resource_busy",
            Self::LanguageSetup { .. } | Self::ParseFailure { .. } => "parse_failure",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::NameCollision { .. } => "name_collision",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let suggestion = match self {
            Self::InvalidConfig { .. } => Some(
                "Known keys: mock_annotations, setup_hooks, indent, passes, include".to_string(),
            ),
            Self::ResourceBusy { .. } => {
                Some("Retry after the current rewrite completes".to_string())
            }
            Self::PreconditionFailed { .. } => {
                Some("Re-run 'testmigrate rewrite' against the updated file".to_string())
            }
            Self::NameCollision { .. } => Some(
                "The file was left unchanged; please report the input that triggered this"
                    .to_string(),
            ),
            Self::ParseFailure { .. } => {
                Some("Only syntactically valid Java sources are rewritten".to_string())
            }
            Self::Io { .. }
            | Self::ResponseSerialization { .. }
            | Self::InvalidRequest { .. }
            | Self::LanguageSetup { .. } => None,
        };

        ErrorResponse {
            error: ErrorBody {
                r#type: self.error_type().to_string(),
                message: self.to_string(),
                suggestion,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub r#type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}
