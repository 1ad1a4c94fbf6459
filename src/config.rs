use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

pub const DEFAULT_CONFIG_FILE: &str = "testmigrate.toml";

const DEFAULT_MOCK_ANNOTATIONS: &[&str] = &[
    "mockit.Mocked",
    "org.mockito.Mock",
    "mockit.Injectable",
    "mockit.Tested",
    "org.mockito.InjectMocks",
];

const DEFAULT_SETUP_HOOKS: &[(&str, &str)] = &[
    ("org.junit.Before", "org.junit.After"),
    ("org.junit.BeforeClass", "org.junit.AfterClass"),
    ("org.junit.jupiter.api.BeforeEach", "org.junit.jupiter.api.AfterEach"),
    ("org.junit.jupiter.api.BeforeAll", "org.junit.jupiter.api.AfterAll"),
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    Jmockit,
    Assertj,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Annotations marking a field or parameter as a mock-role variable.
    pub mock_annotations: Vec<String>,
    /// Setup-hook annotation mapped to the teardown annotation that pairs with it.
    pub setup_hooks: BTreeMap<String, String>,
    /// Indent width in spaces; detected from the source when absent.
    pub indent: Option<usize>,
    pub passes: Vec<Pass>,
    /// File-name glob applied when a directory is given on the command line.
    pub include: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mock_annotations: DEFAULT_MOCK_ANNOTATIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            setup_hooks: DEFAULT_SETUP_HOOKS
                .iter()
                .map(|(setup, teardown)| (setup.to_string(), teardown.to_string()))
                .collect(),
            indent: None,
            passes: vec![Pass::Jmockit, Pass::Assertj],
            include: "*.java".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl Config {
    /// Loads `explicit` when given, else `testmigrate.toml` from the working directory, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, MigrateError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let implicit = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !implicit.is_file() {
                    return Ok(Self::default());
                }
                implicit
            }
        };

        let text =
            std::fs::read_to_string(&path).map_err(|error| MigrateError::io(&path, error))?;
        let config = Self::from_str_with_format(&text, detect_format(&path)?)
            .map_err(|message| invalid_config(&path, message))?;
        config.validate().map_err(|message| invalid_config(&path, message))?;
        Ok(config)
    }

    fn from_str_with_format(text: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(text).map_err(|error| error.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|error| error.to_string()),
            ConfigFormat::Json => serde_json::from_str(text).map_err(|error| error.to_string()),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(empty) = self
            .mock_annotations
            .iter()
            .find(|annotation| simple_name(annotation).is_empty())
        {
            return Err(format!("mock annotation '{empty}' has an empty simple name"));
        }

        for (setup, teardown) in &self.setup_hooks {
            if simple_name(setup).is_empty() || simple_name(teardown).is_empty() {
                return Err(format!(
                    "setup hook '{setup}' -> '{teardown}' must name two annotations"
                ));
            }
        }

        if self.indent == Some(0) {
            return Err("indent must be at least one space".to_string());
        }

        if self.passes.is_empty() {
            return Err("at least one pass must be enabled".to_string());
        }

        glob::Pattern::new(&self.include)
            .map_err(|error| format!("include pattern '{}': {error}", self.include))?;

        Ok(())
    }

    pub fn is_mock_annotation(&self, annotation: &str) -> bool {
        let wanted = simple_name(annotation);
        self.mock_annotations
            .iter()
            .any(|candidate| annotation == candidate || simple_name(candidate) == wanted)
    }

    /// Returns the qualified teardown annotation paired with `annotation`, if it names a setup hook.
    pub fn teardown_for_setup(&self, annotation: &str) -> Option<&str> {
        let wanted = simple_name(annotation);
        self.setup_hooks
            .iter()
            .find(|(setup, _)| setup.as_str() == annotation || simple_name(setup) == wanted)
            .map(|(_, teardown)| teardown.as_str())
    }

    pub fn is_teardown_annotation(&self, annotation: &str) -> bool {
        let wanted = simple_name(annotation);
        self.setup_hooks
            .values()
            .any(|teardown| teardown == annotation || simple_name(teardown) == wanted)
    }

    pub fn pass_enabled(&self, pass: Pass) -> bool {
        self.passes.contains(&pass)
    }
}

pub(crate) fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified).trim()
}

fn detect_format(path: &Path) -> Result<ConfigFormat, MigrateError> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "toml" => Ok(ConfigFormat::Toml),
        "yaml" | "yml" => Ok(ConfigFormat::Yaml),
        "json" => Ok(ConfigFormat::Json),
        _ => Err(invalid_config(
            path,
            format!("unsupported config format '.{extension}' (expected .toml, .yaml/.yml or .json)"),
        )),
    }
}

fn invalid_config(path: &Path, message: String) -> MigrateError {
    MigrateError::InvalidConfig {
        path: path.display().to_string(),
        message,
    }
}
