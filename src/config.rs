//! Compiler configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CompileResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Emitted as `xml:lang` on the item root.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub time_dependent: bool,
}

fn default_language() -> String {
    "en-US".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            time_dependent: false,
        }
    }
}

impl CompilerConfig {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Invalid(#[from] crate::error::CompileError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.language, "en-US");
        assert!(!config.time_dependent);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CompilerConfig::from_json(r#"{"timeDependent": true}"#).unwrap();
        assert!(config.time_dependent);
        assert_eq!(config.language, "en-US");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"language": "es-MX"}}"#).unwrap();
        let config = CompilerConfig::load(file.path()).unwrap();
        assert_eq!(config.language, "es-MX");
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CompilerConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
