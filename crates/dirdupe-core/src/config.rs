//! Analysis configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::DirdupeError;

/// Configuration for a duplicate directory analysis.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct AnalyzeConfig {
    /// Number of threads for directory listing (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Glob patterns for directory entries that don't count against a
    /// directory (e.g. `.DS_Store`, `Thumbs.db`).
    #[builder(default)]
    #[serde(default)]
    pub ignore_entries: Vec<String>,

    /// Where to save and resume intermediate state.
    #[builder(default)]
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,

    /// External duplicate finder invoked by `scan`.
    #[builder(default = "default_fdupes_program()")]
    #[serde(default = "default_fdupes_program")]
    pub fdupes_program: String,
}

fn default_fdupes_program() -> String {
    "fdupes".to_string()
}

impl AnalyzeConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref program) = self.fdupes_program {
            if program.trim().is_empty() {
                return Err("fdupes program cannot be empty".to_string());
            }
        }
        if let Some(ref patterns) = self.ignore_entries {
            if patterns.iter().any(|p| p.is_empty()) {
                return Err("ignore patterns cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl AnalyzeConfig {
    /// Create a new config builder.
    pub fn builder() -> AnalyzeConfigBuilder {
        AnalyzeConfigBuilder::default()
    }

    /// Load a config from a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, DirdupeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DirdupeError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, DirdupeError> {
        let config: Self = toml::from_str(text).map_err(|e| DirdupeError::InvalidConfig {
            message: e.to_string(),
        })?;
        if config.fdupes_program.trim().is_empty() {
            return Err(DirdupeError::InvalidConfig {
                message: "fdupes program cannot be empty".to_string(),
            });
        }
        Ok(config)
    }
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            ignore_entries: Vec::new(),
            checkpoint: None,
            fdupes_program: default_fdupes_program(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = AnalyzeConfig::builder()
            .threads(4usize)
            .ignore_entries(vec![".DS_Store".to_string()])
            .checkpoint(Some(PathBuf::from("/tmp/state.json")))
            .build()
            .unwrap();

        assert_eq!(config.threads, 4);
        assert_eq!(config.ignore_entries, vec![".DS_Store".to_string()]);
        assert_eq!(config.fdupes_program, "fdupes");
    }

    #[test]
    fn test_builder_rejects_empty_program() {
        let result = AnalyzeConfig::builder().fdupes_program("  ").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = AnalyzeConfig::from_toml_str("threads = 2\n").unwrap();
        assert_eq!(config.threads, 2);
        assert!(config.ignore_entries.is_empty());
        assert!(config.checkpoint.is_none());
        assert_eq!(config.fdupes_program, "fdupes");
    }

    #[test]
    fn test_from_toml_invalid() {
        let err = AnalyzeConfig::from_toml_str("threads = \"many\"").unwrap_err();
        assert!(matches!(err, DirdupeError::InvalidConfig { .. }));
    }
}
