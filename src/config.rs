//! Engine configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::localize::propagate::CombineRule;
use crate::ontology::iri::IriScheme;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Node and edge vocabulary of the ontology schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Edge `type` that participates in localization.
    pub causal_edge: String,
    /// Tag whose first value marks a node as part of the test ontology.
    pub test_ontology: String,
    /// Tag (and value) marking generic risk-solution containers.
    pub risk_solution: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            causal_edge: "causes_or_promotes".into(),
            test_ontology: "test ontology".into(),
            risk_solution: "risk solution".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub rule: CombineRule,
}

/// File locations used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Master ontology graph (node-link JSON).
    pub graph_file: PathBuf,
    /// Loaded when the master graph is missing or unreadable.
    pub graph_backup_file: Option<PathBuf>,
    /// redb data directory for sessions and relevance rows. `None` for memory-only.
    pub data_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            graph_file: PathBuf::from("ontology/Climate_Mind_DiGraph.json"),
            graph_backup_file: Some(PathBuf::from("ontology/Climate_Mind_DiGraph_backup.json")),
            data_dir: None,
        }
    }
}

/// Configuration for the localization engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizeConfig {
    pub iri: IriScheme,
    pub vocabulary: Vocabulary,
    pub propagation: PropagationConfig,
    pub paths: PathsConfig,
}

impl LocalizeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loading config");
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: LocalizeConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.iri.marker.is_empty() {
            return Err(ConfigError::Invalid {
                message: "iri.marker must not be empty".into(),
            });
        }
        let vocab = &self.vocabulary;
        for (name, value) in [
            ("vocabulary.causal_edge", &vocab.causal_edge),
            ("vocabulary.test_ontology", &vocab.test_ontology),
            ("vocabulary.risk_solution", &vocab.risk_solution),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must not be empty"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ontology_schema() {
        let config = LocalizeConfig::default();
        assert_eq!(config.iri.marker, "edu");
        assert_eq!(config.iri.offset, 4);
        assert_eq!(config.vocabulary.causal_edge, "causes_or_promotes");
        assert_eq!(config.propagation.rule, CombineRule::Any);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = LocalizeConfig::from_toml(
            r#"
            [propagation]
            rule = "all"

            [paths]
            graph_file = "graph.json"
            data_dir = "/var/lib/climind"
            "#,
        )
        .unwrap();
        assert_eq!(config.propagation.rule, CombineRule::All);
        assert_eq!(config.paths.graph_file, PathBuf::from("graph.json"));
        assert_eq!(config.paths.data_dir, Some(PathBuf::from("/var/lib/climind")));
        assert_eq!(config.vocabulary, Vocabulary::default());
    }

    #[test]
    fn empty_marker_rejected() {
        let result = LocalizeConfig::from_toml("[iri]\nmarker = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let result = LocalizeConfig::from_toml("[iri\n");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = LocalizeConfig::from_file(dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
