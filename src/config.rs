//! Engine configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! autoplay_interval_ms = 250
//! granularity = "node"
//!
//! [bridge]
//! inert_functions = ["plot", "record", "chart"]
//! ```

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// How much execution one `step()` covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One syntactic unit (statement, branch decision, return)
    #[default]
    Statement,
    /// One interpreter micro-step
    Node,
}

/// Names of the functions and objects injected into every session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub checkpoint_function: String,
    /// Accepted and ignored; programs written for richer hosts call these
    pub inert_functions: Vec<String>,
    pub bindings_name: String,
    pub bindings_json_function: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            checkpoint_function: "checkpoint".to_string(),
            inert_functions: vec!["plot".to_string(), "record".to_string()],
            bindings_name: "bindings".to_string(),
            bindings_json_function: "bindingsJson".to_string(),
        }
    }
}

/// Stepping engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub autoplay_interval_ms: u64,
    pub max_history: usize,
    /// Micro-steps allowed for one `step()` before it is treated as runaway
    pub max_micro_steps: usize,
    pub max_call_depth: usize,
    pub granularity: Granularity,
    /// Node types whose entry counts as entering a block
    pub block_node_types: Vec<String>,
    pub bridge: BridgeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autoplay_interval_ms: 500,
            max_history: 100_000,
            max_micro_steps: 1_000_000,
            max_call_depth: crate::interpreter::DEFAULT_MAX_CALL_DEPTH,
            granularity: Granularity::Statement,
            block_node_types: vec![
                "BlockStatement".to_string(),
                "SwitchStatement".to_string(),
                "ReturnStatement".to_string(),
            ],
            bridge: BridgeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        debug!(?path, "loaded engine configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("autoplay_interval_ms", self.autoplay_interval_ms as usize),
            ("max_history", self.max_history),
            ("max_micro_steps", self.max_micro_steps),
            ("max_call_depth", self.max_call_depth),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        let names = [
            ("bridge.checkpoint_function", &self.bridge.checkpoint_function),
            ("bridge.bindings_name", &self.bridge.bindings_name),
            ("bridge.bindings_json_function", &self.bridge.bindings_json_function),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if self.bridge.inert_functions.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "bridge.inert_functions",
                reason: "names must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms)
    }

    pub fn is_block_type(&self, node_type: &str) -> bool {
        self.block_node_types.iter().any(|t| t == node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.autoplay_interval(), Duration::from_millis(500));
        assert!(config.is_block_type("SwitchStatement"));
        assert!(!config.is_block_type("IfStatement"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            "granularity = \"node\"\n\n[bridge]\ninert_functions = [\"chart\"]\n",
        )
        .unwrap();
        assert_eq!(config.granularity, Granularity::Node);
        assert_eq!(config.bridge.inert_functions, vec!["chart".to_string()]);
        assert_eq!(config.bridge.checkpoint_function, "checkpoint");
        assert_eq!(config.max_history, 100_000);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = EngineConfig::from_toml("autoplay_interval_ms = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "autoplay_interval_ms", .. }
        ));
    }

    #[test]
    fn test_rejects_empty_bridge_name() {
        let err = EngineConfig::from_toml("[bridge]\ncheckpoint_function = \" \"").unwrap_err();
        assert!(err.to_string().contains("bridge.checkpoint_function"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_micro_steps = 42").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.max_micro_steps, 42);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/stepwise.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
