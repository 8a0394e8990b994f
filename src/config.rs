//! Engine configuration with defaults and TOML loading.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which notion of criticality to test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriticalityMode {
    /// Removing any vertex lowers the chromatic number.
    #[default]
    Vertex,
    /// Removing any edge lowers the chromatic number.
    Edge,
}

impl std::fmt::Display for CriticalityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriticalityMode::Vertex => f.write_str("vertex"),
            CriticalityMode::Edge => f.write_str("edge"),
        }
    }
}

/// Order in which removal trials are attempted.
///
/// Only affects how quickly a counter-example is found, never the verdict kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOrder {
    /// Lowest degree first (edges by endpoint degree sum), ties by index.
    #[default]
    LowDegreeFirst,
    /// Ascending vertex index (edges in `Graph::edges` order).
    Natural,
}

/// Criticality engine parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Criticality notion used by the batch driver and the binary.
    pub mode: CriticalityMode,
    /// Dispatch the removal trials of one check to rayon workers.
    pub parallel_removals: bool,
    /// Worker threads for parallel removals; 0 uses rayon's global pool.
    pub workers: usize,
    /// Per oracle call deadline in milliseconds; `None` means unbounded.
    pub oracle_timeout_ms: Option<u64>,
    /// Order of removal trials.
    pub removal_order: RemovalOrder,
    /// Seed chromatic number searches with the clique number.
    pub use_clique_bound: bool,
    /// Reject vertex-criticality early when some vertex has degree below `k - 1`.
    pub min_degree_precheck: bool,
    /// Memoise chromatic numbers and removal-trial decisions across checks made by the same engine.
    pub cache_chromatic: bool,
    /// Take the chromatic number from corpus file names instead of recomputing it.
    /// A single oracle call still rejects graphs that need fewer colours.
    pub trust_corpus_chi: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: CriticalityMode::Vertex,
            parallel_removals: false,
            workers: 0,
            oracle_timeout_ms: None,
            removal_order: RemovalOrder::LowDegreeFirst,
            use_clique_bound: true,
            min_degree_precheck: false,
            cache_chromatic: false,
            trust_corpus_chi: true,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text; missing keys take their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys and
    /// [`ConfigError::Invalid`] if [`Self::validate`] fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    /// See [`Self::from_toml_str`]; I/O failures are [`ConfigError::Io`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialises this configuration as TOML.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if serialisation fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Rejects values that parse but cannot be used.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "oracle_timeout_ms must be positive; omit it for no deadline".into(),
            ));
        }
        if self.workers > 0 && !self.parallel_removals {
            tracing::debug!(
                workers = self.workers,
                "workers is set but parallel_removals is off; removal trials stay sequential"
            );
        }
        Ok(())
    }

    /// Per oracle call deadline, if any.
    pub fn oracle_timeout(&self) -> Option<Duration> {
        self.oracle_timeout_ms.map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_selected_fields() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            mode = "edge"
            parallel_removals = true
            workers = 4
            oracle_timeout_ms = 2500
            removal_order = "natural"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.mode, CriticalityMode::Edge);
        assert!(cfg.parallel_removals);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.oracle_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(cfg.removal_order, RemovalOrder::Natural);
        assert!(cfg.use_clique_bound);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = EngineConfig::from_toml_str("oracle_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_and_bad_values_are_parse_errors() {
        assert!(matches!(
            EngineConfig::from_toml_str("chains = 8"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str(r#"mode = "both""#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = EngineConfig {
            mode: CriticalityMode::Edge,
            oracle_timeout_ms: Some(10),
            min_degree_precheck: true,
            ..EngineConfig::default()
        };
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "cache_chromatic = true\n").unwrap();
        assert!(EngineConfig::load(&path).unwrap().cache_chromatic);
        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
