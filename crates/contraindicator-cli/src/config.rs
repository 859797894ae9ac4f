//! Configuration for the contraindicator CLI.

use contraindicator_graph::GraphConfig;
use serde::Deserialize;

/// Top-level configuration.
///
/// Loaded from `<prefix>.toml` (optional) layered under
/// `CONTRAINDICATOR__` environment variables, e.g.
/// `CONTRAINDICATOR__NEO4J__URI=bolt://graph:7687`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Connection settings, `[neo4j]` section.
    #[serde(default)]
    pub neo4j: GraphConfig,

    /// First-run sample data, `[seed]` section.
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Seed an empty graph on startup (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

/// Load configuration from `file_prefix` plus the environment.
pub fn load(file_prefix: &str) -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("CONTRAINDICATOR")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
