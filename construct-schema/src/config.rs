//! Engine configuration.
//!
//! Sources are merged in precedence order (later sources override earlier
//! ones):
//! 1. Default values
//! 2. An optional configuration file (TOML, YAML or JSON by extension)
//! 3. Environment variables with the `CONSTRUCT_` prefix

use std::path::Path;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};

/// Default limit on nested definition depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many nested definitions deep resolution may go.
    pub max_depth: usize,
    /// Emit a warning per violation when generation is rejected.
    pub log_rejections: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            log_rejections: true,
        }
    }
}

impl EngineConfig {
    pub const ENV_PREFIX: &'static str = "CONSTRUCT_";

    /// Defaults overridden by the environment.
    pub fn load() -> Result<Self> {
        let config: Self = Self::base().merge(Env::prefixed(Self::ENV_PREFIX)).extract()?;
        debug!(?config, "loaded engine configuration");
        Ok(config)
    }

    /// Defaults overridden by `path`, then by the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::from(Toml::file(path)),
            Some("yaml") | Some("yml") => Figment::from(Yaml::file(path)),
            Some("json") => Figment::from(Json::file(path)),
            _ => {
                return Err(SchemaError::UnsupportedConfigFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        let config: Self = Self::base()
            .merge(file)
            .merge(Env::prefixed(Self::ENV_PREFIX))
            .extract()?;
        debug!(?config, path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }
}
