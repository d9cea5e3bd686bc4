//! Config - ストア・有効期限・long-poll の設定
//!
//! 優先順位（高い順）:
//! 1. 環境変数（`UWS_*`）
//! 2. TOML ファイル
//! 3. 組み込みのデフォルト

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::ExpiryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Which job store backs the service.
///
/// 起動時に閉じた集合から選ぶ（文字列のパスから動的にロードはしない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "store".to_string(),
                message: format!("unknown store kind '{other}'"),
            }),
        }
    }
}

/// One configuration source; unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UwsConfigLayer {
    pub store: Option<StoreKind>,
    pub default_expiry_secs: Option<u64>,
    pub max_expiry_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

impl UwsConfigLayer {
    pub fn merge(&mut self, other: Self) {
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.default_expiry_secs.is_some() {
            self.default_expiry_secs = other.default_expiry_secs;
        }
        if other.max_expiry_secs.is_some() {
            self.max_expiry_secs = other.max_expiry_secs;
        }
        if other.max_wait_secs.is_some() {
            self.max_wait_secs = other.max_wait_secs;
        }
        if other.poll_interval_ms.is_some() {
            self.poll_interval_ms = other.poll_interval_ms;
        }
    }

    pub fn finalize(self) -> UwsConfig {
        let defaults = UwsConfig::default();
        UwsConfig {
            store: self.store.unwrap_or(defaults.store),
            default_expiry_secs: self.default_expiry_secs.unwrap_or(defaults.default_expiry_secs),
            max_expiry_secs: self.max_expiry_secs.unwrap_or(defaults.max_expiry_secs),
            max_wait_secs: self.max_wait_secs.unwrap_or(defaults.max_wait_secs),
            poll_interval_ms: self.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
        }
    }

    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Missing file is not an error: the layer is simply empty.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(Self::default());
        }
        debug!(path = %path.display(), "loading config file");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from `UWS_*` variables resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let num = |key: &str| -> Result<Option<u64>, ConfigError> {
            match var(key) {
                Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("invalid u64 value '{v}'"),
                }),
                None => Ok(None),
            }
        };

        Ok(Self {
            store: var("UWS_STORE").map(|v| v.parse::<StoreKind>()).transpose()?,
            default_expiry_secs: num("UWS_DEFAULT_EXPIRY")?,
            max_expiry_secs: num("UWS_MAX_EXPIRY")?,
            max_wait_secs: num("UWS_MAX_WAIT_TIME")?,
            poll_interval_ms: num("UWS_POLL_INTERVAL_MS")?,
        })
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UwsConfig {
    pub store: StoreKind,

    /// Lifetime of a new job, in seconds.
    pub default_expiry_secs: u64,

    /// Retention ceiling measured from creation, in seconds.
    pub max_expiry_secs: u64,

    /// Ceiling for a long-poll wait, in seconds.
    pub max_wait_secs: u64,

    /// Fallback re-check interval of a long-poll wait.
    pub poll_interval_ms: u64,
}

impl Default for UwsConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::Memory,
            default_expiry_secs: ExpiryPolicy::DEFAULT_EXPIRY_SECS as u64,
            max_expiry_secs: ExpiryPolicy::MAX_EXPIRY_SECS as u64,
            max_wait_secs: 999,
            poll_interval_ms: 100,
        }
    }
}

impl UwsConfig {
    /// Defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut merged = UwsConfigLayer::default();
        if let Some(path) = path {
            merged.merge(UwsConfigLayer::from_toml_file(path)?);
        }
        merged.merge(UwsConfigLayer::from_env()?);
        let config = merged.finalize();
        debug!(?config, "configuration resolved");
        Ok(config)
    }

    pub fn default_expiry(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_i64(self.default_expiry_secs))
    }

    pub fn max_expiry(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_i64(self.max_expiry_secs))
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.default_expiry(), self.max_expiry())
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Clamp a requested long-poll wait to `max_wait_secs`.
    pub fn clamp_wait(&self, requested: Option<Duration>) -> Option<Duration> {
        requested.map(|wait| wait.min(self.max_wait()))
    }
}

// chrono::Duration::seconds panics above i64::MAX / 1000
fn saturating_i64(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_values() {
        let config = UwsConfig::default();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.default_expiry_secs, 86_400);
        assert_eq!(config.max_expiry_secs, 259_200);
        assert_eq!(config.max_wait_secs, 999);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = UwsConfigLayer {
            default_expiry_secs: Some(10),
            max_wait_secs: Some(5),
            ..Default::default()
        };
        base.merge(UwsConfigLayer {
            default_expiry_secs: Some(20),
            ..Default::default()
        });

        let config = base.finalize();
        assert_eq!(config.default_expiry_secs, 20);
        assert_eq!(config.max_wait_secs, 5);
        assert_eq!(config.max_expiry_secs, 259_200);
    }

    #[test]
    fn test_toml_layer() {
        let toml = r#"
            store = "memory"
            default_expiry_secs = 60
            max_expiry_secs = 600
        "#;
        let layer = UwsConfigLayer::from_toml_str(toml, Path::new("uws.toml")).unwrap();

        assert_eq!(layer.store, Some(StoreKind::Memory));
        assert_eq!(layer.default_expiry_secs, Some(60));
        assert_eq!(layer.max_wait_secs, None);
    }

    #[test]
    fn test_toml_unknown_store_is_rejected() {
        let err = UwsConfigLayer::from_toml_str("store = \"redis\"", Path::new("uws.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_env_layer() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("UWS_STORE", "memory"),
            ("UWS_MAX_WAIT_TIME", "30"),
            ("UWS_DEFAULT_EXPIRY", ""),
        ]);
        let layer =
            UwsConfigLayer::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(layer.store, Some(StoreKind::Memory));
        assert_eq!(layer.max_wait_secs, Some(30));
        assert_eq!(layer.default_expiry_secs, None);
    }

    #[test]
    fn test_env_invalid_number() {
        let err = UwsConfigLayer::from_lookup(|key| {
            (key == "UWS_MAX_EXPIRY").then(|| "three days".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "UWS_MAX_EXPIRY"));
    }

    #[test]
    fn test_clamp_wait() {
        let config = UwsConfig {
            max_wait_secs: 10,
            ..Default::default()
        };
        assert_eq!(config.clamp_wait(None), None);
        assert_eq!(
            config.clamp_wait(Some(Duration::from_secs(3))),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            config.clamp_wait(Some(Duration::from_secs(60))),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_expiry_policy_from_config() {
        let config = UwsConfig {
            default_expiry_secs: 60,
            max_expiry_secs: 120,
            ..Default::default()
        };
        let policy = config.expiry_policy();
        assert_eq!(policy.default_expiry, chrono::Duration::seconds(60));
        assert_eq!(policy.max_expiry, chrono::Duration::seconds(120));
    }

    #[test]
    fn test_huge_expiry_does_not_overflow() {
        let config = UwsConfig {
            max_expiry_secs: u64::MAX,
            ..Default::default()
        };
        assert_eq!(
            config.max_expiry(),
            chrono::Duration::seconds(i64::MAX / 1_000)
        );
    }
}
