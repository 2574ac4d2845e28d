//! Loads `skipledger.toml`, the way `nearcore/src/config.rs` loads
//! `config.json`: `serde` deserialization, with I/O and parse failures
//! wrapped in one error type. `skipledger-cli` layers `anyhow::Context` on
//! top when reporting these to a user.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },

    #[error("invalid salter seed source {0:?}: expected none, hex:<bytes>, or env:<VAR>")]
    InvalidSeedSource(String),

    #[error("environment variable {0:?} named by an env: seed source is not set")]
    MissingEnvVar(String),

    #[error("hex seed source {0:?} is not valid hex")]
    InvalidHexSeed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: Backend,
    /// Required when `backend = "file"`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_seed_source")]
    pub seed_source: String,
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_seed_source() -> String {
    "none".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref)
            .map_err(|source| ConfigError::Io { path: path_ref.display().to_string(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path_ref.display().to_string(), source })
    }

    /// Resolve `seed_source` into raw seed bytes: `none` -> empty seed
    /// (unsalted), `hex:<bytes>` -> decoded bytes, `env:<VAR>` -> the raw
    /// bytes of the named environment variable's value.
    pub fn resolve_seed(&self) -> Result<Vec<u8>, ConfigError> {
        resolve_seed_source(&self.seed_source)
    }
}

fn resolve_seed_source(source: &str) -> Result<Vec<u8>, ConfigError> {
    if source == "none" {
        return Ok(Vec::new());
    }
    if let Some(hex_str) = source.strip_prefix("hex:") {
        return hex::decode(hex_str).ok().ok_or_else(|| ConfigError::InvalidHexSeed(source.to_string()));
    }
    if let Some(var) = source.strip_prefix("env:") {
        return std::env::var(var)
            .map(|v| v.into_bytes())
            .map_err(|_| ConfigError::MissingEnvVar(var.to_string()));
    }
    Err(ConfigError::InvalidSeedSource(source.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_memory_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skipledger.toml");
        std::fs::write(&path, "backend = \"memory\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.seed_source, "none");
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/skipledger.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skipledger.toml");
        std::fs::write(&path, "this is not valid toml =====").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn resolves_hex_seed() {
        let seed = resolve_seed_source("hex:deadbeef").unwrap();
        assert_eq!(seed, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn resolves_env_seed() {
        std::env::set_var("SKIPLEDGER_TEST_SEED", "seed-value");
        let seed = resolve_seed_source("env:SKIPLEDGER_TEST_SEED").unwrap();
        assert_eq!(seed, b"seed-value".to_vec());
        std::env::remove_var("SKIPLEDGER_TEST_SEED");
    }

    #[test]
    fn rejects_unknown_seed_source() {
        assert!(matches!(resolve_seed_source("bogus:x"), Err(ConfigError::InvalidSeedSource(_))));
    }
}
