// ----- standard library imports
use std::collections::HashSet;
use std::path::PathBuf;
// ----- extra library imports
use bankid_client::ClientConfig;
use config::builder::{ConfigBuilder, DefaultState};
use config::{ConfigError, Environment};
use thiserror::Error;
// ----- local imports

pub const DEFAULT_PREFIX: &str = "PYBANKID";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("duplicate config prefix \"{0}\"")]
    DuplicatePrefix(String),
    #[error("empty config prefix")]
    EmptyPrefix,
    #[error("invalid config prefix \"{0}\"")]
    InvalidPrefix(String),
    #[error("config error {0}")]
    Config(#[from] ConfigError),
}

/// Config prefixes registered on one application.
///
/// Prefixes are compared case-insensitively: keys are looked up in lower case
/// and a prefix doubles as a route segment, so `EXTRA` and `extra` are the same
/// prefix.
#[derive(Debug, Default)]
pub struct Registry {
    prefixes: HashSet<String>,
}

impl Registry {
    pub fn register(&mut self, prefix: &str) -> Result<(), SetupError> {
        if prefix.is_empty() {
            return Err(SetupError::EmptyPrefix);
        }
        let valid = prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SetupError::InvalidPrefix(prefix.to_owned()));
        }
        if !self.prefixes.insert(prefix.to_lowercase()) {
            return Err(SetupError::DuplicatePrefix(prefix.to_owned()));
        }
        Ok(())
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.contains(&prefix.to_lowercase())
    }
}

/// Adds one environment source per prefix, keeping `<PREFIX>_` in the key so
/// that `PYBANKID_CERT_PATH` lands on `pybankid_cert_path`.
pub fn with_prefixed_env(
    mut builder: ConfigBuilder<DefaultState>,
    prefixes: &[String],
) -> ConfigBuilder<DefaultState> {
    for prefix in prefixes {
        builder = builder.add_source(Environment::with_prefix(prefix).keep_prefix(true));
    }
    builder
}

/// `<PREFIX>_<SUFFIX>`, lower cased the way `config` stores environment keys.
pub fn config_key(prefix: &str, suffix: &str) -> String {
    format!("{prefix}_{suffix}").to_lowercase()
}

fn or_default<T>(value: Result<T, ConfigError>, default: T) -> Result<T, ConfigError> {
    match value {
        Err(ConfigError::NotFound(_)) => Ok(default),
        other => other,
    }
}

/// Reads `<PREFIX>_CERT_PATH`, `<PREFIX>_KEY_PATH`, `<PREFIX>_TEST_SERVER` and
/// `<PREFIX>_CA_PATH`. Missing values fall back to empty paths and `false`.
pub fn client_config(cfg: &config::Config, prefix: &str) -> Result<ClientConfig, SetupError> {
    let cert_path = or_default(cfg.get_string(&config_key(prefix, "CERT_PATH")), String::new())?;
    let key_path = or_default(cfg.get_string(&config_key(prefix, "KEY_PATH")), String::new())?;
    let test_server = or_default(cfg.get_bool(&config_key(prefix, "TEST_SERVER")), false)?;
    let ca_path = or_default(cfg.get_string(&config_key(prefix, "CA_PATH")), String::new())?;
    Ok(ClientConfig {
        cert_path: PathBuf::from(cert_path),
        key_path: PathBuf::from(key_path),
        test_server,
        ca_path: (!ca_path.is_empty()).then(|| PathBuf::from(ca_path)),
    })
}
