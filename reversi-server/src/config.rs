use std::path::Path;

use crate::error::ConfigError;

/// Server configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub bind: String,
    pub port: u16,
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ServerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `REVERSI_BIND` / `REVERSI_PORT` style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("REVERSI_BIND") {
            self.bind = bind;
        }
        if let Some(port) = lookup("REVERSI_PORT") {
            self.port = port.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("REVERSI_PORT is not a valid port: {port:?}"))
            })?;
        }
        self.validate()
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Validation("bind must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("port must be > 0".into()));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Validation("log_level must not be empty".into()));
        }
        Ok(())
    }

    /// `host:port` string for the listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
