//! Server configuration.
//!
//! Loaded from a YAML file, then overridden by `XSERVER_*` environment
//! variables, then validated. Every field has a default, so an absent file
//! or an empty mapping yields a runnable local server.
//!
//! ```yaml
//! listen_address: 0.0.0.0
//! listen_port: 33060
//! log_level: debug
//! max_connections: 100
//! auth_mechanisms: [MYSQL41, PLAIN]
//! users:
//!   - name: root
//!     password: secret
//! ```

mod error;

pub use error::ConfigError;

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::auth::Mechanism;
use crate::backend::MemoryBackend;
use crate::protocol::DEFAULT_MAX_MESSAGE_SIZE;
use crate::server::ServerOptions;

pub const DEFAULT_LISTEN_PORT: u16 = 33060;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// 0 means unlimited.
    pub max_connections: usize,
    pub max_message_size: usize,
    /// Mechanism names, in the order they are advertised.
    pub auth_mechanisms: Vec<String>,
    pub users: Vec<UserConfig>,
    /// `XSERVER_*` variables applied on load, in application order. Kept so
    /// they can be logged once a subscriber is installed.
    #[serde(skip)]
    pub env_overrides: Vec<&'static str>,
}

/// An account known to the built-in backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub name: String,
    #[serde(default)]
    pub password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            log_level: "info".to_string(),
            max_connections: 0,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            auth_mechanisms: vec![Mechanism::Mysql41.name().to_string()],
            users: Vec::new(),
            env_overrides: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads `path`, applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Like [`load`](Self::load), from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides, for running without a file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies the supported `XSERVER_*` variables:
    ///
    /// - `XSERVER_LISTEN_ADDRESS`
    /// - `XSERVER_LISTEN_PORT`
    /// - `XSERVER_LOG_LEVEL`
    /// - `XSERVER_MAX_CONNECTIONS`
    /// - `XSERVER_MAX_MESSAGE_SIZE`
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("XSERVER_LISTEN_ADDRESS") {
            self.listen_address = val;
            self.env_overrides.push("XSERVER_LISTEN_ADDRESS");
        }
        if let Some(val) = lookup("XSERVER_LISTEN_PORT") {
            self.listen_port = parse_override("XSERVER_LISTEN_PORT", val)?;
            self.env_overrides.push("XSERVER_LISTEN_PORT");
        }
        if let Some(val) = lookup("XSERVER_LOG_LEVEL") {
            self.log_level = val;
            self.env_overrides.push("XSERVER_LOG_LEVEL");
        }
        if let Some(val) = lookup("XSERVER_MAX_CONNECTIONS") {
            self.max_connections = parse_override("XSERVER_MAX_CONNECTIONS", val)?;
            self.env_overrides.push("XSERVER_MAX_CONNECTIONS");
        }
        if let Some(val) = lookup("XSERVER_MAX_MESSAGE_SIZE") {
            self.max_message_size = parse_override("XSERVER_MAX_MESSAGE_SIZE", val)?;
            self.env_overrides.push("XSERVER_MAX_MESSAGE_SIZE");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_size == 0 {
            return Err(ConfigError::ZeroMessageSize);
        }
        self.mechanisms().map(|_| ())
    }

    /// Enabled mechanisms in advertised order. Duplicates are dropped.
    pub fn mechanisms(&self) -> Result<Vec<Mechanism>, ConfigError> {
        let mut mechanisms = Vec::with_capacity(self.auth_mechanisms.len());
        for name in &self.auth_mechanisms {
            let mechanism = Mechanism::from_name(name)
                .ok_or_else(|| ConfigError::UnknownMechanism(name.clone()))?;
            if !mechanisms.contains(&mechanism) {
                mechanisms.push(mechanism);
            }
        }
        if mechanisms.is_empty() {
            return Err(ConfigError::NoMechanisms);
        }
        Ok(mechanisms)
    }

    /// `address:port` suitable for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }

    pub fn server_options(&self) -> Result<ServerOptions, ConfigError> {
        Ok(ServerOptions {
            mechanisms: self.mechanisms()?,
            max_connections: self.max_connections,
            max_message_size: self.max_message_size,
        })
    }

    /// The built-in backend, holding the configured accounts.
    pub fn backend(&self) -> MemoryBackend {
        MemoryBackend::from_users(
            self.users
                .iter()
                .map(|user| (user.name.as_str(), user.password.as_str())),
        )
    }
}

fn parse_override<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Override { var, value })
}
