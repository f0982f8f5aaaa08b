use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value {value:?} in {var}")]
    Override { var: &'static str, value: String },

    #[error("unknown authentication mechanism {0:?}")]
    UnknownMechanism(String),

    #[error("no authentication mechanism enabled")]
    NoMechanisms,

    #[error("max_message_size must be greater than zero")]
    ZeroMessageSize,
}
