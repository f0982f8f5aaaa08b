use thiserror::Error;

use crate::protocol::error_code;

/// Reasons a capabilities-set request is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("Capability '{0}' doesn't exist")]
    NotFound(String),

    #[error("Capability prepare failed for '{0}'")]
    PrepareFailed(String),
}

impl CapabilityError {
    pub fn code(&self) -> u16 {
        match self {
            CapabilityError::NotFound(_) => error_code::X_CAPABILITY_NOT_FOUND,
            CapabilityError::PrepareFailed(_) => error_code::X_CAPABILITIES_PREPARE_FAILED,
        }
    }
}
