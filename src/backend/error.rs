use thiserror::Error;

/// Errors reported by a [`QueryBackend`](crate::backend::QueryBackend).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The statement failed cleanly; the session can continue.
    #[error("{message}")]
    Statement {
        code: u16,
        sql_state: String,
        message: String,
    },

    /// A side-effecting operation may or may not have been applied.
    #[error("result undetermined: {0}")]
    ResultUndetermined(String),

    /// The backend itself is in trouble; the server should stop accepting
    /// connections.
    #[error("critical backend error: {0}")]
    Critical(String),
}

impl BackendError {
    pub fn statement(code: u16, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::Statement {
            code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }

    /// Whether the failure ends the connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BackendError::Statement { .. })
    }
}
