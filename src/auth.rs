//! Authentication mechanisms.
//!
//! A session creates one [`AuthHandler`] per `AuthenticateStart` and feeds it
//! every subsequent `AuthenticateContinue` until the handler reports a final
//! status.

pub mod mysql41;
pub mod plain;
pub mod scramble;

use std::fmt;

use crate::backend::QueryBackend;
use crate::protocol::error_code;

pub use mysql41::Mysql41Auth;
pub use plain::PlainAuth;

/// Mechanisms this server can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    Mysql41,
    Plain,
}

impl Mechanism {
    pub const ALL: [Mechanism; 2] = [Mechanism::Mysql41, Mechanism::Plain];

    /// The name used on the wire and in the `authentication.mechanisms`
    /// capability.
    pub fn name(self) -> &'static str {
        match self {
            Mechanism::Mysql41 => "MYSQL41",
            Mechanism::Plain => "PLAIN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Another round trip is needed; `data` is the server's challenge.
    Ongoing,
    Succeeded,
    /// Credentials were rejected.
    Failed,
    /// The exchange was driven out of order.
    Error,
}

/// Outcome of one handler step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub status: AuthStatus,
    /// Challenge bytes for `Ongoing`, an error message for `Failed`/`Error`.
    pub data: Vec<u8>,
    pub error_code: u16,
}

impl AuthResponse {
    pub fn ongoing(challenge: Vec<u8>) -> Self {
        Self {
            status: AuthStatus::Ongoing,
            data: challenge,
            error_code: 0,
        }
    }

    pub fn succeeded() -> Self {
        Self {
            status: AuthStatus::Succeeded,
            data: Vec::new(),
            error_code: 0,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            status: AuthStatus::Failed,
            data: message.as_bytes().to_vec(),
            error_code: error_code::ACCESS_DENIED,
        }
    }

    pub fn access_denied(user: &str) -> Self {
        Self::failed(&format!("Access denied for user '{user}'"))
    }

    pub fn out_of_order() -> Self {
        Self {
            status: AuthStatus::Error,
            data: b"Commands out of order".to_vec(),
            error_code: error_code::NET_PACKETS_OUT_OF_ORDER,
        }
    }

    /// `data` as text, for error notices.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Who a successful exchange authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    /// Default schema requested by the client, if any.
    pub schema: Option<String>,
}

/// Splits `schema \0 user \0 rest` into an identity and `rest`.
///
/// Returns `None` when either separator is missing, the user is empty, or
/// the names are not UTF-8.
pub(crate) fn split_credentials(data: &[u8]) -> Option<(Identity, &[u8])> {
    let mut parts = data.splitn(3, |&b| b == 0);
    let schema = std::str::from_utf8(parts.next()?).ok()?;
    let user = std::str::from_utf8(parts.next()?).ok()?;
    let rest = parts.next()?;

    if user.is_empty() {
        return None;
    }

    let identity = Identity {
        user: user.to_string(),
        schema: (!schema.is_empty()).then(|| schema.to_string()),
    };
    Some((identity, rest))
}

/// One in-progress authentication exchange.
#[derive(Debug)]
pub enum AuthHandler {
    Mysql41(Mysql41Auth),
    Plain(PlainAuth),
}

impl AuthHandler {
    /// Creates a handler for `mechanism`, or `None` when the name is unknown.
    pub fn create(mechanism: &str) -> Option<Self> {
        Mechanism::from_name(mechanism).map(Self::for_mechanism)
    }

    pub fn for_mechanism(mechanism: Mechanism) -> Self {
        match mechanism {
            Mechanism::Mysql41 => AuthHandler::Mysql41(Mysql41Auth::new()),
            Mechanism::Plain => AuthHandler::Plain(PlainAuth::new()),
        }
    }

    pub fn mechanism(&self) -> Mechanism {
        match self {
            AuthHandler::Mysql41(_) => Mechanism::Mysql41,
            AuthHandler::Plain(_) => Mechanism::Plain,
        }
    }

    pub async fn handle_start(
        &mut self,
        auth_data: &[u8],
        initial_response: &[u8],
        backend: &dyn QueryBackend,
    ) -> AuthResponse {
        match self {
            AuthHandler::Mysql41(auth) => auth.handle_start(),
            AuthHandler::Plain(auth) => auth.handle_start(auth_data, initial_response, backend).await,
        }
    }

    pub async fn handle_continue(&mut self, data: &[u8], backend: &dyn QueryBackend) -> AuthResponse {
        match self {
            AuthHandler::Mysql41(auth) => auth.handle_continue(data, backend).await,
            AuthHandler::Plain(auth) => auth.handle_continue(),
        }
    }

    /// Set once the exchange has succeeded.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthHandler::Mysql41(auth) => auth.identity(),
            AuthHandler::Plain(auth) => auth.identity(),
        }
    }
}
