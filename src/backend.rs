//! Query-execution collaborator.
//!
//! The session core never touches storage. Credential checks and statement
//! execution are delegated to a [`QueryBackend`], shared by all connections.

pub mod error;
pub mod memory;

use async_trait::async_trait;

pub use error::BackendError;
pub use memory::MemoryBackend;

/// Statement namespace declared by `StmtExecute.namespace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `"sql"` or empty: plain SQL text.
    Sql,
    /// `"xplugin"`: reserved for admin commands.
    XPlugin,
    /// `"mysqlx"`: reserved for admin commands.
    Mysqlx,
}

impl Namespace {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "" | "sql" => Some(Namespace::Sql),
            "xplugin" => Some(Namespace::XPlugin),
            "mysqlx" => Some(Namespace::Mysqlx),
            _ => None,
        }
    }
}

/// What the client presented to prove its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialProof<'a> {
    /// MYSQL41: `SHA1(pw) XOR SHA1(challenge ++ SHA1(SHA1(pw)))`, empty for
    /// an empty password.
    Mysql41 {
        scramble: &'a [u8],
        challenge: &'a [u8],
    },
    /// PLAIN: the password itself.
    Plain { password: &'a str },
}

/// Result of a successfully executed statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}

/// Storage-side operations the session core depends on.
///
/// Implementations are shared across connection tasks and must not mutate
/// shared state while verifying credentials.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Checks `proof` for `user`. Unknown users are simply invalid.
    async fn verify_credentials(&self, user: &str, proof: CredentialProof<'_>) -> bool;

    async fn execute(
        &self,
        session_id: u32,
        namespace: Namespace,
        statement: &str,
    ) -> Result<StatementOutcome, BackendError>;

    /// Asks the in-flight statement of `session_id`, if any, to stop.
    fn cancel_query(&self, session_id: u32);

    /// Drops per-session cached state (prepared statements, variables).
    async fn reset_session(&self, session_id: u32);
}
