use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::scramble::{SCRAMBLE_LENGTH, double_sha1, verify_scramble};
use crate::backend::{BackendError, CredentialProof, Namespace, QueryBackend, StatementOutcome};

/// MySQL's `ER_EMPTY_QUERY`.
const EMPTY_QUERY: u16 = 1065;

/// A backend that authenticates against an in-process account table and
/// records statements without executing them.
///
/// Passwords are held as `SHA1(SHA1(password))`, or empty for accounts
/// without a password.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    accounts: HashMap<String, Vec<u8>>,
    scripted: HashMap<String, Result<StatementOutcome, BackendError>>,
    statements: Mutex<HashMap<u32, Vec<String>>>,
    cancel_requests: Mutex<Vec<u32>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account.
    pub fn with_user(mut self, user: impl Into<String>, password: &str) -> Self {
        let stored = if password.is_empty() {
            Vec::new()
        } else {
            double_sha1(password).to_vec()
        };
        self.accounts.insert(user.into(), stored);
        self
    }

    /// Builds a backend from `(user, password)` pairs.
    pub fn from_users<'a>(users: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        users
            .into_iter()
            .fold(Self::new(), |backend, (user, password)| backend.with_user(user, password))
    }

    /// Makes `statement` produce `result` instead of the default empty outcome.
    pub fn with_response(
        mut self,
        statement: impl Into<String>,
        result: Result<StatementOutcome, BackendError>,
    ) -> Self {
        self.scripted.insert(statement.into(), result);
        self
    }

    /// Statements recorded for `session_id` since its last reset.
    pub fn statements(&self, session_id: u32) -> Vec<String> {
        self.statements
            .lock()
            .get(&session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Session ids whose in-flight query was asked to stop, in request order.
    pub fn cancel_requests(&self) -> Vec<u32> {
        self.cancel_requests.lock().clone()
    }

    fn verify(&self, stored: &[u8], proof: CredentialProof<'_>) -> bool {
        match proof {
            CredentialProof::Plain { password } => {
                if stored.is_empty() {
                    password.is_empty()
                } else {
                    !password.is_empty() && double_sha1(password).as_slice() == stored
                }
            }
            CredentialProof::Mysql41 {
                scramble,
                challenge,
            } => match <&[u8; SCRAMBLE_LENGTH]>::try_from(stored) {
                Ok(stored) => verify_scramble(scramble, challenge, stored),
                Err(_) => stored.is_empty() && scramble.is_empty(),
            },
        }
    }
}

#[async_trait]
impl QueryBackend for MemoryBackend {
    async fn verify_credentials(&self, user: &str, proof: CredentialProof<'_>) -> bool {
        match self.accounts.get(user) {
            Some(stored) => self.verify(stored, proof),
            None => false,
        }
    }

    async fn execute(
        &self,
        session_id: u32,
        namespace: Namespace,
        statement: &str,
    ) -> Result<StatementOutcome, BackendError> {
        if namespace == Namespace::Sql && statement.trim().is_empty() {
            return Err(BackendError::statement(EMPTY_QUERY, "42000", "Query was empty"));
        }

        self.statements
            .lock()
            .entry(session_id)
            .or_default()
            .push(statement.to_string());

        self.scripted
            .get(statement)
            .cloned()
            .unwrap_or_else(|| Ok(StatementOutcome::default()))
    }

    fn cancel_query(&self, session_id: u32) {
        self.cancel_requests.lock().push(session_id);
    }

    async fn reset_session(&self, session_id: u32) {
        self.statements.lock().remove(&session_id);
    }
}
