use crate::auth::{AuthResponse, Identity, split_credentials};
use crate::backend::{CredentialProof, QueryBackend};

/// Single-round plaintext authentication: `schema \0 user \0 password`
/// arrives with the start message.
#[derive(Debug, Default)]
pub struct PlainAuth {
    started: bool,
    identity: Option<Identity>,
}

impl PlainAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub async fn handle_start(
        &mut self,
        auth_data: &[u8],
        initial_response: &[u8],
        backend: &dyn QueryBackend,
    ) -> AuthResponse {
        if self.started {
            return AuthResponse::out_of_order();
        }
        self.started = true;

        // Older clients put the credentials in auth_data.
        let data = if initial_response.is_empty() {
            auth_data
        } else {
            initial_response
        };
        let Some((identity, password)) = split_credentials(data) else {
            return AuthResponse::failed("Invalid authentication data");
        };
        let Ok(password) = std::str::from_utf8(password) else {
            return AuthResponse::access_denied(&identity.user);
        };

        if backend
            .verify_credentials(&identity.user, CredentialProof::Plain { password })
            .await
        {
            self.identity = Some(identity);
            AuthResponse::succeeded()
        } else {
            AuthResponse::access_denied(&identity.user)
        }
    }

    /// PLAIN never continues.
    pub fn handle_continue(&mut self) -> AuthResponse {
        self.started = true;
        AuthResponse::out_of_order()
    }
}
