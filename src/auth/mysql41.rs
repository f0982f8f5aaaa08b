use crate::auth::scramble::{SCRAMBLE_LENGTH, compute_scramble, generate_challenge};
use crate::auth::{AuthResponse, Identity, split_credentials};
use crate::backend::{CredentialProof, QueryBackend};

/// Progress of one MYSQL41 exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mysql41State {
    Starting,
    WaitingResponse,
    Done,
    Error,
}

/// Challenge-response authentication.
///
/// ```text
/// Starting --start--> WaitingResponse --continue--> Done
///     \                     \
///      +-- continue ------>  +-- start ----------> Error
/// ```
#[derive(Debug)]
pub struct Mysql41Auth {
    state: Mysql41State,
    challenge: [u8; SCRAMBLE_LENGTH],
    identity: Option<Identity>,
}

impl Default for Mysql41Auth {
    fn default() -> Self {
        Self::new()
    }
}

impl Mysql41Auth {
    pub fn new() -> Self {
        Self {
            state: Mysql41State::Starting,
            challenge: [0; SCRAMBLE_LENGTH],
            identity: None,
        }
    }

    pub fn state(&self) -> Mysql41State {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Issues the challenge. Only valid once, in `Starting`.
    pub fn handle_start(&mut self) -> AuthResponse {
        if self.state != Mysql41State::Starting {
            self.state = Mysql41State::Error;
            return AuthResponse::out_of_order();
        }

        self.challenge = generate_challenge();
        self.state = Mysql41State::WaitingResponse;
        AuthResponse::ongoing(self.challenge.to_vec())
    }

    /// Checks `schema \0 user \0 *HEX` against the issued challenge.
    pub async fn handle_continue(&mut self, data: &[u8], backend: &dyn QueryBackend) -> AuthResponse {
        if self.state != Mysql41State::WaitingResponse {
            self.state = Mysql41State::Error;
            return AuthResponse::out_of_order();
        }
        self.state = Mysql41State::Done;

        let Some((identity, proof)) = split_credentials(data) else {
            return AuthResponse::failed("Invalid authentication data");
        };
        let Some(scramble) = decode_proof(proof) else {
            return AuthResponse::failed("Invalid authentication data");
        };

        let proof = CredentialProof::Mysql41 {
            scramble: &scramble,
            challenge: &self.challenge,
        };
        if backend.verify_credentials(&identity.user, proof).await {
            self.identity = Some(identity);
            AuthResponse::succeeded()
        } else {
            AuthResponse::access_denied(&identity.user)
        }
    }
}

/// Builds the `AuthenticateContinue` payload a client sends in answer to
/// `challenge`.
pub fn client_response(schema: &str, user: &str, password: &str, challenge: &[u8]) -> Vec<u8> {
    let scramble = compute_scramble(password, challenge);
    let mut data = format!("{schema}\0{user}\0").into_bytes();
    if !scramble.is_empty() {
        data.push(b'*');
        data.extend_from_slice(hex::encode_upper(scramble).as_bytes());
    }
    data
}

/// `""` for an empty password, otherwise `*` followed by the hex scramble.
fn decode_proof(proof: &[u8]) -> Option<Vec<u8>> {
    match proof {
        [] => Some(Vec::new()),
        [b'*', hex @ ..] if hex.len() == SCRAMBLE_LENGTH * 2 => hex::decode(hex).ok(),
        _ => None,
    }
}
