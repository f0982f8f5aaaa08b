//! MYSQL41 (`mysql_native_password`) scramble.
//!
//! ```text
//! stored   = SHA1( SHA1( password ) )
//! scramble = SHA1( password ) XOR SHA1( challenge + stored )
//! ```

use rand::Rng;
use sha1::{Digest, Sha1};

/// Length of the server challenge and of every SHA1 stage.
pub const SCRAMBLE_LENGTH: usize = 20;

fn sha1(parts: &[&[u8]]) -> [u8; SCRAMBLE_LENGTH] {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Generates a random challenge, avoiding `0x00` and `0xFF`.
pub fn generate_challenge() -> [u8; SCRAMBLE_LENGTH] {
    let mut rng = rand::thread_rng();
    let mut challenge = [0u8; SCRAMBLE_LENGTH];

    for byte in challenge.iter_mut() {
        *byte = loop {
            let b: u8 = rng.r#gen();
            if b != 0 && b != 0xFF {
                break b;
            }
        };
    }

    challenge
}

/// The form a server keeps a password in: `SHA1(SHA1(password))`.
pub fn double_sha1(password: &str) -> [u8; SCRAMBLE_LENGTH] {
    let stage1 = sha1(&[password.as_bytes()]);
    sha1(&[stage1.as_slice()])
}

/// Computes the client-side scramble for `password` answering `challenge`.
///
/// An empty password scrambles to an empty response.
pub fn compute_scramble(password: &str, challenge: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let stage1 = sha1(&[password.as_bytes()]);
    let stage2 = sha1(&[stage1.as_slice()]);
    let stage3 = sha1(&[challenge, stage2.as_slice()]);

    stage1.iter().zip(stage3.iter()).map(|(a, b)| a ^ b).collect()
}

/// Verifies a client scramble against the stored `SHA1(SHA1(password))`.
pub fn verify_scramble(scramble: &[u8], challenge: &[u8], stored: &[u8; SCRAMBLE_LENGTH]) -> bool {
    if scramble.len() != SCRAMBLE_LENGTH {
        return false;
    }

    let stage3 = sha1(&[challenge, stored.as_slice()]);
    let recovered: Vec<u8> = scramble
        .iter()
        .zip(stage3.iter())
        .map(|(a, b)| a ^ b)
        .collect();

    sha1(&[recovered.as_slice()]) == *stored
}
