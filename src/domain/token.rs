//! Opaque bearer tokens.
//!
//! A token is 16 random bytes rendered as unpadded RFC 4648 base32, which is
//! always 26 characters. Only the SHA-256 of the plaintext is stored.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE32_NOPAD;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const TOKEN_BYTES: usize = 16;
pub const TOKEN_LENGTH: usize = 26;

pub const SCOPE_AUTHENTICATION: &str = "authentication";
pub const SCOPE_PASSWORD_RESET: &str = "password-reset";

/// A freshly issued token. The plaintext goes to the client; the rest is
/// persisted.
#[derive(Clone)]
pub struct IssuedToken {
    pub plaintext: String,
    pub hash: Vec<u8>,
    pub user_id: Uuid,
    pub expiry: DateTime<Utc>,
    pub scope: String,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("plaintext", &"**redacted**")
            .field("user_id", &self.user_id)
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish()
    }
}

pub fn generate(user_id: Uuid, ttl: Duration, scope: &str, now: DateTime<Utc>) -> IssuedToken {
    let mut bytes = [0_u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let plaintext = encode_base32(&bytes);
    let hash = hash_token(&plaintext);

    IssuedToken {
        plaintext,
        hash,
        user_id,
        expiry: now + ttl,
        scope: scope.to_string(),
    }
}

pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Cheap shape check before a token is looked up.
pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_LENGTH
        && plaintext
            .bytes()
            .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b))
}

fn encode_base32(bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(bytes)
}
