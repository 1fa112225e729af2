//! Issuing and checking credentials.
//!
//! API tokens (`robokey_<lookup>_<secret>`) and robot secrets come from the
//! same issuer and differ only in their [`Shape`]. Only argon2id hashes are
//! persisted; the raw value leaves the process once, at issue time.

use std::fmt::Write as _;

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::Token;

pub const TOKEN_PREFIX: &str = "robokey";

/// Attempts at a fresh lookup id before giving up on token creation.
const LOOKUP_ATTEMPTS: u32 = 3;

/// Layout of an issued credential. Lengths are in hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Bearer token for a user or admin. The lookup part is stored in
    /// plaintext so the hash can be found without scanning.
    ApiToken,
    /// Robot secret. Bare hex, never looked up by value.
    RobotSecret,
}

impl Shape {
    const fn lookup_len(self) -> usize {
        match self {
            Shape::ApiToken => 8,
            Shape::RobotSecret => 0,
        }
    }

    const fn secret_len(self) -> usize {
        match self {
            Shape::ApiToken => 24,
            Shape::RobotSecret => 32,
        }
    }
}

#[derive(Debug)]
pub struct Issued {
    pub raw: String,
    /// `None` for robot secrets.
    pub lookup: Option<String>,
    pub hash: String,
}

pub fn issue(shape: Shape) -> Result<Issued> {
    let lookup = (shape.lookup_len() > 0).then(|| random_hex(shape.lookup_len()));
    let secret = random_hex(shape.secret_len());
    let raw = match &lookup {
        Some(lookup) => format!("{TOKEN_PREFIX}_{lookup}_{secret}"),
        None => secret,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map_err(|e| Error::Config(format!("failed to hash credential: {e}")))?
        .to_string();

    Ok(Issued { raw, lookup, hash })
}

/// Checks `raw` against a stored PHC hash. The hash carries its own
/// parameters, so older hashes keep verifying if the defaults move.
pub fn verify(raw: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::Config(format!("stored hash is malformed: {e}")))?;

    match Argon2::default().verify_password(raw.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Config(format!("failed to verify credential: {e}"))),
    }
}

/// Returns the lookup part of a well-formed API token.
pub fn token_lookup(raw: &str) -> Result<&str> {
    let shape = Shape::ApiToken;
    let (lookup, secret) = raw
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.split_once('_'))
        .ok_or(Error::InvalidTokenFormat)?;

    let is_hex = |s: &str| s.bytes().all(|b| b.is_ascii_hexdigit());
    if lookup.len() != shape.lookup_len()
        || secret.len() != shape.secret_len()
        || !is_hex(lookup)
        || !is_hex(secret)
    {
        return Err(Error::InvalidTokenFormat);
    }

    Ok(lookup)
}

/// Issues an API token and persists its record. A token without a user is
/// an admin token. Returns the stored record and the raw token.
pub fn store_new_token(
    store: &dyn Store,
    user_id: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(Token, String)> {
    for _ in 0..LOOKUP_ATTEMPTS {
        let issued = issue(Shape::ApiToken)?;
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: issued.hash,
            token_lookup: issued.lookup.unwrap_or_default(),
            is_admin: user_id.is_none(),
            user_id: user_id.map(str::to_string),
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };

        match store.create_token(&token) {
            Ok(()) => return Ok((token, issued.raw)),
            Err(Error::TokenLookupCollision) => {
                tracing::debug!("Token lookup collision, drawing a new one");
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::TokenLookupCollision)
}

/// `now + seconds`, or `None` when the sum leaves chrono's range.
#[must_use]
pub fn expiry_after(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(seconds).and_then(|delta| now.checked_add_signed(delta))
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    rand::thread_rng().fill_bytes(&mut bytes);

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in &bytes {
        let _ = write!(out, "{b:02x}");
    }
    out.truncate(len);
    out
}
