//! Per-session form token.
//!
//! The token is minted on the first rendered form and compared against the
//! `csrf_token` field of every submitted one.

use tower_sessions::Session;

use super::WebError;
use crate::constants::session::CSRF_TOKEN;

pub const INVALID_TOKEN: &str = "Invalid or missing form token";

/// Returns the session's token, creating one if needed.
pub async fn token(session: &Session) -> Result<String, WebError> {
    if let Some(existing) = session.get::<String>(CSRF_TOKEN).await? {
        return Ok(existing);
    }

    let fresh = generate_token();
    session.insert(CSRF_TOKEN, &fresh).await?;
    Ok(fresh)
}

/// Checks a submitted token. Always passes when protection is disabled.
pub async fn verify(session: &Session, enabled: bool, submitted: &str) -> Result<bool, WebError> {
    if !enabled {
        return Ok(true);
    }

    let expected = session.get::<String>(CSRF_TOKEN).await?;
    Ok(expected.is_some_and(|expected| constant_time_eq(expected.as_bytes(), submitted.as_bytes())))
}

/// 64 character hex string
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
