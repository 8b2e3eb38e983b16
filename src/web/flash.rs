//! One-shot messages carried in the session to the next rendered page.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::WebError;
use crate::constants::session::FLASHES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Danger,
}

impl FlashLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub text: String,
}

pub async fn push(
    session: &Session,
    level: FlashLevel,
    text: impl Into<String>,
) -> Result<(), WebError> {
    let mut pending: Vec<Flash> = session.get(FLASHES).await?.unwrap_or_default();
    pending.push(Flash {
        level,
        text: text.into(),
    });
    session.insert(FLASHES, pending).await?;
    Ok(())
}

pub async fn success(session: &Session, text: impl Into<String>) -> Result<(), WebError> {
    push(session, FlashLevel::Success, text).await
}

pub async fn info(session: &Session, text: impl Into<String>) -> Result<(), WebError> {
    push(session, FlashLevel::Info, text).await
}

pub async fn danger(session: &Session, text: impl Into<String>) -> Result<(), WebError> {
    push(session, FlashLevel::Danger, text).await
}

/// Drains every pending flash.
pub async fn take(session: &Session) -> Result<Vec<Flash>, WebError> {
    Ok(session.remove::<Vec<Flash>>(FLASHES).await?.unwrap_or_default())
}
