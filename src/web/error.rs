use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::views;
use crate::services::{AuthError, MessageError, UserError};

#[derive(Debug)]
pub enum WebError {
    NotFound(String),

    DatabaseError(String),

    SessionError(String),

    InternalError(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::NotFound(msg) => write!(f, "Not found: {}", msg),
            WebError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            WebError::SessionError(msg) => write!(f, "Session error: {}", msg),
            WebError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for WebError {}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            WebError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            WebError::SessionError(msg) => {
                tracing::error!("Session error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Your session could not be loaded".to_string(),
                )
            }
            WebError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, views::error_page(status, &message)).into_response()
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        WebError::InternalError(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for WebError {
    fn from(err: tower_sessions::session::Error) -> Self {
        WebError::SessionError(err.to_string())
    }
}

impl From<UserError> for WebError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => Self::not_found("User", id),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<MessageError> for WebError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::NotFound(id) => Self::not_found("Message", id),
            MessageError::Database(msg) => Self::DatabaseError(msg),
            MessageError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// Only for the outcomes a handler does not turn into a form re-render.
impl From<AuthError> for WebError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(msg) => Self::DatabaseError(msg),
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl WebError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        WebError::NotFound(format!("{} {} not found", resource, id))
    }
}
