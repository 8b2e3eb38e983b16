//! Request-scoped viewer lookup and the access guards composed around handlers.
//!
//! [`load_viewer`] runs for every request and stores a [`Viewer`] in the
//! request extensions. The `ensure_*` guards are attached with `route_layer`
//! to the method routers that need them; [`ensure_authentication`] also
//! inserts a [`CurrentUser`] so guarded handlers never see an anonymous
//! request.

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_sessions::Session;

use super::{AppState, WebError, flash};
use crate::constants::{routes, session::USER_ID};
use crate::domain::UserId;
use crate::models::User;

/// The logged-in user, if any.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// The logged-in user on routes behind [`ensure_authentication`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub async fn load_viewer(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let viewer = match session.get::<UserId>(USER_ID).await? {
        Some(id) => {
            let user = state.store.get_user(id).await?;
            if user.is_none() {
                // account is gone; forget it
                session.remove_value(USER_ID).await?;
            }
            user
        }
        None => None,
    };

    if let Some(user) = &viewer {
        tracing::Span::current().record("user_id", user.id.value());
    }

    request.extensions_mut().insert(Viewer(viewer));
    Ok(next.run(request).await)
}

fn viewer_of(request: &Request) -> Option<User> {
    request
        .extensions()
        .get::<Viewer>()
        .and_then(|v| v.0.clone())
}

async fn deny(session: &Session, message: &str, to: &str) -> Result<Response, WebError> {
    flash::danger(session, message).await?;
    Ok(Redirect::to(to).into_response())
}

pub async fn ensure_authentication(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let Some(user) = viewer_of(&request) else {
        return deny(&session, "Please log in first!", routes::LOGIN).await;
    };

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// The `{id}` segment of `/users/{id}...` must be the viewer.
pub async fn ensure_authorization(
    session: Session,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if path_matches_viewer(&params, "id", &request) {
        Ok(next.run(request).await)
    } else {
        deny(&session, "Not Authorized", routes::USERS).await
    }
}

/// The `{user_id}` segment of `/users/{user_id}/messages...` must be the viewer.
pub async fn ensure_message_authorization(
    session: Session,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if path_matches_viewer(&params, "user_id", &request) {
        Ok(next.run(request).await)
    } else {
        deny(&session, "Not Authorized", routes::USERS).await
    }
}

/// Keeps logged-in visitors away from the signup and login pages.
pub async fn prevent_login_signup(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if viewer_of(&request).is_some() {
        flash::info(&session, "You are logged in already").await?;
        return Ok(Redirect::to(routes::USERS).into_response());
    }
    Ok(next.run(request).await)
}

fn path_matches_viewer(params: &HashMap<String, String>, key: &str, request: &Request) -> bool {
    let requested = params.get(key).and_then(|raw| raw.parse::<UserId>().ok());
    let viewer = viewer_of(request).map(|u| u.id);
    requested.is_some() && requested == viewer
}
