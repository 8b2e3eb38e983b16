use axum::{
    Extension, Form, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::extract::IdPath;
use super::forms::{DeleteForm, FormErrors, MessageForm};
use super::guards::{self, CurrentUser};
use super::views::{self, Layout};
use super::{AppState, WebError, csrf, flash};
use crate::domain::{MessageId, UserId};

/// Routes under `/users/{user_id}/messages`. Every one of them requires the
/// viewer to be `{user_id}`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/{user_id}/messages", get(index).post(create))
        .route("/users/{user_id}/messages/new", get(new_form))
        .route(
            "/users/{user_id}/messages/{id}",
            get(show).patch(update).delete(destroy),
        )
        .route("/users/{user_id}/messages/{id}/edit", get(edit))
        .route_layer(middleware::from_fn(guards::ensure_message_authorization))
        .route_layer(middleware::from_fn(guards::ensure_authentication))
}

fn index_path(user_id: UserId) -> String {
    format!("/users/{user_id}/messages")
}

/// GET /users/{user_id}/messages
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    let messages = state.messages.list_messages(user.id).await?;
    let layout = Layout::load(&session, Some(&user)).await?;
    Ok(views::messages_index(&layout, &user, &messages))
}

/// POST /users/{user_id}/messages
pub async fn create(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<MessageForm>,
) -> Result<Response, WebError> {
    let mut errors = FormErrors::default();
    if !csrf::verify(&session, state.config.security.csrf_enabled, &form.csrf_token).await? {
        errors.add("csrf_token", csrf::INVALID_TOKEN);
    }

    match form.validate() {
        Ok(draft) if errors.is_empty() => {
            state.messages.create_message(user.id, draft).await?;
            flash::success(&session, "Message Created").await?;
            Ok(Redirect::to(&index_path(user.id)).into_response())
        }
        result => {
            if let Err(field_errors) = result {
                errors.merge(field_errors);
            }
            let layout = Layout::load(&session, Some(&user)).await?;
            let page = views::messages_new(&layout, &user, &form, &errors);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

/// GET /users/{user_id}/messages/new
pub async fn new_form(
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    let layout = Layout::load(&session, Some(&user)).await?;
    Ok(views::messages_new(
        &layout,
        &user,
        &MessageForm::default(),
        &FormErrors::default(),
    ))
}

/// GET /users/{user_id}/messages/{id}
pub async fn show(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    IdPath((_, id)): IdPath<(UserId, MessageId)>,
) -> Result<Html<String>, WebError> {
    let message = state.messages.get_message(user.id, id).await?;
    let layout = Layout::load(&session, Some(&user)).await?;
    Ok(views::messages_show(&layout, &user, &message))
}

/// GET /users/{user_id}/messages/{id}/edit
pub async fn edit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    IdPath((_, id)): IdPath<(UserId, MessageId)>,
) -> Result<Html<String>, WebError> {
    let message = state.messages.get_message(user.id, id).await?;
    let layout = Layout::load(&session, Some(&user)).await?;
    let form = MessageForm::from(&message);
    Ok(views::messages_edit(
        &layout,
        &user,
        &message,
        &form,
        &FormErrors::default(),
    ))
}

/// PATCH /users/{user_id}/messages/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    IdPath((_, id)): IdPath<(UserId, MessageId)>,
    Form(form): Form<MessageForm>,
) -> Result<Response, WebError> {
    let message = state.messages.get_message(user.id, id).await?;

    let mut errors = FormErrors::default();
    if !csrf::verify(&session, state.config.security.csrf_enabled, &form.csrf_token).await? {
        errors.add("csrf_token", csrf::INVALID_TOKEN);
    }

    match form.validate() {
        Ok(draft) if errors.is_empty() => {
            state.messages.update_message(user.id, id, draft).await?;
            flash::success(&session, "Message Updated").await?;
            Ok(Redirect::to(&index_path(user.id)).into_response())
        }
        result => {
            if let Err(field_errors) = result {
                errors.merge(field_errors);
            }
            let layout = Layout::load(&session, Some(&user)).await?;
            let page = views::messages_edit(&layout, &user, &message, &form, &errors);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

/// DELETE /users/{user_id}/messages/{id}
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    IdPath((_, id)): IdPath<(UserId, MessageId)>,
    form: Result<Form<DeleteForm>, FormRejection>,
) -> Result<Redirect, WebError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();

    if csrf::verify(&session, state.config.security.csrf_enabled, &form.csrf_token).await? {
        state.messages.delete_message(user.id, id).await?;
        flash::success(&session, "Message Deleted").await?;
    } else {
        flash::danger(&session, csrf::INVALID_TOKEN).await?;
    }

    Ok(Redirect::to(&index_path(user.id)))
}
