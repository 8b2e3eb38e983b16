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
use super::forms::{DeleteForm, FormErrors, LoginForm, UserEditForm, UserForm};
use super::guards::{self, CurrentUser, Viewer};
use super::views::{self, Layout};
use super::{AppState, WebError, csrf, flash};
use crate::constants::{routes, session::USER_ID};
use crate::domain::UserId;
use crate::services::AuthError;

/// Routes under `/users`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users",
            get(index).merge(
                axum::routing::post(signup)
                    .route_layer(middleware::from_fn(guards::prevent_login_signup)),
            ),
        )
        .route(
            "/users/new",
            get(new_form).route_layer(middleware::from_fn(guards::prevent_login_signup)),
        )
        .route(
            "/users/login",
            get(login_form)
                .post(login)
                .route_layer(middleware::from_fn(guards::prevent_login_signup)),
        )
        .route(
            "/users/logout",
            get(logout).route_layer(middleware::from_fn(guards::ensure_authentication)),
        )
        .route(
            "/users/{id}",
            get(show).merge(
                axum::routing::patch(update)
                    .delete(destroy)
                    .route_layer(middleware::from_fn(guards::ensure_authorization))
                    .route_layer(middleware::from_fn(guards::ensure_authentication)),
            ),
        )
        .route(
            "/users/{id}/edit",
            get(edit)
                .route_layer(middleware::from_fn(guards::ensure_authorization))
                .route_layer(middleware::from_fn(guards::ensure_authentication)),
        )
}

async fn csrf_ok(state: &AppState, session: &Session, submitted: &str) -> Result<bool, WebError> {
    csrf::verify(session, state.config.security.csrf_enabled, submitted).await
}

fn rerender(status: StatusCode, page: Html<String>) -> Response {
    (status, page).into_response()
}

/// GET /users
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(viewer): Extension<Viewer>,
) -> Result<Html<String>, WebError> {
    let users = state.users.list_users().await?;
    let layout = Layout::load(&session, viewer.user()).await?;
    Ok(views::users_index(&layout, &users))
}

/// POST /users
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<UserForm>,
) -> Result<Response, WebError> {
    let mut errors = FormErrors::default();
    if !csrf_ok(&state, &session, &form.csrf_token).await? {
        errors.add("csrf_token", csrf::INVALID_TOKEN);
    }

    let new_user = match form.validate(state.config.security.min_password_length) {
        Ok(new_user) if errors.is_empty() => new_user,
        result => {
            if let Err(field_errors) = result {
                errors.merge(field_errors);
            }
            let layout = Layout::load(&session, None).await?;
            let page = views::users_new(&layout, &form, &errors);
            return Ok(rerender(StatusCode::UNPROCESSABLE_ENTITY, page));
        }
    };

    match state.auth.signup(new_user).await {
        Ok(user) => {
            session.cycle_id().await?;
            session.insert(USER_ID, user.id).await?;
            flash::success(&session, "User Created").await?;
            tracing::info!(user_id = user.id.value(), "User signed up");
            Ok(Redirect::to(routes::USERS).into_response())
        }
        Err(AuthError::UsernameTaken(username)) => {
            tracing::debug!("Signup rejected, username taken: {username}");
            flash::danger(&session, "Username Taken").await?;
            let layout = Layout::load(&session, None).await?;
            let page = views::users_new(&layout, &form, &FormErrors::default());
            Ok(rerender(StatusCode::UNPROCESSABLE_ENTITY, page))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /users/new
pub async fn new_form(session: Session) -> Result<Html<String>, WebError> {
    let layout = Layout::load(&session, None).await?;
    Ok(views::users_new(
        &layout,
        &UserForm::default(),
        &FormErrors::default(),
    ))
}

/// GET /users/login
pub async fn login_form(session: Session) -> Result<Html<String>, WebError> {
    let layout = Layout::load(&session, None).await?;
    Ok(views::users_login(
        &layout,
        &LoginForm::default(),
        &FormErrors::default(),
    ))
}

/// POST /users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let mut errors = FormErrors::default();
    if !csrf_ok(&state, &session, &form.csrf_token).await? {
        errors.add("csrf_token", csrf::INVALID_TOKEN);
    }

    let (username, password) = match form.validate() {
        Ok(credentials) if errors.is_empty() => credentials,
        result => {
            if let Err(field_errors) = result {
                errors.merge(field_errors);
            }
            let layout = Layout::load(&session, None).await?;
            let page = views::users_login(&layout, &form, &errors);
            return Ok(rerender(StatusCode::UNPROCESSABLE_ENTITY, page));
        }
    };

    match state.auth.login(&username, &password).await {
        Ok(user) => {
            session.cycle_id().await?;
            session.insert(USER_ID, user.id).await?;
            flash::success(&session, "Logged In!").await?;
            tracing::info!(user_id = user.id.value(), "User logged in");
            Ok(Redirect::to(routes::USERS).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            flash::danger(&session, "Invalid Credentials").await?;
            let layout = Layout::load(&session, None).await?;
            let page = views::users_login(&layout, &form, &FormErrors::default());
            Ok(rerender(StatusCode::UNAUTHORIZED, page))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /users/logout
pub async fn logout(
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Redirect, WebError> {
    session.remove_value(USER_ID).await?;
    flash::success(&session, "Logged Out!").await?;
    tracing::info!(user_id = user.id.value(), "User logged out");
    Ok(Redirect::to(routes::LOGIN))
}

/// GET /users/{id}
pub async fn show(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(viewer): Extension<Viewer>,
    IdPath(id): IdPath<UserId>,
) -> Result<Html<String>, WebError> {
    let user = state.users.get_user(id).await?;
    let layout = Layout::load(&session, viewer.user()).await?;
    Ok(views::users_show(&layout, &user))
}

/// GET /users/{id}/edit
pub async fn edit(
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    let layout = Layout::load(&session, Some(&user)).await?;
    let form = UserEditForm::from(&user);
    Ok(views::users_edit(
        &layout,
        &user,
        &form,
        &FormErrors::default(),
    ))
}

/// PATCH /users/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<UserEditForm>,
) -> Result<Response, WebError> {
    let mut errors = FormErrors::default();
    if !csrf_ok(&state, &session, &form.csrf_token).await? {
        errors.add("csrf_token", csrf::INVALID_TOKEN);
    }

    match form.validate() {
        Ok(update) if errors.is_empty() => {
            state.users.update_profile(user.id, update).await?;
            flash::success(&session, "User Updated").await?;
            Ok(Redirect::to(routes::USERS).into_response())
        }
        result => {
            if let Err(field_errors) = result {
                errors.merge(field_errors);
            }
            let layout = Layout::load(&session, Some(&user)).await?;
            let page = views::users_edit(&layout, &user, &form, &errors);
            Ok(rerender(StatusCode::UNPROCESSABLE_ENTITY, page))
        }
    }
}

/// DELETE /users/{id}
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    form: Result<Form<DeleteForm>, FormRejection>,
) -> Result<Redirect, WebError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();

    if csrf_ok(&state, &session, &form.csrf_token).await? {
        state.users.delete_user(user.id).await?;
        session.remove_value(USER_ID).await?;
        flash::success(&session, "User Deleted").await?;
        tracing::info!(user_id = user.id.value(), "User deleted account");
    } else {
        flash::danger(&session, csrf::INVALID_TOKEN).await?;
    }

    Ok(Redirect::to(routes::USERS))
}
