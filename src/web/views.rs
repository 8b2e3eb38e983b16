//! Server-rendered pages.
//!
//! Every interpolated value goes through [`text`] or [`attr`].

use axum::{http::StatusCode, response::Html};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;
use tower_sessions::Session;

use super::WebError;
use super::csrf;
use super::flash::{self, Flash};
use super::forms::{FormErrors, LoginForm, MessageForm, UserEditForm, UserForm};
use crate::models::{Message, User};

/// What every page needs besides its own content.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub viewer: Option<User>,
    pub flashes: Vec<Flash>,
    pub csrf_token: String,
}

impl Layout {
    /// Drains pending flashes and makes sure the session has a form token.
    pub async fn load(session: &Session, viewer: Option<&User>) -> Result<Self, WebError> {
        Ok(Self {
            viewer: viewer.cloned(),
            flashes: flash::take(session).await?,
            csrf_token: csrf::token(session).await?,
        })
    }

    fn render(&self, title: &str, body: &str) -> Html<String> {
        let mut nav = String::new();
        match &self.viewer {
            Some(user) => {
                let _ = write!(
                    nav,
                    r#"<a href="/users/{id}">{name}</a> <a href="/users/{id}/messages">My messages</a> <a href="/users/logout">Log out</a>"#,
                    id = user.id,
                    name = text(&user.username),
                );
            }
            None => nav.push_str(
                r#"<a href="/users/login">Log in</a> <a href="/users/new">Sign up</a>"#,
            ),
        }

        let mut flashes = String::new();
        for flash in &self.flashes {
            let _ = write!(
                flashes,
                r#"<div class="flash flash-{}">{}</div>"#,
                flash.level.as_str(),
                text(&flash.text)
            );
        }

        Html(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | postboard</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<nav><a href="/users" class="brand">postboard</a> {nav}</nav>
<main>
{flashes}
{body}
</main>
</body>
</html>"#,
            title = text(title),
        ))
    }

    fn csrf_field(&self) -> String {
        format!(
            r#"<input type="hidden" name="csrf_token" value="{}">"#,
            attr(&self.csrf_token)
        )
    }

    fn delete_button(&self, action: &str, label: &str) -> String {
        format!(
            r#"<form method="POST" action="{action}?_method=DELETE" class="inline">{csrf}<button type="submit" class="danger">{label}</button></form>"#,
            action = attr(action),
            csrf = self.csrf_field(),
            label = text(label),
        )
    }
}

fn text(value: &str) -> std::borrow::Cow<'_, str> {
    encode_text(value)
}

fn attr(value: &str) -> std::borrow::Cow<'_, str> {
    encode_double_quoted_attribute(value)
}

fn input(
    name: &'static str,
    label: &str,
    kind: &str,
    value: &str,
    errors: &FormErrors,
) -> String {
    let invalid = if errors.has(name) {
        r#" aria-invalid="true""#
    } else {
        ""
    };
    let mut html = format!(
        r#"<label for="{name}">{label}</label><input id="{name}" name="{name}" type="{kind}" value="{value}"{invalid}>"#,
        label = text(label),
        value = attr(value),
    );
    for error in errors.field(name) {
        let _ = write!(html, r#"<p class="field-error">{}</p>"#, text(error));
    }
    html
}

fn form_error(errors: &FormErrors) -> String {
    errors
        .field("csrf_token")
        .iter()
        .map(|e| format!(r#"<p class="field-error">{}</p>"#, text(e)))
        .collect()
}

pub fn users_index(layout: &Layout, users: &[User]) -> Html<String> {
    let mut body = String::from("<h1>Users</h1>");
    if users.is_empty() {
        body.push_str("<p>No one has signed up yet.</p>");
    } else {
        body.push_str("<ul class=\"users\">");
        for user in users {
            let _ = write!(
                body,
                r#"<li><a href="/users/{}">{}</a> <span class="muted">@{}</span></li>"#,
                user.id,
                text(&user.full_name()),
                text(&user.username),
            );
        }
        body.push_str("</ul>");
    }
    layout.render("Users", &body)
}

pub fn users_new(layout: &Layout, form: &UserForm, errors: &FormErrors) -> Html<String> {
    let body = format!(
        r#"<h1>Sign up</h1>
<form method="POST" action="/users">{csrf}{form_error}
{first}{last}{username}{password}
<button type="submit">Sign up</button>
</form>"#,
        csrf = layout.csrf_field(),
        form_error = form_error(errors),
        first = input("first_name", "First name", "text", &form.first_name, errors),
        last = input("last_name", "Last name", "text", &form.last_name, errors),
        username = input("username", "Username", "text", &form.username, errors),
        password = input("password", "Password", "password", "", errors),
    );
    layout.render("Sign up", &body)
}

pub fn users_login(layout: &Layout, form: &LoginForm, errors: &FormErrors) -> Html<String> {
    let body = format!(
        r#"<h1>Log in</h1>
<form method="POST" action="/users/login">{csrf}{form_error}
{username}{password}
<button type="submit">Log in</button>
</form>"#,
        csrf = layout.csrf_field(),
        form_error = form_error(errors),
        username = input("username", "Username", "text", &form.username, errors),
        password = input("password", "Password", "password", "", errors),
    );
    layout.render("Log in", &body)
}

pub fn users_show(layout: &Layout, user: &User) -> Html<String> {
    let mut body = format!(
        r#"<h1>{name}</h1><p class="muted">@{username} · joined {joined}</p>"#,
        name = text(&user.full_name()),
        username = text(&user.username),
        joined = text(&user.created_at),
    );

    if layout.viewer.as_ref().is_some_and(|v| v.id == user.id) {
        let _ = write!(
            body,
            r#"<p><a href="/users/{id}/edit">Edit profile</a> <a href="/users/{id}/messages">Messages</a></p>{delete}"#,
            id = user.id,
            delete = layout.delete_button(&format!("/users/{}", user.id), "Delete account"),
        );
    }
    layout.render(&user.username, &body)
}

pub fn users_edit(
    layout: &Layout,
    user: &User,
    form: &UserEditForm,
    errors: &FormErrors,
) -> Html<String> {
    let body = format!(
        r#"<h1>Edit {username}</h1>
<form method="POST" action="/users/{id}?_method=PATCH">{csrf}{form_error}
{first}{last}
<button type="submit">Save</button>
</form>"#,
        username = text(&user.username),
        id = user.id,
        csrf = layout.csrf_field(),
        form_error = form_error(errors),
        first = input("first_name", "First name", "text", &form.first_name, errors),
        last = input("last_name", "Last name", "text", &form.last_name, errors),
    );
    layout.render("Edit profile", &body)
}

fn message_card(user: &User, message: &Message) -> String {
    let mut html = format!(
        r#"<article class="message"><p>{}</p>"#,
        text(&message.text)
    );
    if let Some(img) = &message.img {
        let _ = write!(html, r#"<img src="{}" alt="">"#, attr(img));
    }
    let _ = write!(
        html,
        r#"<footer><a href="/users/{uid}/messages/{mid}">{at}</a></footer></article>"#,
        uid = user.id,
        mid = message.id,
        at = text(&message.created_at),
    );
    html
}

pub fn messages_index(layout: &Layout, user: &User, messages: &[Message]) -> Html<String> {
    let mut body = format!(
        r#"<h1>{}'s messages</h1><p><a href="/users/{}/messages/new">New message</a></p>"#,
        text(&user.first_name),
        user.id,
    );
    if messages.is_empty() {
        body.push_str("<p>No messages yet.</p>");
    }
    for message in messages {
        body.push_str(&message_card(user, message));
    }
    layout.render("Messages", &body)
}

fn message_fields(form: &MessageForm, errors: &FormErrors) -> String {
    let mut html = String::from(r#"<label for="text">Text</label>"#);
    let _ = write!(
        html,
        r#"<textarea id="text" name="text">{}</textarea>"#,
        text(&form.text)
    );
    for error in errors.field("text") {
        let _ = write!(html, r#"<p class="field-error">{}</p>"#, text(error));
    }
    html.push_str(&input("img", "Image URL", "url", &form.img, errors));
    html
}

pub fn messages_new(
    layout: &Layout,
    user: &User,
    form: &MessageForm,
    errors: &FormErrors,
) -> Html<String> {
    let body = format!(
        r#"<h1>New message</h1>
<form method="POST" action="/users/{id}/messages">{csrf}{form_error}
{fields}
<button type="submit">Post</button>
</form>"#,
        id = user.id,
        csrf = layout.csrf_field(),
        form_error = form_error(errors),
        fields = message_fields(form, errors),
    );
    layout.render("New message", &body)
}

pub fn messages_show(layout: &Layout, user: &User, message: &Message) -> Html<String> {
    let action = format!("/users/{}/messages/{}", user.id, message.id);
    let body = format!(
        r#"{card}<p><a href="{action}/edit">Edit</a> <a href="/users/{uid}/messages">Back</a></p>{delete}"#,
        card = message_card(user, message),
        action = attr(&action),
        uid = user.id,
        delete = layout.delete_button(&action, "Delete message"),
    );
    layout.render("Message", &body)
}

pub fn messages_edit(
    layout: &Layout,
    user: &User,
    message: &Message,
    form: &MessageForm,
    errors: &FormErrors,
) -> Html<String> {
    let body = format!(
        r#"<h1>Edit message</h1>
<form method="POST" action="/users/{uid}/messages/{mid}?_method=PATCH">{csrf}{form_error}
{fields}
<button type="submit">Save</button>
</form>"#,
        uid = user.id,
        mid = message.id,
        csrf = layout.csrf_field(),
        form_error = form_error(errors),
        fields = message_fields(form, errors),
    );
    layout.render("Edit message", &body)
}

/// Rendered without a session, so no nav state or flashes.
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let reason = status.canonical_reason().unwrap_or("Error");
    Layout::default().render(
        reason,
        &format!(
            r#"<h1>{} {}</h1><p>{}</p><p><a href="/users">Back to users</a></p>"#,
            status.as_u16(),
            text(reason),
            text(message)
        ),
    )
}
