use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use postboard::config::Config;
use postboard::db::Store;
use postboard::domain::UserId;
use postboard::web::App;
use sea_orm::{ConnectionTrait, Statement};
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.server.secure_cookies = false;
    config.security.csrf_enabled = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.observability.metrics_enabled = false;
    config
}

async fn spawn_app_with(config: Config) -> (App, Store) {
    spawn_app_with_metrics(config, None).await
}

async fn spawn_app_with_metrics(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> (App, Store) {
    let state = postboard::web::create_app_state_from_config(config, prometheus_handle)
        .await
        .expect("Failed to create app state");
    let store = state.store.clone();
    let app = postboard::web::app(state)
        .await
        .expect("Failed to build app");
    (app, store)
}

async fn spawn_app() -> (App, Store) {
    spawn_app_with(test_config()).await
}

/// One browser: remembers the session cookie between requests.
struct Client {
    app: App,
    cookie: Option<String>,
}

impl Client {
    fn new(app: &App) -> Self {
        Self {
            app: app.clone(),
            cookie: None,
        }
    }

    async fn send(&mut self, method: &str, uri: &str, body: Option<String>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send("GET", uri, None).await
    }

    async fn post(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        self.send("POST", uri, Some(encode(fields))).await
    }

    async fn get_text(&mut self, uri: &str) -> (StatusCode, String) {
        let response = self.get(uri).await;
        let status = response.status();
        (status, body_text(response).await)
    }

    async fn signup(&mut self, username: &str, password: &str) -> Response<Body> {
        self.post(
            "/users",
            &[
                ("first_name", "Test"),
                ("last_name", "User"),
                ("username", username),
                ("password", password),
            ],
        )
        .await
    }

    async fn login(&mut self, username: &str, password: &str) -> Response<Body> {
        self.post(
            "/users/login",
            &[("username", username), ("password", password)],
        )
        .await
    }
}

fn encode(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={}", v.replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&")
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
}

async fn user_id(store: &Store, username: &str) -> UserId {
    store
        .get_user_by_username(username)
        .await
        .unwrap()
        .expect("user should exist")
        .id
}

#[tokio::test]
async fn test_root_and_health() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(&app);

    let response = client.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");

    let (status, body) = client.get_text("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = client.get_text("/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = client.get("/static/style.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css"
    );
}

#[tokio::test]
async fn test_signup_logs_in_and_bounces_from_signup_pages() {
    let (app, store) = spawn_app().await;
    let mut client = Client::new(&app);

    let response = client.signup("ada", "engine1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");
    assert_eq!(store.user_count().await.unwrap(), 1);

    let (status, body) = client.get_text("/users").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("User Created"));
    assert!(body.contains("ada"));

    for uri in ["/users/new", "/users/login"] {
        let response = client.get(uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/users");
    }

    let (_, body) = client.get_text("/users").await;
    assert!(body.contains("You are logged in already"));
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let (app, store) = spawn_app().await;

    let mut first = Client::new(&app);
    first.signup("ada", "engine1").await;
    assert_eq!(store.user_count().await.unwrap(), 1);

    let mut second = Client::new(&app);
    let response = second.signup("ada", "different1").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("Username Taken"));
    assert_eq!(store.user_count().await.unwrap(), 1);

    let response = second.get("/users/logout").await;
    assert_eq!(location(&response), "/users/login");
}

#[tokio::test]
async fn test_invalid_signup_rerenders_form() {
    let (app, store) = spawn_app().await;
    let mut client = Client::new(&app);

    let response = client
        .post("/users", &[("first_name", "Ada"), ("username", "ada")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("This field is required."));
    assert!(body.contains(r#"value="Ada""#));
    assert_eq!(store.user_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_login_and_logout() {
    let (app, _) = spawn_app().await;
    Client::new(&app).signup("ada", "engine1").await;

    let mut client = Client::new(&app);
    let response = client.login("ada", "wrong-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid Credentials"));

    let response = client.login("ada", "engine1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");

    let response = client.get("/users/logout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login");

    let (_, body) = client.get_text("/users/login").await;
    assert!(body.contains("Logged Out!"));

    let response = client.get("/users/logout").await;
    assert_eq!(location(&response), "/users/login");
    let (_, body) = client.get_text("/users/login").await;
    assert!(body.contains("Please log in first!"));
}

#[tokio::test]
async fn test_anonymous_visitor_cannot_reach_messages() {
    let (app, store) = spawn_app().await;
    Client::new(&app).signup("ada", "engine1").await;
    let ada = user_id(&store, "ada").await;

    let mut anonymous = Client::new(&app);
    let response = anonymous.get(&format!("/users/{ada}/messages")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login");

    let (status, body) = anonymous.get_text(&format!("/users/{ada}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("@ada"));
}

#[tokio::test]
async fn test_cannot_view_another_users_message_pages() {
    let (app, store) = spawn_app().await;

    let mut ada = Client::new(&app);
    ada.signup("ada", "engine1").await;
    let ada_id = user_id(&store, "ada").await;
    ada.post(
        &format!("/users/{ada_id}/messages"),
        &[("text", "first post")],
    )
    .await;
    let message = store.list_messages(ada_id).await.unwrap().remove(0);

    let mut grace = Client::new(&app);
    grace.signup("grace", "compiler1").await;

    for uri in [
        format!("/users/{ada_id}/messages"),
        format!("/users/{ada_id}/messages/new"),
        format!("/users/{ada_id}/messages/{}", message.id),
        format!("/users/{ada_id}/messages/{}/edit", message.id),
        format!("/users/{ada_id}/edit"),
    ] {
        let response = grace.get(&uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/users", "{uri}");
    }

    let (_, body) = grace.get_text("/users").await;
    assert!(body.contains("Not Authorized"));
}

#[tokio::test]
async fn test_message_lifecycle() {
    let (app, store) = spawn_app().await;
    let mut client = Client::new(&app);
    client.signup("ada", "engine1").await;
    let ada = user_id(&store, "ada").await;
    let index = format!("/users/{ada}/messages");

    let response = client
        .post(
            &index,
            &[("text", "hello world"), ("img", "https://example.com/cat.png")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), index);

    let (status, body) = client.get_text(&index).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Message Created"));
    assert!(body.contains("hello world"));
    assert!(body.contains(r#"src="https://example.com/cat.png""#));

    let message = store.list_messages(ada).await.unwrap().remove(0);
    let show = format!("{index}/{}", message.id);

    let response = client
        .post(&format!("{show}?_method=PATCH"), &[("text", "edited text")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let updated = store.get_message(ada, message.id).await.unwrap().unwrap();
    assert_eq!(updated.text, "edited text");
    assert_eq!(updated.img, None);

    let response = client.post(&format!("{show}?_method=DELETE"), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), index);
    assert_eq!(store.message_count(ada).await.unwrap(), 0);

    let (status, _) = client.get_text(&show).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_message_edit_leaves_message_unchanged() {
    let (app, store) = spawn_app().await;
    let mut client = Client::new(&app);
    client.signup("ada", "engine1").await;
    let ada = user_id(&store, "ada").await;
    let index = format!("/users/{ada}/messages");

    let response = client.post(&index, &[("text", "   ")]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.message_count(ada).await.unwrap(), 0);

    client.post(&index, &[("text", "original")]).await;
    let message = store.list_messages(ada).await.unwrap().remove(0);

    let response = client
        .post(
            &format!("{index}/{}?_method=PATCH", message.id),
            &[("text", ""), ("img", "not-a-url")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("This field is required."));

    let unchanged = store.get_message(ada, message.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original");
}

#[tokio::test]
async fn test_only_owner_can_delete_message() {
    let (app, store) = spawn_app().await;

    let mut ada = Client::new(&app);
    ada.signup("ada", "engine1").await;
    let ada_id = user_id(&store, "ada").await;
    ada.post(&format!("/users/{ada_id}/messages"), &[("text", "mine")])
        .await;
    let message = store.list_messages(ada_id).await.unwrap().remove(0);
    let target = format!("/users/{ada_id}/messages/{}?_method=DELETE", message.id);

    let mut grace = Client::new(&app);
    grace.signup("grace", "compiler1").await;
    let grace_id = user_id(&store, "grace").await;

    let response = grace.post(&target, &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");
    assert_eq!(store.message_count(ada_id).await.unwrap(), 1);

    // ada's message id under grace's own path is not grace's message
    let response = grace
        .post(
            &format!("/users/{grace_id}/messages/{}?_method=DELETE", message.id),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.message_count(ada_id).await.unwrap(), 1);

    let response = ada.post(&target, &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(store.message_count(ada_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_profile_update() {
    let (app, store) = spawn_app().await;
    let mut ada = Client::new(&app);
    ada.signup("ada", "engine1").await;
    let ada_id = user_id(&store, "ada").await;

    let mut grace = Client::new(&app);
    grace.signup("grace", "compiler1").await;
    let response = grace
        .post(
            &format!("/users/{ada_id}?_method=PATCH"),
            &[("first_name", "Hacked"), ("last_name", "Name")],
        )
        .await;
    assert_eq!(location(&response), "/users");

    let response = ada
        .post(&format!("/users/{ada_id}?_method=PATCH"), &[("first_name", "")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = ada
        .post(
            &format!("/users/{ada_id}?_method=PATCH"),
            &[("first_name", "Augusta"), ("last_name", "King")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let user = store.get_user(ada_id).await.unwrap().unwrap();
    assert_eq!(user.first_name, "Augusta");
    assert_eq!(user.last_name, "King");
    assert_eq!(user.username, "ada");
}

#[tokio::test]
async fn test_delete_account_removes_messages_and_logs_out() {
    let (app, store) = spawn_app().await;
    let mut ada = Client::new(&app);
    ada.signup("ada", "engine1").await;
    let ada_id = user_id(&store, "ada").await;
    ada.post(&format!("/users/{ada_id}/messages"), &[("text", "one")])
        .await;
    ada.post(&format!("/users/{ada_id}/messages"), &[("text", "two")])
        .await;
    assert_eq!(store.message_count(ada_id).await.unwrap(), 2);

    let response = ada.post(&format!("/users/{ada_id}?_method=DELETE"), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");

    assert!(store.get_user(ada_id).await.unwrap().is_none());
    assert_eq!(store.message_count(ada_id).await.unwrap(), 0);

    let (_, body) = ada.get_text("/users").await;
    assert!(body.contains("User Deleted"));

    let response = ada.get("/users/logout").await;
    assert_eq!(location(&response), "/users/login");
}

#[tokio::test]
async fn test_form_token_is_required_when_enabled() {
    let mut config = test_config();
    config.security.csrf_enabled = true;
    let (app, store) = spawn_app_with(config).await;
    let mut client = Client::new(&app);

    let response = client.signup("ada", "engine1").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Invalid or missing form token"));
    assert_eq!(store.user_count().await.unwrap(), 0);

    let (_, page) = client.get_text("/users/new").await;
    let marker = r#"name="csrf_token" value=""#;
    let start = page.find(marker).expect("form token field") + marker.len();
    let token = &page[start..start + 64];

    let response = client
        .post(
            "/users",
            &[
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("username", "ada"),
                ("password", "engine1"),
                ("csrf_token", token),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(store.user_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let (app, _) = spawn_app().await;
    let response = Client::new(&app).get("/users").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_unparseable_ids_render_not_found() {
    let (app, store) = spawn_app().await;
    let mut client = Client::new(&app);
    client.signup("ada", "engine1").await;
    let ada = user_id(&store, "ada").await;

    for uri in [
        "/users/abc".to_string(),
        format!("/users/{ada}/messages/abc"),
        format!("/users/{ada}/messages/abc/edit"),
    ] {
        let (status, body) = client.get_text(&uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body.contains("Page not found"), "{uri}");
    }

    let response = client
        .post(&format!("/users/{ada}/messages/abc?_method=DELETE"), &[])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_percent_encoded_method_override() {
    let (app, store) = spawn_app().await;
    let mut client = Client::new(&app);
    client.signup("ada", "engine1").await;
    let ada = user_id(&store, "ada").await;
    client
        .post(&format!("/users/{ada}/messages"), &[("text", "short-lived")])
        .await;
    let message = store.list_messages(ada).await.unwrap().remove(0);

    let response = client
        .post(
            &format!("/users/{ada}/messages/{}?%5Fmethod=DELETE", message.id),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(store.message_count(ada).await.unwrap(), 0);
}

#[tokio::test]
async fn test_form_token_error_is_kept_alongside_field_errors() {
    let mut config = test_config();
    config.security.csrf_enabled = true;
    let (app, store) = spawn_app_with(config).await;
    let mut client = Client::new(&app);

    let response = client.post("/users", &[("first_name", "Ada")]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("Invalid or missing form token"));
    assert!(body.contains("This field is required."));
    assert_eq!(store.user_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_session_of_deleted_account_is_anonymous() {
    let (app, store) = spawn_app().await;
    let mut laptop = Client::new(&app);
    laptop.signup("ada", "engine1").await;
    let ada = user_id(&store, "ada").await;

    let mut phone = Client::new(&app);
    let response = phone.login("ada", "engine1").await;
    assert_eq!(location(&response), "/users");

    let response = laptop.post(&format!("/users/{ada}?_method=DELETE"), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let (status, _) = phone.get_text("/users/new").await;
    assert_eq!(status, StatusCode::OK);

    let response = phone.get("/users/logout").await;
    assert_eq!(location(&response), "/users/login");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = spawn_app().await;
    let (status, body) = Client::new(&app).get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Metrics not enabled"));

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, || {
        metrics::counter!("postboard_signups_total").increment(3);
    });

    let mut config = test_config();
    config.observability.metrics_enabled = true;
    let (app, _) = spawn_app_with_metrics(config, Some(handle)).await;
    let (status, body) = Client::new(&app).get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("postboard_signups_total 3"));
}

#[tokio::test]
async fn test_sqlite_session_store() {
    let mut config = test_config();
    config.server.session_store = "sqlite".to_string();
    let (app, store) = spawn_app_with(config).await;
    let mut client = Client::new(&app);

    let response = client.signup("ada", "engine1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client.get("/users/new").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");

    let backend = store.conn.get_database_backend();
    let row = store
        .conn
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) AS n FROM tower_sessions",
        ))
        .await
        .unwrap()
        .expect("count row");
    let sessions: i64 = row.try_get("", "n").unwrap();
    assert!(sessions >= 1);

    let response = client.get("/users/logout").await;
    assert_eq!(location(&response), "/users/login");
    let (_, body) = client.get_text("/users/login").await;
    assert!(body.contains("Logged Out!"));
}
