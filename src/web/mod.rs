use axum::{
    Router,
    extract::Request,
    middleware,
    response::Redirect,
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;
use tower::util::MapRequest;
use tower::util::MapRequestLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{ExpiredDeletion, Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::{Config, ServerConfig};
use crate::constants::routes;

mod assets;
mod csrf;
mod error;
mod extract;
mod flash;
mod forms;
mod guards;
mod messages;
mod method_override;
mod observability;
mod users;
mod views;

pub use crate::state::AppState;
pub use error::WebError;

/// The router wrapped so `?_method=` is applied before route matching.
pub type App = MapRequest<Router, fn(Request) -> Request>;

const EXPIRED_SESSION_SWEEP: Duration = Duration::from_secs(60 * 10);

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(AppState::new(config, prometheus_handle).await?))
}

pub async fn app(state: Arc<AppState>) -> anyhow::Result<App> {
    let router = router(state).await?;
    Ok(MapRequestLayer::new(method_override::method_override as fn(Request) -> Request).layer(router))
}

pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let routes = Router::new()
        .route("/", get(|| async { Redirect::to(routes::USERS) }))
        .merge(users::routes())
        .merge(messages::routes())
        .route("/health", get(observability::health))
        .route("/metrics", get(observability::get_metrics))
        .route("/static/{*path}", get(assets::serve_asset))
        .fallback(|| async { WebError::NotFound("Page not found".to_string()) })
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guards::load_viewer,
        ));

    let server = &state.config.server;
    let routes = match server.session_store.as_str() {
        "sqlite" => {
            let pool = state.store.conn.get_sqlite_connection_pool().clone();
            let store = SqliteStore::new(pool);
            store.migrate().await?;
            spawn_session_sweeper(store.clone());
            routes.layer(session_layer(store, server))
        }
        _ => routes.layer(session_layer(MemoryStore::default(), server)),
    };

    Ok(routes
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn session_layer<S>(store: S, server: &ServerConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )))
}

fn spawn_session_sweeper(store: SqliteStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRED_SESSION_SWEEP);
        loop {
            interval.tick().await;
            if let Err(e) = store.delete_expired().await {
                tracing::warn!("Failed to delete expired sessions: {e}");
            }
        }
    });
}
