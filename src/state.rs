use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, MessageService, SeaOrmAuthService, SeaOrmMessageService, SeaOrmUserService,
    UserService,
};

/// Everything a request handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth: Arc<dyn AuthService>,

    pub users: Arc<dyn UserService>,

    pub messages: Arc<dyn MessageService>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub async fn new(
        config: Config,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store, prometheus_handle))
    }

    #[must_use]
    pub fn with_store(
        config: Config,
        store: Store,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> Self {
        let auth = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;
        let users = Arc::new(SeaOrmUserService::new(store.clone())) as Arc<dyn UserService>;
        let messages =
            Arc::new(SeaOrmMessageService::new(store.clone())) as Arc<dyn MessageService>;

        Self {
            config: Arc::new(config),
            store,
            auth,
            users,
            messages,
            prometheus_handle,
        }
    }
}
