use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::supabase::{SupabaseClient, SupabaseConfig};
use crate::config::{Config, StorageBackend};
use crate::db::{AchievementStore, Backend, Store, UserStore};
use crate::models::achievement::catalog;
use crate::services::{
    AchievementService, AuthService, DefaultAchievementService, DefaultAuthService, MockAnalyzer,
    RegisterRequest, TokenService,
};

/// Opens the storage backend selected by `storage.backend`.
pub async fn connect_backend(config: &Config) -> anyhow::Result<Arc<dyn Backend>> {
    let storage = &config.storage;
    let backend: Arc<dyn Backend> = match storage.backend {
        StorageBackend::Sqlite => Arc::new(
            Store::with_pool_options(
                &storage.database_path,
                storage.max_db_connections,
                storage.min_db_connections,
            )
            .await?,
        ),
        StorageBackend::Supabase => {
            let client = SupabaseClient::new(&SupabaseConfig {
                url: storage.supabase_url.clone().unwrap_or_default(),
                key: storage.supabase_key.clone().unwrap_or_default(),
                request_timeout_seconds: storage.request_timeout_seconds,
            })?;
            Arc::new(client)
        }
    };

    info!(backend = backend.name(), "Storage backend ready");
    Ok(backend)
}

/// Application context handed to every handler.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Arc<dyn Backend>,

    pub auth_service: Arc<dyn AuthService>,

    pub achievement_service: Arc<dyn AchievementService>,

    pub analyzer: MockAnalyzer,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = connect_backend(&config).await?;
        Ok(Self::with_backend(config, store))
    }

    #[must_use]
    pub fn with_backend(config: Config, store: Arc<dyn Backend>) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config.auth));

        let achievement_service: Arc<dyn AchievementService> =
            Arc::new(DefaultAchievementService::new(store.clone()));

        let auth_service: Arc<dyn AuthService> = Arc::new(DefaultAuthService::new(
            store.clone(),
            achievement_service.clone(),
            tokens,
            config.security.clone(),
        ));

        Self {
            config: Arc::new(config),
            store,
            auth_service,
            achievement_service,
            analyzer: MockAnalyzer,
        }
    }

    /// Startup chores. Each step only warns on failure so the server still
    /// comes up when the store is unreachable.
    pub async fn initialize(&self) {
        if let Err(e) = self.store.ping().await {
            warn!(backend = self.store.name(), error = %e, "Storage backend is not reachable");
        }

        match self.store.sync_catalog(&catalog()).await {
            Ok(()) => info!("Achievement catalog synchronized"),
            Err(e) => warn!(error = %e, "Failed to synchronize achievement catalog"),
        }

        if self.config.demo.seed_user {
            self.seed_demo_user().await;
        }
    }

    async fn seed_demo_user(&self) {
        match self.store.has_users().await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Could not check for existing users, skipping demo seed");
                return;
            }
        }

        let demo = &self.config.demo;
        let request = RegisterRequest {
            username: demo.username.clone(),
            email: demo.email.clone(),
            password: demo.password.clone(),
        };

        match self.auth_service.register(request).await {
            Ok(session) => info!(
                user_id = %session.profile.user.id,
                username = %demo.username,
                "Demo user created"
            ),
            Err(e) => warn!(error = %e, "Failed to create demo user"),
        }
    }
}
