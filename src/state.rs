use std::sync::Arc;

use crate::auth::{
    identity::{DisabledVerifier, IdentityVerifier, JwtIdentityVerifier},
    jwt::JwtKeys,
    memory::InMemoryUserStore,
    password::Hasher,
    repo::{PgUserStore, UserStore},
    reset::ResetTokens,
};
use crate::config::AppConfig;
use crate::db;
use crate::tasks::{
    memory::InMemoryTaskStore,
    repo::{PgTaskStore, TaskStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub jwt: JwtKeys,
    pub hasher: Hasher,
    pub resets: ResetTokens,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let identity: Arc<dyn IdentityVerifier> = match &config.identity {
            Some(cfg) => Arc::new(JwtIdentityVerifier::from_config(cfg)?),
            None => {
                tracing::info!("external identity provider not configured; external sign-in disabled");
                Arc::new(DisabledVerifier)
            }
        };

        match config.database_url.as_deref() {
            Some(url) => {
                let pool = db::connect(url).await?;
                let users = Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>;
                let tasks = Arc::new(PgTaskStore::new(pool)) as Arc<dyn TaskStore>;
                Self::from_parts(config, users, tasks, identity)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores, data is not persisted");
                Self::in_memory(config, identity)
            }
        }
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            jwt: JwtKeys::from_config(&config.jwt),
            hasher: Hasher::from_config(&config.hashing)?,
            resets: ResetTokens::new(config.reset_ttl_minutes),
            config,
            users,
            tasks,
            identity,
        })
    }

    pub fn in_memory(
        config: Arc<AppConfig>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> anyhow::Result<Self> {
        Self::from_parts(
            config,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryTaskStore::new()),
            identity,
        )
    }
}
