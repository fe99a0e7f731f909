use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AdminService, ApprovalService, AuthService, RecoveryService, SeaOrmAdminService,
    SeaOrmApprovalService, SeaOrmAuthService, SeaOrmRecoveryService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub approval_service: Arc<dyn ApprovalService>,

    pub recovery_service: Arc<dyn RecoveryService>,

    pub admin_service: Arc<dyn AdminService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    /// Wire the service graph over an existing connection. Tests use this
    /// with an in-memory database.
    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let approval_service: Arc<dyn ApprovalService> =
            Arc::new(SeaOrmApprovalService::new(store.clone()));

        let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            approval_service.clone(),
            config.security.clone(),
        ));

        let recovery_service: Arc<dyn RecoveryService> = Arc::new(SeaOrmRecoveryService::new(
            store.clone(),
            approval_service.clone(),
            config.recovery.clone(),
            config.security.clone(),
        ));

        let admin_service: Arc<dyn AdminService> = Arc::new(SeaOrmAdminService::new(
            store.clone(),
            approval_service.clone(),
        ));

        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            approval_service,
            recovery_service,
            admin_service,
        }
    }
}
