//! Business logic services

pub mod circulation;
pub mod connectors;
pub mod limits;
pub mod lots;
pub mod notifications;
pub mod prolongations;
pub mod registry;

use std::sync::Arc;

use crate::{
    config::AppConfig, error::AppResult, repository::barcode_lots::NamespaceScope,
    repository::Repository,
};

use notifications::{NotificationDispatcher, TracingDispatcher};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub registry: registry::RegistryService,
    pub circulation: circulation::CirculationService,
    pub prolongations: prolongations::ProlongationsService,
    pub limits: limits::GenreLimitsService,
    pub connectors: connectors::ConnectorsService,
    pub lots: lots::LotsService,
    pub notifications: notifications::NotificationsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self::with_dispatcher(repository, config, Arc::new(TracingDispatcher))
    }

    /// Same wiring with an explicit notification transport
    pub fn with_dispatcher(
        repository: Repository,
        config: &AppConfig,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let scope = NamespaceScope::parse(&config.barcode.namespace_scope);
        let connectors = connectors::ConnectorsService::new(repository.clone());
        let notifications =
            notifications::NotificationsService::new(connectors.clone(), dispatcher);
        let limits =
            limits::GenreLimitsService::new(repository.clone(), config.circulation.clone());

        Self {
            registry: registry::RegistryService::new(repository.clone(), scope),
            circulation: circulation::CirculationService::new(
                repository.clone(),
                limits.clone(),
                notifications.clone(),
                config.circulation.clone(),
            ),
            prolongations: prolongations::ProlongationsService::new(
                repository.clone(),
                notifications.clone(),
                config.circulation.clone(),
            ),
            limits,
            connectors,
            lots: lots::LotsService::new(repository.clone(), scope),
            notifications,
            repository,
        }
    }

    /// Round-trip to the database, used by the readiness endpoint
    pub async fn ping_database(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.repository.pool)
            .await?;
        Ok(())
    }
}
