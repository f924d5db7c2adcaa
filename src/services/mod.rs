//! Business logic services

pub mod inventory;
pub mod loans;
pub mod reconciliation;
pub mod users;

use std::time::Duration;

use crate::{
    config::{LendingConfig, ReconciliationConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub loans: loans::LoansService,
    pub inventory: inventory::InventoryService,
    pub users: users::UsersService,
    pub reconciler: reconciliation::OverdueReconciler,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        lending: &LendingConfig,
        reconciliation: &ReconciliationConfig,
    ) -> Self {
        let timezone = lending.timezone();

        Self {
            loans: loans::LoansService::new(repository.clone(), timezone),
            inventory: inventory::InventoryService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            reconciler: reconciliation::OverdueReconciler::new(
                repository.clone(),
                timezone,
                Duration::from_secs(reconciliation.update_timeout_secs),
            ),
            repository,
        }
    }

    /// Check that the storage backend answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
