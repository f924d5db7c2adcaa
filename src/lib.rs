//! Medinventory lending server
//!
//! Tracks a medical inventory, the users borrowing from it and the loans
//! linking the two, exposed as a REST JSON API. Loan creation and return keep
//! item quantities consistent, and a nightly job marks expired loans overdue.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, &config.lending, &config.reconciliation);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
