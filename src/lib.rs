//! Mediatheque lending server
//!
//! A REST JSON API over a catalog of books, videos, audio recordings and
//! board games, a member registry and a loan ledger. Availability and
//! borrowing eligibility are derived live from the ledger by the
//! [`lending`] rules.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod lending;
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
    pub repository: repository::Repository,
}

impl AppState {
    /// Wire repository, services and date source together
    pub fn new(config: AppConfig, repository: repository::Repository, clock: Arc<dyn lending::Clock>) -> Self {
        let services = services::Services::new(repository.clone(), clock, config.auth.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
            repository,
        }
    }
}
