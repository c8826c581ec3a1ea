//! Business logic services

pub mod auth;
pub mod catalog;
pub mod loans;
pub mod members;

use std::sync::Arc;

use crate::{config::AuthConfig, lending::Clock, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository and date source
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, auth_config: AuthConfig) -> Self {
        let ledger = Arc::new(repository.loans.clone());
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone()),
            members: members::MembersService::new(repository.clone(), clock.clone()),
            loans: loans::LoansService::new(ledger, repository, clock),
        }
    }
}
