//! Catalog management service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    lending::Clock,
    models::catalog::{CatalogItem, CatalogItemSummary, CatalogQuery, CreateCatalogItem, UpdateCatalogItem},
    repository::{LoanLedger, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Search items with filters
    pub async fn search_items(&self, query: &CatalogQuery) -> AppResult<(Vec<CatalogItemSummary>, i64)> {
        self.repository.items.search(query).await
    }

    /// Get item by ID with its current availability
    pub async fn get_item(&self, id: i32) -> AppResult<CatalogItemSummary> {
        let item = self.repository.items.get_by_id(id).await?;
        let availability = self.repository.loans.item_availability(id).await?;
        Ok(CatalogItemSummary::new(item, availability.open_loans))
    }

    /// Create a new item, dated today
    pub async fn create_item(&self, item: CreateCatalogItem) -> AppResult<CatalogItem> {
        item.validate()?;

        let created = self.repository.items.create(&item, self.clock.today()).await?;
        tracing::info!("Catalog item {} created: {}", created.id, created);
        Ok(created)
    }

    /// Update an existing item
    pub async fn update_item(&self, id: i32, item: UpdateCatalogItem) -> AppResult<CatalogItem> {
        item.validate()?;

        let updated = self.repository.items.update(id, &item).await?;
        tracing::info!("Catalog item {} updated", id);
        Ok(updated)
    }

    /// Delete an item
    pub async fn delete_item(&self, id: i32) -> AppResult<()> {
        self.repository.items.delete(id).await?;
        tracing::info!("Catalog item {} deleted", id);
        Ok(())
    }
}
