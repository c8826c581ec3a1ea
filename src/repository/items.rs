//! Catalog items repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::catalog::{
        CatalogItem, CatalogItemRow, CatalogItemSummary, CatalogQuery, CreateCatalogItem, ItemDetails,
        UpdateCatalogItem,
    },
};

pub(crate) const ITEM_COLUMNS: &str = r#"
    id, media_type, title, creator, total_copies, created_at,
    runtime_minutes, track_count, performer, publisher, min_players, max_players
"#;

/// Kind-specific columns of an item, in table order
struct DetailColumns {
    runtime_minutes: Option<i32>,
    track_count: Option<i32>,
    performer: Option<String>,
    publisher: Option<String>,
    min_players: Option<i32>,
    max_players: Option<i32>,
}

impl From<&ItemDetails> for DetailColumns {
    fn from(details: &ItemDetails) -> Self {
        let mut columns = DetailColumns {
            runtime_minutes: None,
            track_count: None,
            performer: None,
            publisher: None,
            min_players: None,
            max_players: None,
        };
        match details {
            ItemDetails::Book => {}
            ItemDetails::Video { runtime_minutes } => columns.runtime_minutes = Some(*runtime_minutes),
            ItemDetails::Audio { track_count, performer } => {
                columns.track_count = Some(*track_count);
                columns.performer = Some(performer.clone());
            }
            ItemDetails::BoardGame { publisher, min_players, max_players } => {
                columns.publisher = Some(publisher.clone());
                columns.min_players = Some(*min_players);
                columns.max_players = Some(*max_players);
            }
        }
        columns
    }
}

#[derive(sqlx::FromRow)]
struct CatalogItemCountRow {
    #[sqlx(flatten)]
    item: CatalogItemRow,
    open_loans: i64,
}

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<CatalogItem> {
        let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
            "SELECT {} FROM catalog_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        CatalogItem::try_from(row)
    }

    /// Search items with pagination, availability computed from open loans
    pub async fn search(&self, query: &CatalogQuery) -> AppResult<(Vec<CatalogItemSummary>, i64)> {
        let (limit, offset) = super::pagination(query.page, query.per_page);
        let media_type = query.media_type.map(|m| m.as_str());
        let title = query.title.as_deref().map(super::contains_pattern);
        let available_only = query.available_only.unwrap_or(false);

        // Board games never count as available
        let filter = r#"
            FROM (
                SELECT i.*,
                       (SELECT COUNT(*) FROM loans l
                        WHERE l.item_id = i.id AND l.return_date IS NULL) AS open_loans
                FROM catalog_items i
            ) c
            WHERE ($1::text IS NULL OR c.media_type = $1)
              AND ($2::text IS NULL OR LOWER(c.title) LIKE $2 OR LOWER(c.creator) LIKE $2)
              AND (NOT $3 OR (c.media_type <> 'board_game' AND c.total_copies - c.open_loans > 0))
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {}", filter))
            .bind(media_type)
            .bind(&title)
            .bind(available_only)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, CatalogItemCountRow>(&format!(
            "SELECT {}, c.open_loans {} ORDER BY c.media_type, c.title, c.id LIMIT $4 OFFSET $5",
            ITEM_COLUMNS, filter
        ))
        .bind(media_type)
        .bind(&title)
        .bind(available_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let summaries = rows
            .into_iter()
            .map(|row| Ok(CatalogItemSummary::new(CatalogItem::try_from(row.item)?, row.open_loans)))
            .collect::<AppResult<Vec<_>>>()?;

        Ok((summaries, total))
    }

    /// Create a new item
    pub async fn create(&self, item: &CreateCatalogItem, created_at: NaiveDate) -> AppResult<CatalogItem> {
        let columns = DetailColumns::from(&item.details);

        let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
            r#"
            INSERT INTO catalog_items (
                media_type, title, creator, total_copies, created_at,
                runtime_minutes, track_count, performer, publisher, min_players, max_players
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(item.details.media_type().as_str())
        .bind(&item.title)
        .bind(&item.creator)
        .bind(item.total_copies)
        .bind(created_at)
        .bind(columns.runtime_minutes)
        .bind(columns.track_count)
        .bind(&columns.performer)
        .bind(&columns.publisher)
        .bind(columns.min_players)
        .bind(columns.max_players)
        .fetch_one(&self.pool)
        .await?;

        CatalogItem::try_from(row)
    }

    /// Update an existing item.
    ///
    /// The copy count may not drop below the number of open loans. The item
    /// row stays locked from the check to the write.
    pub async fn update(&self, id: i32, update: &UpdateCatalogItem) -> AppResult<CatalogItem> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
            "SELECT {} FROM catalog_items WHERE id = $1 FOR UPDATE",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;
        let current = CatalogItem::try_from(row)?;

        if let Some(ref details) = update.details {
            if details.media_type() != current.media_type() {
                return Err(AppError::Validation(format!(
                    "Item {} is a {} and cannot become a {}",
                    id,
                    current.media_type(),
                    details.media_type()
                )));
            }
        }

        if let Some(total_copies) = update.total_copies {
            let open_loans: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE item_id = $1 AND return_date IS NULL")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            if i64::from(total_copies) < open_loans {
                return Err(AppError::BusinessRule(format!(
                    "Item {} has {} copies on loan, cannot reduce to {}",
                    id, open_loans, total_copies
                )));
            }
        }

        let details = update.details.as_ref().unwrap_or(&current.details);
        let columns = DetailColumns::from(details);

        let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
            r#"
            UPDATE catalog_items
            SET title = $2, creator = $3, total_copies = $4,
                runtime_minutes = $5, track_count = $6, performer = $7,
                publisher = $8, min_players = $9, max_players = $10
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(update.title.as_ref().unwrap_or(&current.title))
        .bind(update.creator.as_ref().unwrap_or(&current.creator))
        .bind(update.total_copies.unwrap_or(current.total_copies))
        .bind(columns.runtime_minutes)
        .bind(columns.track_count)
        .bind(&columns.performer)
        .bind(&columns.publisher)
        .bind(columns.min_players)
        .bind(columns.max_players)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        CatalogItem::try_from(row)
    }

    /// Delete an item. Refused while copies are on loan; closed loans go with it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM catalog_items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Item with id {} not found", id)));
        }

        let open_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE item_id = $1 AND return_date IS NULL")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if open_loans > 0 {
            return Err(AppError::BusinessRule(format!(
                "Item {} has {} copies on loan",
                id, open_loans
            )));
        }

        sqlx::query("DELETE FROM catalog_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
