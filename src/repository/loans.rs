//! Loan ledger: the only place loans are written.
//!
//! The [`LoanLedger`] trait is the seam the lending service depends on. The
//! PostgreSQL implementation runs the whole eligibility gate and the insert
//! inside one `SERIALIZABLE` transaction with the member and item rows
//! locked, so two concurrent checkouts cannot both pass the gate.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    lending::{self, Availability, MemberStanding},
    models::{
        catalog::{CatalogItem, CatalogItemRow},
        loan::{Loan, LoanDetails, LoanDetailsRow, LoanQuery},
    },
};

use super::items::ITEM_COLUMNS;

const LOAN_COLUMNS: &str = "id, member_id, item_id, checkout_date, due_date, return_date";

/// Loan about to be written, dates already decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLoan {
    pub member_id: i32,
    pub item_id: i32,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Storage operations the lending rules need
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// Open and overdue counts of a member as of `today`
    async fn member_standing(&self, member_id: i32, today: NaiveDate) -> AppResult<MemberStanding>;

    /// Live availability of an item
    async fn item_availability(&self, item_id: i32) -> AppResult<Availability>;

    /// Run the eligibility gate and record the loan atomically.
    ///
    /// `checkout_date` doubles as "today" for the overdue check.
    async fn checkout(&self, loan: NewLoan) -> AppResult<Loan>;

    /// Set the return date of an open loan to `today`
    async fn mark_returned(&self, loan_id: i32, today: NaiveDate) -> AppResult<Loan>;
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
    serialization_retries: u32,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>, serialization_retries: u32) -> Self {
        Self {
            pool,
            serialization_retries,
        }
    }

    /// Search loans with pagination
    pub async fn search(&self, query: &LoanQuery, today: NaiveDate) -> AppResult<(Vec<LoanDetails>, i64)> {
        let (limit, offset) = super::pagination(query.page, query.per_page);
        let open_only = query.open_only.unwrap_or(false);
        let overdue_only = query.overdue_only.unwrap_or(false);

        let filter = r#"
            FROM loans l
            JOIN members m ON m.id = l.member_id
            JOIN catalog_items i ON i.id = l.item_id
            WHERE ($1::int IS NULL OR l.member_id = $1)
              AND ($2::int IS NULL OR l.item_id = $2)
              AND (NOT $3 OR l.return_date IS NULL)
              AND (NOT $4 OR (l.return_date IS NULL AND l.due_date < $5))
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {}", filter))
            .bind(query.member_id)
            .bind(query.item_id)
            .bind(open_only)
            .bind(overdue_only)
            .bind(today)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, LoanDetailsRow>(&format!(
            r#"
            SELECT l.id, l.member_id, m.given_name, m.family_name,
                   l.item_id, i.title, i.media_type,
                   l.checkout_date, l.due_date, l.return_date
            {}
            ORDER BY l.checkout_date DESC, l.id DESC
            LIMIT $6 OFFSET $7
            "#,
            filter
        ))
        .bind(query.member_id)
        .bind(query.item_id)
        .bind(open_only)
        .bind(overdue_only)
        .bind(today)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(|r| r.into_details(today)).collect(), total))
    }

    /// Get loan with member and item details
    pub async fn get_details(&self, id: i32, today: NaiveDate) -> AppResult<LoanDetails> {
        let row = sqlx::query_as::<_, LoanDetailsRow>(
            r#"
            SELECT l.id, l.member_id, m.given_name, m.family_name,
                   l.item_id, i.title, i.media_type,
                   l.checkout_date, l.due_date, l.return_date
            FROM loans l
            JOIN members m ON m.id = l.member_id
            JOIN catalog_items i ON i.id = l.item_id
            WHERE l.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        Ok(row.into_details(today))
    }

    async fn try_checkout(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        // Lock order is member then item, for every checkout
        let member: Option<i32> = sqlx::query_scalar("SELECT id FROM members WHERE id = $1 FOR UPDATE")
            .bind(loan.member_id)
            .fetch_optional(&mut *tx)
            .await?;
        if member.is_none() {
            return Err(AppError::NotFound(format!("Member with id {} not found", loan.member_id)));
        }

        let item = lock_item(&mut tx, loan.item_id).await?;

        let member_loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE member_id = $1 AND return_date IS NULL",
            LOAN_COLUMNS
        ))
        .bind(loan.member_id)
        .fetch_all(&mut *tx)
        .await?;
        let standing = MemberStanding::from_loans(loan.member_id, &member_loans, loan.checkout_date);

        let item_open_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE item_id = $1 AND return_date IS NULL")
                .bind(loan.item_id)
                .fetch_one(&mut *tx)
                .await?;
        let availability = Availability::new(&item, item_open_loans);

        lending::check_eligibility(&standing, &availability)?;

        let created = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (member_id, item_id, checkout_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(loan.member_id)
        .bind(loan.item_id)
        .bind(loan.checkout_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }
}

#[async_trait]
impl LoanLedger for LoansRepository {
    async fn member_standing(&self, member_id: i32, today: NaiveDate) -> AppResult<MemberStanding> {
        let counts: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM loans l
                 WHERE l.member_id = m.id AND l.return_date IS NULL),
                (SELECT COUNT(*) FROM loans l
                 WHERE l.member_id = m.id AND l.return_date IS NULL AND l.due_date < $2)
            FROM members m
            WHERE m.id = $1
            "#,
        )
        .bind(member_id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;

        let (open_loans, overdue_loans) =
            counts.ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", member_id)))?;

        Ok(MemberStanding {
            member_id,
            open_loans,
            overdue_loans,
        })
    }

    async fn item_availability(&self, item_id: i32) -> AppResult<Availability> {
        let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
            "SELECT {} FROM catalog_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;
        let item = CatalogItem::try_from(row)?;

        let open_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE item_id = $1 AND return_date IS NULL")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Availability::new(&item, open_loans))
    }

    async fn checkout(&self, loan: NewLoan) -> AppResult<Loan> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_checkout(&loan).await {
                Err(AppError::Database(e)) if is_serialization_failure(&e) => {
                    if attempt > self.serialization_retries {
                        tracing::warn!(
                            "Checkout of item {} for member {} still conflicting after {} attempts",
                            loan.item_id,
                            loan.member_id,
                            attempt
                        );
                        return Err(AppError::Conflict(
                            "Concurrent checkout in progress, please retry".to_string(),
                        ));
                    }
                    tracing::debug!("Serialization failure on checkout, attempt {}", attempt);
                }
                result => return result,
            }
        }
    }

    async fn mark_returned(&self, loan_id: i32, today: NaiveDate) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = $1 FOR UPDATE",
            LOAN_COLUMNS
        ))
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        let return_date = lending::return_date_for(loan.checkout_date, loan.return_date, today)?;

        let returned = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans SET return_date = $2
            WHERE id = $1 AND return_date IS NULL
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(loan_id)
        .bind(return_date)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(lending::LendingError::AlreadyReturned)?;

        tx.commit().await?;
        Ok(returned)
    }
}

async fn lock_item(tx: &mut Transaction<'_, Postgres>, item_id: i32) -> AppResult<CatalogItem> {
    let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
        "SELECT {} FROM catalog_items WHERE id = $1 FOR UPDATE",
        ITEM_COLUMNS
    ))
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

    CatalogItem::try_from(row)
}

/// SQLSTATE 40001 (serialization_failure) or 40P01 (deadlock_detected)
fn is_serialization_failure(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "40001" || code == "40P01")
}
