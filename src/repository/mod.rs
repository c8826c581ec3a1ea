//! Repository layer for database operations

pub mod accounts;
pub mod items;
pub mod loans;
pub mod members;

use sqlx::{Pool, Postgres};

pub use loans::{LoanLedger, NewLoan};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub items: items::ItemsRepository,
    pub members: members::MembersRepository,
    pub loans: loans::LoansRepository,
    pub accounts: accounts::AccountsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>, serialization_retries: u32) -> Self {
        Self {
            items: items::ItemsRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone(), serialization_retries),
            accounts: accounts::AccountsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Page and limit with the defaults used by every list endpoint
pub(crate) fn pagination(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let per_page = per_page.unwrap_or(20).clamp(1, 200);
    let page = page.unwrap_or(1).max(1);
    (per_page, (page - 1).saturating_mul(per_page))
}

/// Lowercased substring pattern for `LIKE`, with `%`, `_` and `\` matched literally
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// True when a Postgres error is a unique constraint violation
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23505")
}
