//! Accounts repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::account::{Account, Role},
};

const ACCOUNT_COLUMNS: &str = "id, login, password, role, member_id, created_at";

#[derive(Clone)]
pub struct AccountsRepository {
    pool: Pool<Postgres>,
}

impl AccountsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get account by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(&format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account with id {} not found", id)))
    }

    /// Get account by login, case-insensitive
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE LOWER(login) = LOWER($1)",
            ACCOUNT_COLUMNS
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn login_exists(&self, login: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE LOWER(login) = LOWER($1))")
            .bind(login)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create an account. `password_hash` must already be hashed.
    pub async fn create(
        &self,
        login: &str,
        password_hash: &str,
        role: Role,
        member_id: Option<i32>,
    ) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (login, password, role, member_id, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(login)
        .bind(password_hash)
        .bind(role)
        .bind(member_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::Conflict(format!("Login {} is already taken", login))
            } else {
                AppError::Database(e)
            }
        })
    }
}
