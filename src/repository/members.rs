//! Members repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, MemberQuery, MemberSummary, MemberSummaryRow, UpdateMember},
};

const MEMBER_COLUMNS: &str = "id, family_name, given_name, email, registered_at, active";

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!("SELECT {} FROM members WHERE id = $1", MEMBER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM members WHERE LOWER(email) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search members with pagination and live loan counts
    pub async fn search(&self, query: &MemberQuery, today: NaiveDate) -> AppResult<(Vec<MemberSummary>, i64)> {
        let (limit, offset) = super::pagination(query.page, query.per_page);
        let name = query.name.as_deref().map(super::contains_pattern);

        let filter = r#"
            FROM members m
            WHERE ($1::text IS NULL
                   OR LOWER(m.family_name) LIKE $1
                   OR LOWER(m.given_name) LIKE $1
                   OR LOWER(m.email) LIKE $1)
              AND ($2::bool IS NULL OR m.active = $2)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {}", filter))
            .bind(&name)
            .bind(query.active)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, MemberSummaryRow>(&format!(
            r#"
            SELECT m.id, m.family_name, m.given_name, m.email, m.registered_at, m.active,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.member_id = m.id AND l.return_date IS NULL) AS open_loans,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.member_id = m.id AND l.return_date IS NULL AND l.due_date < $3) AS overdue_loans
            {}
            ORDER BY m.family_name, m.given_name, m.id
            LIMIT $4 OFFSET $5
            "#,
            filter
        ))
        .bind(&name)
        .bind(query.active)
        .bind(today)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(MemberSummary::from).collect(), total))
    }

    /// Create a new member
    pub async fn create(&self, member: &CreateMember, registered_at: NaiveDate) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (family_name, given_name, email, registered_at, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {}
            "#,
            MEMBER_COLUMNS
        ))
        .bind(&member.family_name)
        .bind(&member.given_name)
        .bind(&member.email)
        .bind(registered_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &member.email))
    }

    /// Update an existing member
    pub async fn update(&self, id: i32, update: &UpdateMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE members
            SET family_name = COALESCE($2, family_name),
                given_name = COALESCE($3, given_name),
                email = COALESCE($4, email),
                active = COALESCE($5, active)
            WHERE id = $1
            RETURNING {}
            "#,
            MEMBER_COLUMNS
        ))
        .bind(id)
        .bind(&update.family_name)
        .bind(&update.given_name)
        .bind(&update.email)
        .bind(update.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| email_conflict(e, update.email.as_deref().unwrap_or_default()))?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Delete a member. Refused while loans are open; closed loans go with it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM members WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }

        let open_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE member_id = $1 AND return_date IS NULL")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if open_loans > 0 {
            return Err(AppError::BusinessRule(format!(
                "Member {} has {} open loans",
                id, open_loans
            )));
        }

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// The unique index on LOWER(email) backs the pre-check against races
fn email_conflict(e: sqlx::Error, email: &str) -> AppError {
    if super::is_unique_violation(&e) {
        AppError::Conflict(format!("A member with email {} already exists", email))
    } else {
        AppError::Database(e)
    }
}
