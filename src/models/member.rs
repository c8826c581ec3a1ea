//! Member model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::lending::MemberStanding;

/// Registered borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub family_name: String,
    pub given_name: String,
    pub email: String,
    pub registered_at: NaiveDate,
    pub active: bool,
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.given_name, self.family_name)
    }
}

/// Member with live borrowing standing, for lists and detail views
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberSummary {
    #[serde(flatten)]
    pub member: Member,
    pub open_loans: i64,
    pub overdue_loans: i64,
    pub can_borrow: bool,
}

impl MemberSummary {
    pub fn new(member: Member, standing: MemberStanding) -> Self {
        Self {
            member,
            open_loans: standing.open_loans,
            overdue_loans: standing.overdue_loans,
            can_borrow: standing.check().is_ok(),
        }
    }
}

/// Internal row structure for member list queries
#[derive(Debug, Clone, FromRow)]
pub struct MemberSummaryRow {
    #[sqlx(flatten)]
    pub member: Member,
    pub open_loans: i64,
    pub overdue_loans: i64,
}

impl From<MemberSummaryRow> for MemberSummary {
    fn from(row: MemberSummaryRow) -> Self {
        let standing = MemberStanding {
            member_id: row.member.id,
            open_loans: row.open_loans,
            overdue_loans: row.overdue_loans,
        };
        MemberSummary::new(row.member, standing)
    }
}

/// Member query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MemberQuery {
    /// Search in given name, family name and email
    pub name: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create member request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(min = 1, max = 100, message = "Family name must be 1 to 100 characters"))]
    pub family_name: String,
    #[validate(length(min = 1, max = 100, message = "Given name must be 1 to 100 characters"))]
    pub given_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Update member request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(length(min = 1, max = 100, message = "Family name must be 1 to 100 characters"))]
    pub family_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Given name must be 1 to 100 characters"))]
    pub given_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub active: Option<bool>,
}
