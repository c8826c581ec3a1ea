//! Loan (checkout) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::lending::{self, LendingError, MemberStanding};

use super::catalog::MediaType;

/// Loan record from the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub member_id: i32,
    pub item_id: i32,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl Loan {
    /// A loan is open until a return date is recorded
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        lending::is_overdue(self.due_date, self.return_date, today)
    }
}

/// Loan with display details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub member_id: i32,
    pub member_name: String,
    pub item_id: i32,
    pub item_title: String,
    pub media_type: MediaType,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub is_overdue: bool,
}

/// Internal row structure for loan detail queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanDetailsRow {
    pub id: i32,
    pub member_id: i32,
    pub given_name: String,
    pub family_name: String,
    pub item_id: i32,
    pub title: String,
    pub media_type: String,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl LoanDetailsRow {
    pub fn into_details(self, today: NaiveDate) -> LoanDetails {
        LoanDetails {
            id: self.id,
            member_id: self.member_id,
            member_name: format!("{} {}", self.given_name, self.family_name),
            item_id: self.item_id,
            item_title: self.title,
            // media_type is constrained by the schema
            media_type: self.media_type.parse().unwrap_or(MediaType::Book),
            checkout_date: self.checkout_date,
            due_date: self.due_date,
            return_date: self.return_date,
            is_overdue: lending::is_overdue(self.due_date, self.return_date, today),
        }
    }
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub member_id: i32,
    pub item_id: i32,
    /// Expected return date, defaults to checkout + 7 days
    pub due_date: Option<NaiveDate>,
}

/// Loan query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub member_id: Option<i32>,
    pub item_id: Option<i32>,
    pub open_only: Option<bool>,
    pub overdue_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Borrowing eligibility of a member, optionally for one item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EligibilityReport {
    pub member_id: i32,
    pub item_id: Option<i32>,
    pub open_loans: i64,
    pub overdue_loans: i64,
    /// Loans the member may still open before reaching the cap
    pub remaining_quota: i64,
    pub eligible: bool,
    /// Machine-readable rejection reason
    pub reason: Option<String>,
    /// Human-readable rejection message
    pub message: Option<String>,
}

impl EligibilityReport {
    pub fn new(standing: &MemberStanding, item_id: Option<i32>, decision: Result<(), LendingError>) -> Self {
        let rejection = decision.err();
        Self {
            member_id: standing.member_id,
            item_id,
            open_loans: standing.open_loans,
            overdue_loans: standing.overdue_loans,
            remaining_quota: standing.remaining_quota(),
            eligible: rejection.is_none(),
            reason: rejection.map(|e| e.reason().to_string()),
            message: rejection.map(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_open_and_overdue() {
        let mut loan = Loan {
            id: 1,
            member_id: 1,
            item_id: 1,
            checkout_date: date(1),
            due_date: date(8),
            return_date: None,
        };
        assert!(loan.is_open());
        assert!(!loan.is_overdue(date(8)));
        assert!(loan.is_overdue(date(9)));

        loan.return_date = Some(date(10));
        assert!(!loan.is_open());
        assert!(!loan.is_overdue(date(20)));
    }

    #[test]
    fn test_details_row_computes_overdue_against_today() {
        let row = LoanDetailsRow {
            id: 7,
            member_id: 2,
            given_name: "Jean".to_string(),
            family_name: "Dupont".to_string(),
            item_id: 3,
            title: "Le Petit Prince".to_string(),
            media_type: "book".to_string(),
            checkout_date: date(1),
            due_date: date(8),
            return_date: None,
        };
        let details = row.into_details(date(12));
        assert_eq!(details.member_name, "Jean Dupont");
        assert_eq!(details.media_type, MediaType::Book);
        assert!(details.is_overdue);
    }

    #[test]
    fn test_eligibility_report_carries_reason() {
        let standing = MemberStanding { member_id: 5, open_loans: 3, overdue_loans: 0 };
        let report = EligibilityReport::new(&standing, Some(9), Err(LendingError::CapExceeded));
        assert!(!report.eligible);
        assert_eq!(report.remaining_quota, 0);
        assert_eq!(report.reason.as_deref(), Some("cap_exceeded"));

        let standing = MemberStanding { member_id: 5, open_loans: 1, overdue_loans: 0 };
        let report = EligibilityReport::new(&standing, None, Ok(()));
        assert!(report.eligible);
        assert_eq!(report.remaining_quota, 2);
        assert!(report.message.is_none());
    }
}
