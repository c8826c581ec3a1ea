//! Availability and eligibility rules for lending.
//!
//! Everything in this module is pure: callers load loan records (or counts)
//! from the ledger, and the functions here decide. Nothing is cached between
//! calls, so every answer reflects the ledger contents it was given.

mod availability;
mod clock;
mod eligibility;

pub use availability::Availability;
pub use clock::{Clock, FixedClock, SystemClock};
pub use eligibility::{check_eligibility, MemberStanding};

use chrono::{Duration, NaiveDate};
use thiserror::Error;

/// Hard cap on simultaneously open loans per member
pub const MAX_OPEN_LOANS: i64 = 3;

/// Fixed loan period, in days
pub const LOAN_PERIOD_DAYS: i64 = 7;

/// Typed rejection produced by the lending rules.
///
/// Every variant is a recoverable, user-facing condition. None of them is
/// produced after a write has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LendingError {
    #[error("Member already has {} open loans", MAX_OPEN_LOANS)]
    CapExceeded,

    #[error("Member has at least one overdue loan")]
    MemberOverdue,

    #[error("No copy of this item is available for loan")]
    ItemUnavailable,

    #[error("Loan has already been returned")]
    AlreadyReturned,

    #[error("Return date cannot precede the checkout date")]
    InvalidReturnDate,
}

impl LendingError {
    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            LendingError::CapExceeded => "cap_exceeded",
            LendingError::MemberOverdue => "member_overdue",
            LendingError::ItemUnavailable => "item_unavailable",
            LendingError::AlreadyReturned => "already_returned",
            LendingError::InvalidReturnDate => "invalid_return_date",
        }
    }
}

/// Due date applied when none is supplied
pub fn default_due_date(checkout_date: NaiveDate) -> NaiveDate {
    checkout_date + Duration::days(LOAN_PERIOD_DAYS)
}

/// A loan is overdue iff it is still open and today is strictly after its due date.
pub fn is_overdue(due_date: NaiveDate, return_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    return_date.is_none() && today > due_date
}

/// Decide the return date for a loan being marked returned today.
pub fn return_date_for(
    checkout_date: NaiveDate,
    return_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate, LendingError> {
    if return_date.is_some() {
        return Err(LendingError::AlreadyReturned);
    }
    if today < checkout_date {
        return Err(LendingError::InvalidReturnDate);
    }
    Ok(today)
}
