use chrono::NaiveDate;

use crate::models::loan::Loan;

use super::{Availability, LendingError, MAX_OPEN_LOANS};

/// Borrowing standing of a member, derived from the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberStanding {
    pub member_id: i32,
    pub open_loans: i64,
    /// Open loans whose due date is strictly before today
    pub overdue_loans: i64,
}

impl MemberStanding {
    pub fn from_loans<'a, I>(member_id: i32, loans: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Loan>,
    {
        let mut standing = Self { member_id, open_loans: 0, overdue_loans: 0 };
        for loan in loans.into_iter().filter(|l| l.member_id == member_id && l.is_open()) {
            standing.open_loans += 1;
            if loan.is_overdue(today) {
                standing.overdue_loans += 1;
            }
        }
        standing
    }

    pub fn has_overdue(&self) -> bool {
        self.overdue_loans > 0
    }

    pub fn remaining_quota(&self) -> i64 {
        (MAX_OPEN_LOANS - self.open_loans).max(0)
    }

    /// Member-side half of the gate. An overdue loan blocks regardless of the cap.
    pub fn check(&self) -> Result<(), LendingError> {
        if self.has_overdue() {
            return Err(LendingError::MemberOverdue);
        }
        if self.open_loans >= MAX_OPEN_LOANS {
            return Err(LendingError::CapExceeded);
        }
        Ok(())
    }
}

/// The eligibility gate: member standing first, then item availability.
pub fn check_eligibility(standing: &MemberStanding, availability: &Availability) -> Result<(), LendingError> {
    standing.check()?;
    availability.check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{CatalogItem, ItemDetails};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn open_loan(id: i32, member_id: i32, due_in_days: i64) -> Loan {
        Loan {
            id,
            member_id,
            item_id: id,
            checkout_date: today() - chrono::Duration::days(3),
            due_date: today() + chrono::Duration::days(due_in_days),
            return_date: None,
        }
    }

    fn available() -> Availability {
        Availability { item_id: 1, lendable: true, total_copies: 2, open_loans: 0 }
    }

    #[test]
    fn test_new_member_can_borrow() {
        let standing = MemberStanding::from_loans(1, &Vec::<Loan>::new(), today());
        assert_eq!(standing.remaining_quota(), 3);
        assert_eq!(check_eligibility(&standing, &available()), Ok(()));
    }

    #[test]
    fn test_cap_of_three_open_loans() {
        let loans = vec![open_loan(1, 1, 4), open_loan(2, 1, 4), open_loan(3, 1, 4)];
        let standing = MemberStanding::from_loans(1, &loans, today());
        assert_eq!(standing.open_loans, 3);
        assert_eq!(check_eligibility(&standing, &available()), Err(LendingError::CapExceeded));
    }

    #[test]
    fn test_returned_and_foreign_loans_do_not_count() {
        let mut returned = open_loan(1, 1, -10);
        returned.return_date = Some(today());
        let loans = vec![returned, open_loan(2, 2, -1), open_loan(3, 1, 2)];

        let standing = MemberStanding::from_loans(1, &loans, today());
        assert_eq!(standing.open_loans, 1);
        assert!(!standing.has_overdue());
    }

    #[test]
    fn test_overdue_blocks_below_cap() {
        let loans = vec![open_loan(1, 1, -1)];
        let standing = MemberStanding::from_loans(1, &loans, today());
        assert_eq!(standing.overdue_loans, 1);
        assert_eq!(check_eligibility(&standing, &available()), Err(LendingError::MemberOverdue));

        let loans = vec![open_loan(1, 1, -1), open_loan(2, 1, 5)];
        let standing = MemberStanding::from_loans(1, &loans, today());
        assert_eq!(check_eligibility(&standing, &available()), Err(LendingError::MemberOverdue));
    }

    #[test]
    fn test_overdue_is_reported_before_cap() {
        let loans = vec![open_loan(1, 1, -2), open_loan(2, 1, 5), open_loan(3, 1, 5)];
        let standing = MemberStanding::from_loans(1, &loans, today());
        assert_eq!(standing.check(), Err(LendingError::MemberOverdue));
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let loans = vec![open_loan(1, 1, 0)];
        let standing = MemberStanding::from_loans(1, &loans, today());
        assert!(!standing.has_overdue());
    }

    #[test]
    fn test_member_checks_run_before_item_check() {
        let unavailable = Availability { item_id: 1, lendable: true, total_copies: 1, open_loans: 1 };
        let eligible = MemberStanding { member_id: 1, open_loans: 0, overdue_loans: 0 };
        assert_eq!(check_eligibility(&eligible, &unavailable), Err(LendingError::ItemUnavailable));

        let capped = MemberStanding { member_id: 1, open_loans: 3, overdue_loans: 0 };
        assert_eq!(check_eligibility(&capped, &unavailable), Err(LendingError::CapExceeded));
    }

    #[test]
    fn test_board_game_is_rejected_by_the_gate() {
        let game = CatalogItem {
            id: 9,
            title: "Catan".to_string(),
            creator: String::new(),
            total_copies: 2,
            created_at: today(),
            details: ItemDetails::BoardGame { publisher: "Kosmos".to_string(), min_players: 3, max_players: 4 },
        };
        let standing = MemberStanding { member_id: 1, open_loans: 0, overdue_loans: 0 };
        assert_eq!(
            check_eligibility(&standing, &Availability::new(&game, 0)),
            Err(LendingError::ItemUnavailable)
        );
    }
}
