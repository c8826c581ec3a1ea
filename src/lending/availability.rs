use crate::models::{catalog::CatalogItem, loan::Loan};

use super::LendingError;

/// Live availability of one catalog item.
///
/// Built from the ledger at read time; `open_loans` is the number of loans
/// on the item with no return date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub item_id: i32,
    pub lendable: bool,
    pub total_copies: i32,
    pub open_loans: i64,
}

impl Availability {
    pub fn new(item: &CatalogItem, open_loans: i64) -> Self {
        Self {
            item_id: item.id,
            lendable: item.is_lendable(),
            total_copies: item.total_copies,
            open_loans,
        }
    }

    /// Count the open loans on `item` among `loans`
    pub fn from_loans<'a, I>(item: &CatalogItem, loans: I) -> Self
    where
        I: IntoIterator<Item = &'a Loan>,
    {
        let open_loans = loans
            .into_iter()
            .filter(|loan| loan.item_id == item.id && loan.is_open())
            .count() as i64;
        Self::new(item, open_loans)
    }

    /// Copies that can still be lent. Always zero for consult-only kinds.
    pub fn available_copies(&self) -> i64 {
        if !self.lendable {
            return 0;
        }
        i64::from(self.total_copies) - self.open_loans
    }

    pub fn is_available(&self) -> bool {
        self.available_copies() > 0
    }

    pub fn check(&self) -> Result<(), LendingError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(LendingError::ItemUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::catalog::ItemDetails;

    fn item(id: i32, copies: i32, details: ItemDetails) -> CatalogItem {
        CatalogItem {
            id,
            title: format!("Item {}", id),
            creator: String::new(),
            total_copies: copies,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            details,
        }
    }

    fn loan(id: i32, item_id: i32, returned: bool) -> Loan {
        let checkout = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        Loan {
            id,
            member_id: id,
            item_id,
            checkout_date: checkout,
            due_date: checkout + chrono::Duration::days(7),
            return_date: returned.then_some(checkout),
        }
    }

    #[test]
    fn test_counts_only_open_loans_on_the_item() {
        let book = item(1, 2, ItemDetails::Book);
        let loans = vec![loan(1, 1, false), loan(2, 1, true), loan(3, 2, false)];

        let availability = Availability::from_loans(&book, &loans);
        assert_eq!(availability.open_loans, 1);
        assert_eq!(availability.available_copies(), 1);
        assert!(availability.is_available());
    }

    #[test]
    fn test_all_copies_out() {
        let dvd = item(1, 1, ItemDetails::Video { runtime_minutes: 148 });
        let availability = Availability::from_loans(&dvd, &[loan(1, 1, false)]);
        assert_eq!(availability.available_copies(), 0);
        assert_eq!(availability.check(), Err(LendingError::ItemUnavailable));
    }

    #[test]
    fn test_board_game_is_never_available_for_loan() {
        let game = item(
            1,
            3,
            ItemDetails::BoardGame { publisher: "Kosmos".to_string(), min_players: 3, max_players: 4 },
        );
        let availability = Availability::new(&game, 0);
        assert_eq!(availability.available_copies(), 0);
        assert!(!availability.is_available());
        assert_eq!(availability.check(), Err(LendingError::ItemUnavailable));
    }
}
