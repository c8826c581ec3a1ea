//! Data models for the mediatheque

pub mod account;
pub mod catalog;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use account::{Account, AccountClaims, Role};
pub use catalog::{CatalogItem, CatalogItemSummary, ItemDetails, MediaType};
pub use loan::{CreateLoan, EligibilityReport, Loan, LoanDetails};
pub use member::{Member, MemberSummary};
