//! Loan management service.
//!
//! Entry points of the lending rules: `check_eligibility`, `create_loan`,
//! `mark_returned` and `is_available`. Every answer is recomputed from the
//! ledger on each call.

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    lending::{self, Availability, Clock},
    models::loan::{CreateLoan, EligibilityReport, Loan, LoanDetails, LoanQuery},
    repository::{LoanLedger, NewLoan, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    ledger: Arc<dyn LoanLedger>,
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl LoansService {
    pub fn new(ledger: Arc<dyn LoanLedger>, repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            repository,
            clock,
        }
    }

    /// Decide whether a member may borrow, without writing anything.
    ///
    /// Without an item only the member-side checks run.
    pub async fn check_eligibility(&self, member_id: i32, item_id: Option<i32>) -> AppResult<EligibilityReport> {
        let standing = self.ledger.member_standing(member_id, self.clock.today()).await?;

        let decision = match item_id {
            Some(item_id) => {
                let availability = self.ledger.item_availability(item_id).await?;
                lending::check_eligibility(&standing, &availability)
            }
            None => standing.check(),
        };

        Ok(EligibilityReport::new(&standing, item_id, decision))
    }

    /// Create a loan through the eligibility gate.
    ///
    /// An explicit due date is taken as given, even one already past.
    pub async fn create_loan(&self, request: CreateLoan) -> AppResult<Loan> {
        let today = self.clock.today();
        let due_date = request.due_date.unwrap_or_else(|| lending::default_due_date(today));

        let new_loan = NewLoan {
            member_id: request.member_id,
            item_id: request.item_id,
            checkout_date: today,
            due_date,
        };

        match self.ledger.checkout(new_loan).await {
            Ok(loan) => {
                tracing::info!(
                    "Loan {} created: member {} item {} due {}",
                    loan.id,
                    loan.member_id,
                    loan.item_id,
                    loan.due_date
                );
                Ok(loan)
            }
            Err(AppError::Lending(reason)) => {
                tracing::warn!(
                    "Loan refused for member {} item {}: {}",
                    request.member_id,
                    request.item_id,
                    reason.reason()
                );
                Err(AppError::Lending(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Mark a loan returned today
    pub async fn mark_returned(&self, loan_id: i32) -> AppResult<Loan> {
        match self.ledger.mark_returned(loan_id, self.clock.today()).await {
            Ok(loan) => {
                tracing::info!("Loan {} returned on {:?}", loan.id, loan.return_date);
                Ok(loan)
            }
            Err(AppError::Lending(reason)) => {
                tracing::warn!("Return of loan {} refused: {}", loan_id, reason.reason());
                Err(AppError::Lending(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Live availability of an item
    pub async fn availability(&self, item_id: i32) -> AppResult<Availability> {
        self.ledger.item_availability(item_id).await
    }

    pub async fn is_available(&self, item_id: i32) -> AppResult<bool> {
        Ok(self.availability(item_id).await?.is_available())
    }

    /// Search loans with filters
    pub async fn search_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.loans.search(query, self.clock.today()).await
    }

    /// Get loan details, overdue flag as of today
    pub async fn get_loan(&self, id: i32) -> AppResult<LoanDetails> {
        self.repository.loans.get_details(id, self.clock.today()).await
    }
}
