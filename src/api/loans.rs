//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, Loan, LoanDetails, LoanQuery},
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "List of loans", body = PaginatedResponse<LoanDetails>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_librarian()?;

    let (loans, total) = state.services.loans.search_loans(&query).await?;
    Ok(Json(PaginatedResponse::new(loans, total, query.page, query.per_page)))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found, or held by another member")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(id).await?;
    // Member accounts cannot tell another member's loan from a missing one
    if !claims.can_access_member(loan.member_id) {
        return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
    }
    Ok(Json(loan))
}

/// Lend an item to a member
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
                (status = 404, description = "Member or item not found"),
        (status = 409, description = "Cap reached, member overdue, or no copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    claims.require_librarian()?;

    let loan = state.services.loans.create_loan(request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Mark a loan returned today
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan returned", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    claims.require_librarian()?;

    let loan = state.services.loans.mark_returned(id).await?;
    Ok(Json(loan))
}
