//! Member endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        loan::{EligibilityReport, LoanDetails, LoanQuery},
        member::{CreateMember, Member, MemberQuery, MemberSummary, UpdateMember},
    },
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Query parameters for the loans of one member
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MemberLoansQuery {
    pub open_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Query parameters for an eligibility check
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EligibilityQuery {
    /// Item the member wants to borrow
    pub item_id: Option<i32>,
}

/// List members with their borrowing standing
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(MemberQuery),
    responses(
        (status = 200, description = "List of members", body = PaginatedResponse<MemberSummary>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<PaginatedResponse<MemberSummary>>> {
    claims.require_librarian()?;

    let (members, total) = state.services.members.search_members(&query).await?;
    Ok(Json(PaginatedResponse::new(members, total, query.page, query.per_page)))
}

/// Get member details by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member details", body = MemberSummary),
        (status = 403, description = "Not allowed to view this member"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MemberSummary>> {
    claims.require_member_access(id)?;

    let member = state.services.members.get_member(id).await?;
    Ok(Json(member))
}

/// Register a new member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(member): Json<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    claims.require_librarian()?;

    let created = state.services.members.create_member(member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(member): Json<UpdateMember>,
) -> AppResult<Json<Member>> {
    claims.require_librarian()?;

    let updated = state.services.members.update_member(id, member).await?;
    Ok(Json(updated))
}

/// Delete a member
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 422, description = "Member has open loans")
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.members.delete_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Loans of a member, most recent first
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID"),
        MemberLoansQuery
    ),
    responses(
        (status = 200, description = "Member's loans", body = PaginatedResponse<LoanDetails>),
        (status = 403, description = "Not allowed to view this member"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<MemberLoansQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_member_access(id)?;

    // Unknown member is a 404, not an empty page
    state.services.members.get_member(id).await?;

    let loan_query = LoanQuery {
        member_id: Some(id),
        open_only: query.open_only,
        page: query.page,
        per_page: query.per_page,
        ..Default::default()
    };
    let (loans, total) = state.services.loans.search_loans(&loan_query).await?;
    Ok(Json(PaginatedResponse::new(loans, total, query.page, query.per_page)))
}

/// Whether a member may borrow, optionally a given item
#[utoipa::path(
    get,
    path = "/members/{id}/eligibility",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID"),
        EligibilityQuery
    ),
    responses(
        (status = 200, description = "Eligibility decision", body = EligibilityReport),
        (status = 403, description = "Not allowed to view this member"),
        (status = 404, description = "Member or item not found")
    )
)]
pub async fn get_eligibility(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<EligibilityQuery>,
) -> AppResult<Json<EligibilityReport>> {
    claims.require_member_access(id)?;

    let report = state.services.loans.check_eligibility(id, query.item_id).await?;
    Ok(Json(report))
}
