//! Account management endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::account::{Account, CreateAccount},
    AppState,
};

use super::AuthenticatedUser;

/// Create a login account
#[utoipa::path(
    post,
    path = "/accounts",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = CreateAccount,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Librarian privileges required"),
        (status = 404, description = "Linked member not found"),
        (status = 409, description = "Login already taken")
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(account): Json<CreateAccount>,
) -> AppResult<(StatusCode, Json<Account>)> {
    claims.require_librarian()?;

    let created = state.services.auth.create_account(account).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
