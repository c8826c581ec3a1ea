//! Authentication endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::account::{Account, LoginRequest, LoginResponse},
    AppState,
};

use super::AuthenticatedUser;

/// Log in with login and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or wrong role", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.services.auth.login(&request).await?;
    Ok(Json(response))
}

/// Current account
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated account", body = Account),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Account>> {
    let account = state.services.auth.get_account(claims.account_id).await?;
    Ok(Json(account))
}
