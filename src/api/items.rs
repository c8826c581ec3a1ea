//! Catalog item endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::catalog::{
        AvailabilityResponse, CatalogItem, CatalogItemSummary, CatalogQuery, CreateCatalogItem,
        UpdateCatalogItem,
    },
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List catalog items with live availability
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(CatalogQuery),
    responses(
        (status = 200, description = "List of items", body = PaginatedResponse<CatalogItemSummary>)
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<PaginatedResponse<CatalogItemSummary>>> {
    let (items, total) = state.services.catalog.search_items(&query).await?;
    Ok(Json(PaginatedResponse::new(items, total, query.page, query.per_page)))
}

/// Get item details by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = CatalogItemSummary),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<CatalogItemSummary>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}

/// Availability of an item
#[utoipa::path(
    get,
    path = "/items/{id}/availability",
    tag = "items",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Copies available for loan", body = AvailabilityResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AvailabilityResponse>> {
    let availability = state.services.loans.availability(id).await?;
    Ok(Json(availability.into()))
}

/// Create a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateCatalogItem,
    responses(
        (status = 201, description = "Item created", body = CatalogItem),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(item): Json<CreateCatalogItem>,
) -> AppResult<(StatusCode, Json<CatalogItem>)> {
    claims.require_librarian()?;

    let created = state.services.catalog.create_item(item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an item
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateCatalogItem,
    responses(
        (status = 200, description = "Item updated", body = CatalogItem),
        (status = 400, description = "Invalid input or kind change"),
        (status = 404, description = "Item not found"),
        (status = 422, description = "Fewer copies than open loans")
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(item): Json<UpdateCatalogItem>,
) -> AppResult<Json<CatalogItem>> {
    claims.require_librarian()?;

    let updated = state.services.catalog.update_item(id, item).await?;
    Ok(Json(updated))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found"),
        (status = 422, description = "Item has copies on loan")
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.catalog.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
