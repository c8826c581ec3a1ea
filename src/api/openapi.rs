//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{accounts, auth, health, items, loans, members};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mediatheque API",
        version = "1.0.0",
        description = "Media lending REST API: catalog, members and loans",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        accounts::create_account,
        // Items
        items::list_items,
        items::get_item,
        items::get_availability,
        items::create_item,
        items::update_item,
        items::delete_item,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        members::get_member_loans,
        members::get_eligibility,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::create_loan,
        loans::return_loan,
    ),
    components(
        schemas(
            // Auth
            crate::models::account::Role,
            crate::models::account::Account,
            crate::models::account::CreateAccount,
            crate::models::account::LoginRequest,
            crate::models::account::LoginResponse,
            // Items
            crate::models::catalog::MediaType,
            crate::models::catalog::CatalogItem,
            crate::models::catalog::CatalogItemSummary,
            crate::models::catalog::AvailabilityResponse,
            crate::models::catalog::CreateCatalogItem,
            crate::models::catalog::UpdateCatalogItem,
            // Members
            crate::models::member::Member,
            crate::models::member::MemberSummary,
            crate::models::member::CreateMember,
            crate::models::member::UpdateMember,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::CreateLoan,
            crate::models::loan::EligibilityReport,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication and accounts"),
        (name = "items", description = "Catalog and availability"),
        (name = "members", description = "Member registry and eligibility"),
        (name = "loans", description = "Loan ledger")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
