//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, inventory, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Medinventory API",
        version = "1.0.0",
        description = "Medical inventory lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Loans
        loans::create_loan,
        loans::list_loans,
        loans::get_loan,
        loans::update_loan_status,
        loans::delete_loan,
        // Inventory
        inventory::list_items,
        inventory::get_item,
        inventory::create_item,
        inventory::update_item,
        inventory::delete_item,
        inventory::adjust_quantity,
        // Users
        users::create_user,
        users::get_user,
    ),
    components(
        schemas(
            // Loans
            loans::UpdateLoanStatusRequest,
            loans::LoanResponse,
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanDetails,
            crate::models::loan::CreateLoan,
            crate::models::loan::LoanQuery,
            // Inventory
            inventory::AdjustQuantityRequest,
            inventory::AdjustQuantityResponse,
            crate::models::item::InventoryItem,
            crate::models::item::ItemShort,
            crate::models::item::CreateInventoryItem,
            crate::models::item::UpdateInventoryItem,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::UserRole,
            crate::models::user::CreateUser,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "inventory", description = "Inventory management"),
        (name = "users", description = "User directory")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
