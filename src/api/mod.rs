//! API handlers for Medinventory REST endpoints

pub mod health;
pub mod inventory;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{CallerIdentity, UserRole},
    AppState,
};

/// Header carrying the authenticated user's id, set by the gateway
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role, set by the gateway
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing caller identity".to_string()))?
            .parse::<i32>()
            .map_err(|_| AppError::Authentication("Invalid caller identity".to_string()))?;

        let role = header(USER_ROLE_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing caller role".to_string()))?
            .parse::<UserRole>()
            .map_err(AppError::Authentication)?;

        Ok(CallerIdentity::new(user_id, role))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/:id", get(loans::get_loan).delete(loans::delete_loan))
        .route("/loans/:id/status", put(loans::update_loan_status))
        // Inventory
        .route(
            "/inventory",
            get(inventory::list_items).post(inventory::create_item),
        )
        .route(
            "/inventory/:id",
            get(inventory::get_item)
                .put(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route("/inventory/:id/adjust", post(inventory::adjust_quantity))
        // Users
        .route("/users", post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
