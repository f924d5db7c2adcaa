//! User directory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{CallerIdentity, CreateUser, User},
};

/// Create a user account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid user"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    caller.require_admin()?;

    let created = state.services.users.create(&user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Regular users can only read their own account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    caller.require_self_or_admin(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}
