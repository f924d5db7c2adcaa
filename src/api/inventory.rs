//! Inventory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{CallerIdentity, CreateInventoryItem, InventoryItem, UpdateInventoryItem},
};

/// Signed quantity change
#[derive(Deserialize, ToSchema)]
pub struct AdjustQuantityRequest {
    pub delta: i32,
}

#[derive(Serialize, ToSchema)]
pub struct AdjustQuantityResponse {
    pub id: i32,
    pub quantity: i32,
}

/// List inventory items
#[utoipa::path(
    get,
    path = "/inventory",
    tag = "inventory",
    responses(
        (status = 200, description = "Non-deleted items", body = Vec<InventoryItem>)
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    _caller: CallerIdentity,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let items = state.services.inventory.list().await?;
    Ok(Json(items))
}

/// Get inventory item details
#[utoipa::path(
    get,
    path = "/inventory/{id}",
    tag = "inventory",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = InventoryItem),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    _caller: CallerIdentity,
    Path(id): Path<i32>,
) -> AppResult<Json<InventoryItem>> {
    let item = state.services.inventory.get_by_id(id).await?;
    Ok(Json(item))
}

/// Create an inventory item
#[utoipa::path(
    post,
    path = "/inventory",
    tag = "inventory",
    request_body = CreateInventoryItem,
    responses(
        (status = 201, description = "Item created", body = InventoryItem),
        (status = 400, description = "Invalid item"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Json(item): Json<CreateInventoryItem>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    caller.require_admin()?;

    let created = state.services.inventory.create(&item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an inventory item
#[utoipa::path(
    put,
    path = "/inventory/{id}",
    tag = "inventory",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateInventoryItem,
    responses(
        (status = 200, description = "Item updated", body = InventoryItem),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Path(id): Path<i32>,
    Json(item): Json<UpdateInventoryItem>,
) -> AppResult<Json<InventoryItem>> {
    caller.require_admin()?;

    let updated = state.services.inventory.update(id, &item).await?;
    Ok(Json(updated))
}

/// Soft delete an inventory item
#[utoipa::path(
    delete,
    path = "/inventory/{id}",
    tag = "inventory",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    caller.require_admin()?;

    state.services.inventory.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a signed change to an item's quantity
#[utoipa::path(
    post,
    path = "/inventory/{id}/adjust",
    tag = "inventory",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = AdjustQuantityRequest,
    responses(
        (status = 200, description = "Quantity adjusted", body = AdjustQuantityResponse),
        (status = 400, description = "Quantity would become negative"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn adjust_quantity(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Path(id): Path<i32>,
    Json(request): Json<AdjustQuantityRequest>,
) -> AppResult<Json<AdjustQuantityResponse>> {
    caller.require_admin()?;

    let quantity = state.services.inventory.adjust_quantity(id, request.delta).await?;
    Ok(Json(AdjustQuantityResponse { id, quantity }))
}
