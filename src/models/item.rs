//! Inventory item model and quantity arithmetic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Inventory item from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventoryItem {
    pub id: i32,
    pub item_name: String,
    /// Units currently available for lending
    pub quantity: i32,
    pub category: String,
    pub location: String,
    pub is_available: bool,
    pub description: Option<String>,
    pub picture_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Quantity after applying `delta`.
    ///
    /// Every store implementation goes through this before writing a new
    /// quantity, so it is the one place the non-negative invariant lives.
    pub fn adjusted_quantity(&self, delta: i32) -> AppResult<i32> {
        let next = self.quantity.checked_add(delta).ok_or_else(|| {
            AppError::InvalidValue(format!(
                "Quantity adjustment {} overflows item {}",
                delta, self.id
            ))
        })?;

        if next < 0 {
            return Err(AppError::InvalidValue(format!(
                "Resulting quantity negative for item {} ({} {:+})",
                self.id, self.quantity, delta
            )));
        }

        Ok(next)
    }
}

/// Short item representation embedded in loan listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemShort {
    pub id: i32,
    pub item_name: String,
    pub category: String,
    pub location: String,
}

impl From<&InventoryItem> for ItemShort {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: item.id,
            item_name: item.item_name.clone(),
            category: item.category.clone(),
            location: item.location.clone(),
        }
    }
}

/// Create inventory item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItem {
    #[validate(length(min = 1, message = "name can't be empty"))]
    pub item_name: String,
    #[validate(range(min = 0, message = "quantity can't be negative value"))]
    pub quantity: i32,
    pub category: String,
    pub location: String,
    pub is_available: Option<bool>,
    pub description: Option<String>,
    pub picture_url: Option<String>,
}

/// Update inventory item request (partial).
///
/// Stock is not editable here; quantity only moves through adjustments,
/// loans and returns.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateInventoryItem {
    #[validate(length(min = 1, message = "name can't be empty"))]
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub is_available: Option<bool>,
    pub description: Option<String>,
    pub picture_url: Option<String>,
}

impl UpdateInventoryItem {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.is_available.is_none()
            && self.description.is_none()
            && self.picture_url.is_none()
    }
}
