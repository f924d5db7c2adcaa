//! Inventory service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{CreateInventoryItem, InventoryItem, UpdateInventoryItem},
    repository::Repository,
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
}

impl InventoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, data: &CreateInventoryItem) -> AppResult<InventoryItem> {
        data.validate()?;
        let item = self.repository.insert_item(data).await?;
        tracing::info!(item_id = item.id, quantity = item.quantity, "Inventory item created");
        Ok(item)
    }

    pub async fn list(&self) -> AppResult<Vec<InventoryItem>> {
        self.repository.list_items().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<InventoryItem> {
        self.repository
            .item_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    pub async fn update(&self, id: i32, data: &UpdateInventoryItem) -> AppResult<InventoryItem> {
        if data.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }
        data.validate()?;
        self.repository
            .update_item(id, data)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Soft delete; loans that reference the item are kept as they are
    pub async fn delete(&self, id: i32) -> AppResult<InventoryItem> {
        let item = self
            .repository
            .soft_delete_item(id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Item with id {} doesn't exist or has already been deleted",
                    id
                ))
            })?;
        tracing::info!(item_id = id, "Inventory item deleted");
        Ok(item)
    }

    /// Apply a signed quantity change atomically and return the new quantity
    pub async fn adjust_quantity(&self, id: i32, delta: i32) -> AppResult<i32> {
        let mut tx = self.repository.begin().await?;

        tx.lock_item(id)
            .await?
            .filter(|i| !i.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        let quantity = tx.adjust_quantity(id, delta).await?;
        tx.commit().await?;

        tracing::info!(item_id = id, delta, quantity, "Inventory quantity adjusted");
        Ok(quantity)
    }
}
