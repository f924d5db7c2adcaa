//! Inventory queries on PgStore

use sqlx::PgConnection;

use super::postgres::PgStore;
use crate::{
    error::AppResult,
    models::{CreateInventoryItem, InventoryItem, UpdateInventoryItem},
};

const ITEM_COLUMNS: &str = "id, item_name, quantity, category, location, is_available, \
     description, picture_url, created_at, updated_at, deleted_at";

impl PgStore {
    /// Create an inventory item
    pub async fn items_insert(&self, item: &CreateInventoryItem) -> AppResult<InventoryItem> {
        let query = format!(
            r#"
            INSERT INTO inventory (item_name, quantity, category, location, is_available, description, picture_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );

        let row = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(&item.category)
            .bind(&item.location)
            .bind(item.is_available.unwrap_or(true))
            .bind(&item.description)
            .bind(item.picture_url.clone().unwrap_or_default())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// Get a non-deleted item by ID
    pub async fn items_get_by_id(&self, id: i32) -> AppResult<Option<InventoryItem>> {
        let query = format!(
            "SELECT {} FROM inventory WHERE id = $1 AND deleted_at IS NULL",
            ITEM_COLUMNS
        );

        let item = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// List non-deleted items
    pub async fn items_list(&self) -> AppResult<Vec<InventoryItem>> {
        let query = format!(
            "SELECT {} FROM inventory WHERE deleted_at IS NULL ORDER BY id",
            ITEM_COLUMNS
        );

        let rows = sqlx::query_as::<_, InventoryItem>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Partial update; absent fields keep their value
    pub async fn items_update(&self, id: i32, item: &UpdateInventoryItem) -> AppResult<Option<InventoryItem>> {
        let query = format!(
            r#"
            UPDATE inventory SET
                item_name = COALESCE($2, item_name),
                category = COALESCE($3, category),
                location = COALESCE($4, location),
                is_available = COALESCE($5, is_available),
                description = COALESCE($6, description),
                picture_url = COALESCE($7, picture_url),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );

        let row = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .bind(&item.item_name)
            .bind(&item.category)
            .bind(&item.location)
            .bind(item.is_available)
            .bind(&item.description)
            .bind(&item.picture_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Soft delete an item
    pub async fn items_soft_delete(&self, id: i32) -> AppResult<Option<InventoryItem>> {
        let query = format!(
            r#"
            UPDATE inventory SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );

        let row = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

/// Lock an item row for the rest of the transaction
pub(super) async fn lock_for_update(conn: &mut PgConnection, id: i32) -> AppResult<Option<InventoryItem>> {
    let query = format!("SELECT {} FROM inventory WHERE id = $1 FOR UPDATE", ITEM_COLUMNS);

    let item = sqlx::query_as::<_, InventoryItem>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

pub(super) async fn write_quantity(conn: &mut PgConnection, id: i32, quantity: i32) -> AppResult<()> {
    sqlx::query("UPDATE inventory SET quantity = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
