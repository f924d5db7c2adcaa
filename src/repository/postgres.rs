//! PostgreSQL store
//!
//! Entity queries live in `users.rs`, `items.rs` and `loans.rs` as inherent
//! methods on [`PgStore`]; this module wires them into the [`Store`] and
//! [`StoreTx`] traits.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use super::{items, loans, LoanFilter, Store, StoreTx};
use crate::{
    error::{AppError, AppResult},
    models::{
        CreateInventoryItem, CreateLoan, CreateUser, InventoryItem, Loan, LoanDetails, LoanStatus,
        UpdateInventoryItem, User,
    },
};

#[derive(Clone)]
pub struct PgStore {
    pub(super) pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &CreateUser) -> AppResult<User> {
        self.users_insert(user).await
    }

    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>> {
        self.users_get_by_id(id).await
    }

    async fn insert_item(&self, item: &CreateInventoryItem) -> AppResult<InventoryItem> {
        self.items_insert(item).await
    }

    async fn item_by_id(&self, id: i32) -> AppResult<Option<InventoryItem>> {
        self.items_get_by_id(id).await
    }

    async fn list_items(&self) -> AppResult<Vec<InventoryItem>> {
        self.items_list().await
    }

    async fn update_item(&self, id: i32, item: &UpdateInventoryItem) -> AppResult<Option<InventoryItem>> {
        self.items_update(id, item).await
    }

    async fn soft_delete_item(&self, id: i32) -> AppResult<Option<InventoryItem>> {
        self.items_soft_delete(id).await
    }

    async fn loan_details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        self.loans_get_details(id).await
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        self.loans_list(filter).await
    }

    async fn undeleted_loans(&self) -> AppResult<Vec<Loan>> {
        self.loans_undeleted().await
    }

    async fn mark_overdue(&self, loan_id: i32) -> AppResult<bool> {
        self.loans_mark_overdue(loan_id).await
    }

    async fn soft_delete_loan(&self, id: i32) -> AppResult<Option<Loan>> {
        self.loans_soft_delete(id).await
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Database transaction; rolled back by sqlx when dropped uncommitted
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_item(&mut self, id: i32) -> AppResult<Option<InventoryItem>> {
        items::lock_for_update(&mut self.tx, id).await
    }

    async fn adjust_quantity(&mut self, item_id: i32, delta: i32) -> AppResult<i32> {
        let item = items::lock_for_update(&mut self.tx, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        let quantity = item.adjusted_quantity(delta)?;
        items::write_quantity(&mut self.tx, item_id, quantity).await?;
        Ok(quantity)
    }

    async fn insert_loan(&mut self, loan: &CreateLoan) -> AppResult<Loan> {
        loans::insert(&mut self.tx, loan).await
    }

    async fn lock_loan(&mut self, id: i32) -> AppResult<Option<Loan>> {
        loans::lock_for_update(&mut self.tx, id).await
    }

    async fn set_loan_status(&mut self, id: i32, status: LoanStatus) -> AppResult<Loan> {
        loans::write_status(&mut self.tx, id, status).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
