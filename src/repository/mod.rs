//! Repository layer for database operations
//!
//! Services talk to storage through [`Store`] and, for multi-write units,
//! through a [`StoreTx`] obtained from [`Store::begin`]. A transaction that is
//! dropped without [`StoreTx::commit`] rolls back, so a cancelled request can
//! never leave half of a unit applied.

pub mod items;
pub mod loans;
pub mod memory;
pub mod postgres;
pub mod users;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        CreateInventoryItem, CreateLoan, CreateUser, InventoryItem, Loan, LoanDetails, LoanStatus,
        UpdateInventoryItem, User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Loan listing filter, already resolved from the caller's role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    /// Restrict to one borrower (regular callers)
    pub user_id: Option<i32>,
    /// Case-insensitive substring of the item name
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: i64,
}

/// Storage operations used by the services.
///
/// Lookups exclude soft-deleted rows unless stated otherwise.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_user(&self, user: &CreateUser) -> AppResult<User>;
    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>>;

    async fn insert_item(&self, item: &CreateInventoryItem) -> AppResult<InventoryItem>;
    async fn item_by_id(&self, id: i32) -> AppResult<Option<InventoryItem>>;
    /// Non-deleted items by ascending id
    async fn list_items(&self) -> AppResult<Vec<InventoryItem>>;
    async fn update_item(&self, id: i32, item: &UpdateInventoryItem) -> AppResult<Option<InventoryItem>>;
    async fn soft_delete_item(&self, id: i32) -> AppResult<Option<InventoryItem>>;

    async fn loan_details(&self, id: i32) -> AppResult<Option<LoanDetails>>;
    /// Non-deleted loans matching `filter`, by ascending id
    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>>;
    /// Every loan without a deletion timestamp, whatever its status
    async fn undeleted_loans(&self) -> AppResult<Vec<Loan>>;
    /// Flip a loan to `Overdue` only if it is still `Borrowed` and not deleted.
    /// Returns whether a row changed.
    async fn mark_overdue(&self, loan_id: i32) -> AppResult<bool>;
    async fn soft_delete_loan(&self, id: i32) -> AppResult<Option<Loan>>;

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Check that the backend is reachable
    async fn ping(&self) -> AppResult<()>;
}

/// A unit of work. Rows read through `lock_*` stay locked until commit or drop.
#[async_trait]
pub trait StoreTx: Send {
    /// Lock an item row, soft-deleted or not
    async fn lock_item(&mut self, id: i32) -> AppResult<Option<InventoryItem>>;
    /// Apply `delta` to an item's quantity and return the new quantity.
    /// Fails with `InvalidValue` if the result would be negative.
    async fn adjust_quantity(&mut self, item_id: i32, delta: i32) -> AppResult<i32>;
    /// Insert a loan with status `Borrowed`
    async fn insert_loan(&mut self, loan: &CreateLoan) -> AppResult<Loan>;
    /// Lock a non-deleted loan row
    async fn lock_loan(&mut self, id: i32) -> AppResult<Option<Loan>>;
    async fn set_loan_status(&mut self, id: i32, status: LoanStatus) -> AppResult<Loan>;
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Shared handle over the configured store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    pub fn new(store: impl Store) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Repository backed by an in-process arena
    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl Deref for Repository {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

/// Escape LIKE wildcards so user input matches literally
pub(crate) fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
