//! In-process store
//!
//! All records live in one arena behind a `tokio::sync::Mutex`. A transaction
//! owns the lock for its whole lifetime and works on a staged copy of the
//! arena: commit swaps the copy in, drop discards it. Holding the lock
//! serializes transactions the way row locks do in PostgreSQL.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LoanFilter, Store, StoreTx};
use crate::{
    error::{AppError, AppResult},
    models::{
        CreateInventoryItem, CreateLoan, CreateUser, InventoryItem, ItemShort, Loan, LoanDetails,
        LoanStatus, UpdateInventoryItem, User, UserRole, UserShort,
    },
};

#[derive(Debug, Clone, Default)]
struct Arena {
    users: BTreeMap<i32, User>,
    items: BTreeMap<i32, InventoryItem>,
    loans: BTreeMap<i32, Loan>,
    next_user_id: i32,
    next_item_id: i32,
    next_loan_id: i32,
    /// Loans whose overdue update fails, for exercising partial failures
    failing_loans: HashSet<i32>,
}

impl Arena {
    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }

    fn details(&self, loan: &Loan) -> Option<LoanDetails> {
        let item = self.items.get(&loan.id_item)?;
        let user = self.users.get(&loan.id_user)?;
        Some(LoanDetails {
            loan: loan.clone(),
            item: ItemShort::from(item),
            user: UserShort::from(user),
        })
    }

    fn adjust_quantity(&mut self, item_id: i32, delta: i32) -> AppResult<i32> {
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        let quantity = item.adjusted_quantity(delta)?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(quantity)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    arena: Arc<Mutex<Arena>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every overdue update of `loan_id` fail with an internal error
    pub async fn fail_updates_for(&self, loan_id: i32) {
        self.arena.lock().await.failing_loans.insert(loan_id);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &CreateUser) -> AppResult<User> {
        let mut arena = self.arena.lock().await;

        let taken = arena
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(AppError::Conflict(format!("Email {} already registered", user.email)));
        }

        let now = Utc::now();
        let id = Arena::next_id(&mut arena.next_user_id);
        let row = User {
            id,
            role: user.role.unwrap_or(UserRole::Regular),
            user_name: user.user_name.clone(),
            phone_number: user.phone_number.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        arena.users.insert(id, row.clone());
        Ok(row)
    }

    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let arena = self.arena.lock().await;
        Ok(arena.users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn insert_item(&self, item: &CreateInventoryItem) -> AppResult<InventoryItem> {
        let mut arena = self.arena.lock().await;

        let now = Utc::now();
        let id = Arena::next_id(&mut arena.next_item_id);
        let row = InventoryItem {
            id,
            item_name: item.item_name.clone(),
            quantity: item.quantity,
            category: item.category.clone(),
            location: item.location.clone(),
            is_available: item.is_available.unwrap_or(true),
            description: item.description.clone(),
            picture_url: item.picture_url.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        arena.items.insert(id, row.clone());
        Ok(row)
    }

    async fn item_by_id(&self, id: i32) -> AppResult<Option<InventoryItem>> {
        let arena = self.arena.lock().await;
        Ok(arena.items.get(&id).filter(|i| !i.is_deleted()).cloned())
    }

    async fn list_items(&self) -> AppResult<Vec<InventoryItem>> {
        let arena = self.arena.lock().await;
        Ok(arena.items.values().filter(|i| !i.is_deleted()).cloned().collect())
    }

    async fn update_item(&self, id: i32, update: &UpdateInventoryItem) -> AppResult<Option<InventoryItem>> {
        let mut arena = self.arena.lock().await;

        let Some(item) = arena.items.get_mut(&id).filter(|i| !i.is_deleted()) else {
            return Ok(None);
        };

        if let Some(ref name) = update.item_name {
            item.item_name = name.clone();
        }
        if let Some(ref category) = update.category {
            item.category = category.clone();
        }
        if let Some(ref location) = update.location {
            item.location = location.clone();
        }
        if let Some(is_available) = update.is_available {
            item.is_available = is_available;
        }
        if update.description.is_some() {
            item.description = update.description.clone();
        }
        if let Some(ref picture_url) = update.picture_url {
            item.picture_url = picture_url.clone();
        }
        item.updated_at = Utc::now();

        Ok(Some(item.clone()))
    }

    async fn soft_delete_item(&self, id: i32) -> AppResult<Option<InventoryItem>> {
        let mut arena = self.arena.lock().await;

        let Some(item) = arena.items.get_mut(&id).filter(|i| !i.is_deleted()) else {
            return Ok(None);
        };
        let now = Utc::now();
        item.deleted_at = Some(now);
        item.updated_at = now;
        Ok(Some(item.clone()))
    }

    async fn loan_details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .loans
            .get(&id)
            .filter(|l| l.deleted_at.is_none())
            .and_then(|l| arena.details(l)))
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let arena = self.arena.lock().await;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());

        let matching = arena
            .loans
            .values()
            .filter(|l| l.deleted_at.is_none())
            .filter(|l| filter.user_id.map_or(true, |id| l.id_user == id))
            .filter_map(|l| arena.details(l))
            .filter(|d| {
                needle
                    .as_ref()
                    .map_or(true, |n| d.item.item_name.to_lowercase().contains(n))
            })
            .skip(filter.offset.max(0) as usize);

        Ok(match filter.limit {
            Some(limit) => matching.take(limit.max(0) as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn undeleted_loans(&self) -> AppResult<Vec<Loan>> {
        let arena = self.arena.lock().await;
        Ok(arena.loans.values().filter(|l| l.deleted_at.is_none()).cloned().collect())
    }

    async fn mark_overdue(&self, loan_id: i32) -> AppResult<bool> {
        let mut arena = self.arena.lock().await;

        if arena.failing_loans.contains(&loan_id) {
            return Err(AppError::Internal(format!("Injected failure for loan {}", loan_id)));
        }

        match arena.loans.get_mut(&loan_id) {
            Some(loan) if loan.deleted_at.is_none() && loan.status == LoanStatus::Borrowed => {
                loan.status = LoanStatus::Overdue;
                loan.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete_loan(&self, id: i32) -> AppResult<Option<Loan>> {
        let mut arena = self.arena.lock().await;

        let Some(loan) = arena.loans.get_mut(&id).filter(|l| l.deleted_at.is_none()) else {
            return Ok(None);
        };
        let now = Utc::now();
        loan.deleted_at = Some(now);
        loan.updated_at = now;
        Ok(Some(loan.clone()))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.arena.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }
}

/// Staged unit of work over the arena
pub struct MemoryTx {
    guard: OwnedMutexGuard<Arena>,
    staged: Arena,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_item(&mut self, id: i32) -> AppResult<Option<InventoryItem>> {
        Ok(self.staged.items.get(&id).cloned())
    }

    async fn adjust_quantity(&mut self, item_id: i32, delta: i32) -> AppResult<i32> {
        self.staged.adjust_quantity(item_id, delta)
    }

    async fn insert_loan(&mut self, loan: &CreateLoan) -> AppResult<Loan> {
        let now = Utc::now();
        let id = Arena::next_id(&mut self.staged.next_loan_id);
        let row = Loan {
            id,
            id_item: loan.id_item,
            id_user: loan.id_user,
            date_loan: loan.date_loan,
            date_return: loan.date_return,
            quantity: loan.quantity,
            status: LoanStatus::Borrowed,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.staged.loans.insert(id, row.clone());
        Ok(row)
    }

    async fn lock_loan(&mut self, id: i32) -> AppResult<Option<Loan>> {
        Ok(self.staged.loans.get(&id).filter(|l| l.deleted_at.is_none()).cloned())
    }

    async fn set_loan_status(&mut self, id: i32, status: LoanStatus) -> AppResult<Loan> {
        let loan = self
            .staged
            .loans
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        loan.status = status;
        loan.updated_at = Utc::now();
        Ok(loan.clone())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
