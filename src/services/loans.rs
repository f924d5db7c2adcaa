//! Loan lifecycle service
//!
//! Creation and the `Returned` transition each touch two records (the loan and
//! the item's quantity). Both run inside one store transaction: the item or
//! loan row is locked first, the checks are repeated under the lock, and the
//! writes commit together or not at all.

use chrono::{FixedOffset, NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::calendar_date, CallerIdentity, CreateLoan, Loan, LoanDetails, LoanQuery, LoanStatus,
    },
    repository::{LoanFilter, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    timezone: FixedOffset,
}

impl LoansService {
    pub fn new(repository: Repository, timezone: FixedOffset) -> Self {
        Self {
            repository,
            timezone,
        }
    }

    fn today(&self) -> NaiveDate {
        calendar_date(Utc::now(), &self.timezone)
    }

    /// Create a new loan and take its quantity out of stock
    pub async fn create_loan(&self, request: CreateLoan) -> AppResult<Loan> {
        self.repository
            .user_by_id(request.id_user)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", request.id_user)))?;

        let item = self
            .repository
            .item_by_id(request.id_item)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", request.id_item)))?;

        let loan_day = calendar_date(request.date_loan, &self.timezone);
        if loan_day < self.today() {
            return Err(AppError::InvalidRange("Loan date can't be in the past".to_string()));
        }

        if calendar_date(request.date_return, &self.timezone) < loan_day {
            return Err(AppError::InvalidRange(
                "Return date can't be before the loan date".to_string(),
            ));
        }

        if request.quantity <= 0 {
            return Err(AppError::InvalidValue("Loan quantity must be positive".to_string()));
        }

        if request.quantity > item.quantity {
            return Err(AppError::InsufficientStock(format!(
                "Requested {} but only {} of item {} available",
                request.quantity, item.quantity, item.id
            )));
        }

        let mut tx = self.repository.begin().await?;

        let locked = tx
            .lock_item(request.id_item)
            .await?
            .filter(|i| !i.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", request.id_item)))?;

        if request.quantity > locked.quantity {
            tracing::warn!(
                item_id = locked.id,
                requested = request.quantity,
                available = locked.quantity,
                "Lost stock race while creating loan"
            );
            return Err(AppError::Conflict(format!(
                "Stock of item {} changed concurrently, only {} left",
                locked.id, locked.quantity
            )));
        }

        let remaining = tx.adjust_quantity(request.id_item, -request.quantity).await?;
        let loan = tx.insert_loan(&request).await?;
        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            user_id = loan.id_user,
            item_id = loan.id_item,
            quantity = loan.quantity,
            remaining,
            "Loan created"
        );

        Ok(loan)
    }

    /// Change a loan's status, restocking the item when it is returned.
    ///
    /// `item_override` picks the item that receives the restock instead of the
    /// loan's own item. A loan that is already returned is left untouched when
    /// asked to be returned again and refuses every other status.
    pub async fn update_loan_status(
        &self,
        loan_id: i32,
        status: &str,
        item_override: Option<i32>,
    ) -> AppResult<Loan> {
        let status: LoanStatus = status.parse()?;

        let mut tx = self.repository.begin().await?;

        let loan = tx
            .lock_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        let item_id = item_override.unwrap_or(loan.id_item);
        tx.lock_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        if loan.status.is_terminal() {
            if status == LoanStatus::Returned {
                tracing::debug!(loan_id, "Loan already returned, nothing to restock");
                return Ok(loan);
            }
            return Err(AppError::Conflict(format!(
                "Loan {} was already returned and can't become '{}'",
                loan_id, status
            )));
        }

        if status == LoanStatus::Returned {
            let restocked = tx.adjust_quantity(item_id, loan.quantity).await?;
            let updated = tx.set_loan_status(loan_id, status).await?;
            tx.commit().await?;

            tracing::info!(
                loan_id,
                item_id,
                quantity = loan.quantity,
                restocked,
                "Loan returned"
            );
            return Ok(updated);
        }

        let updated = tx.set_loan_status(loan_id, status).await?;
        tx.commit().await?;

        tracing::info!(loan_id, from = %loan.status, to = %status, "Loan status changed");
        Ok(updated)
    }

    /// Soft delete a loan. Stock is not touched: deleting removes the record
    /// from view, only a return puts items back.
    pub async fn delete_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let loan = self
            .repository
            .soft_delete_loan(loan_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Loan with id {} doesn't exist or has already been deleted",
                    loan_id
                ))
            })?;

        tracing::info!(loan_id, status = %loan.status, "Loan deleted");
        Ok(loan)
    }

    /// Get a loan with its item and borrower
    pub async fn get_loan_detail(&self, caller: &CallerIdentity, loan_id: i32) -> AppResult<LoanDetails> {
        self.repository
            .loan_details(loan_id)
            .await?
            .filter(|d| caller.is_admin() || d.loan.id_user == caller.user_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// List loans visible to the caller
    pub async fn list_loans(&self, caller: &CallerIdentity, query: &LoanQuery) -> AppResult<Vec<LoanDetails>> {
        let filter = loan_filter(caller, query)?;
        self.repository.list_loans(&filter).await
    }
}

/// Admins see every loan, regular users only their own
fn loan_filter(caller: &CallerIdentity, query: &LoanQuery) -> AppResult<LoanFilter> {
    if matches!(query.limit, Some(limit) if limit <= 0) {
        return Err(AppError::InvalidValue("limit must be positive".to_string()));
    }
    if matches!(query.page, Some(page) if page <= 0) {
        return Err(AppError::InvalidValue("page must be positive".to_string()));
    }

    let offset = match (query.limit, query.page) {
        (Some(limit), Some(page)) => (page - 1).saturating_mul(limit),
        _ => 0,
    };

    Ok(LoanFilter {
        user_id: (!caller.is_admin()).then_some(caller.user_id),
        search: query
            .search
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        limit: query.limit,
        offset,
    })
}
