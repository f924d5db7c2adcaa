//! Loan ledger queries on PgStore

use sqlx::PgConnection;

use super::{like_pattern, postgres::PgStore, LoanFilter};
use crate::{
    error::{AppError, AppResult},
    models::{loan::LoanDetailsRow, CreateLoan, Loan, LoanDetails, LoanStatus},
};

const LOAN_COLUMNS: &str = "id, id_item, id_user, date_loan, date_return, quantity, status, \
     created_at, updated_at, deleted_at";

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.id_item, l.id_user, l.date_loan, l.date_return, l.quantity, l.status,
           l.created_at, l.updated_at, l.deleted_at,
           i.item_name, i.category, i.location,
           u.user_name, u.role
    FROM loans l
    JOIN inventory i ON i.id = l.id_item
    JOIN users u ON u.id = l.id_user
"#;

impl PgStore {
    /// Get a non-deleted loan with its item and borrower
    pub async fn loans_get_details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let query = format!("{} WHERE l.id = $1 AND l.deleted_at IS NULL", DETAILS_SELECT);

        let row = sqlx::query_as::<_, LoanDetailsRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(LoanDetails::from))
    }

    /// List loans, optionally scoped to a borrower and filtered by item name
    pub async fn loans_list(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        // LIMIT NULL means no limit in PostgreSQL
        let query = format!(
            r#"
            {}
            WHERE l.deleted_at IS NULL
              AND ($1::INTEGER IS NULL OR l.id_user = $1)
              AND ($2::TEXT IS NULL OR i.item_name ILIKE $2)
            ORDER BY l.id
            LIMIT $3 OFFSET $4
            "#,
            DETAILS_SELECT
        );

        let rows = sqlx::query_as::<_, LoanDetailsRow>(&query)
            .bind(filter.user_id)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LoanDetails::from).collect())
    }

    /// All loans without a deletion timestamp
    pub async fn loans_undeleted(&self) -> AppResult<Vec<Loan>> {
        let query = format!(
            "SELECT {} FROM loans WHERE deleted_at IS NULL ORDER BY id",
            LOAN_COLUMNS
        );

        let loans = sqlx::query_as::<_, Loan>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    /// Conditional Borrowed -> Overdue flip; a concurrent return wins
    pub async fn loans_mark_overdue(&self, loan_id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(loan_id)
        .bind(LoanStatus::Overdue)
        .bind(LoanStatus::Borrowed)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft delete a loan
    pub async fn loans_soft_delete(&self, id: i32) -> AppResult<Option<Loan>> {
        let query = format!(
            r#"
            UPDATE loans SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            LOAN_COLUMNS
        );

        let loan = sqlx::query_as::<_, Loan>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }
}

pub(super) async fn insert(conn: &mut PgConnection, loan: &CreateLoan) -> AppResult<Loan> {
    let query = format!(
        r#"
        INSERT INTO loans (id_item, id_user, date_loan, date_return, quantity, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        LOAN_COLUMNS
    );

    let row = sqlx::query_as::<_, Loan>(&query)
        .bind(loan.id_item)
        .bind(loan.id_user)
        .bind(loan.date_loan)
        .bind(loan.date_return)
        .bind(loan.quantity)
        .bind(LoanStatus::Borrowed)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

/// Lock a non-deleted loan row for the rest of the transaction
pub(super) async fn lock_for_update(conn: &mut PgConnection, id: i32) -> AppResult<Option<Loan>> {
    let query = format!(
        "SELECT {} FROM loans WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        LOAN_COLUMNS
    );

    let loan = sqlx::query_as::<_, Loan>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(loan)
}

pub(super) async fn write_status(conn: &mut PgConnection, id: i32, status: LoanStatus) -> AppResult<Loan> {
    let query = format!(
        r#"
        UPDATE loans SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        LOAN_COLUMNS
    );

    sqlx::query_as::<_, Loan>(&query)
        .bind(id)
        .bind(status)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
}
