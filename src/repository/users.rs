//! User directory queries on PgStore

use super::postgres::PgStore;
use crate::{
    error::{AppError, AppResult},
    models::{CreateUser, User, UserRole},
};

const USER_COLUMNS: &str =
    "id, role, user_name, phone_number, email, password, created_at, updated_at, deleted_at";

impl PgStore {
    /// Create a user account
    pub async fn users_insert(&self, user: &CreateUser) -> AppResult<User> {
        let query = format!(
            r#"
            INSERT INTO users (role, user_name, phone_number, email, password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, User>(&query)
            .bind(user.role.unwrap_or(UserRole::Regular))
            .bind(&user.user_name)
            .bind(&user.phone_number)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Email {} already registered", user.email))
                } else {
                    AppError::from(e)
                }
            })?;
        Ok(row)
    }

    /// Get a non-deleted user by ID
    pub async fn users_get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
