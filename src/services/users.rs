//! User directory service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{CreateUser, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register an account. The credential arrives already hashed.
    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        data.validate()?;
        let user = self.repository.insert_user(data).await?;
        tracing::info!(user_id = user.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository
            .user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }
}
