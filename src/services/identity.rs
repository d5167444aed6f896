use std::sync::Arc;

use thiserror::Error;

use crate::auth::{self, PasswordError};
use crate::database::manager::DatabaseError;
use crate::database::models::{NewUser, User};
use crate::database::repository::UserRepository;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no user for {0}")]
    NotFound(String),

    #[error("email or password is wrong")]
    InvalidCredentials,

    #[error("email {0} is already registered")]
    EmailTaken(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Registration request as it arrives from the client, password in clear
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub imei: String,
    pub password: String,
}

/// Turns token claims and credentials into full user records
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserRepository>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn resolve_by_email(&self, email: &str) -> Result<User, IdentityError> {
        self.users
            .get_by_email(email)
            .await?
            .ok_or_else(|| IdentityError::NotFound(email.to_string()))
    }

    pub async fn resolve_by_name(&self, name: &str) -> Result<User, IdentityError> {
        self.users
            .get_by_name(name)
            .await?
            .ok_or_else(|| IdentityError::NotFound(name.to_string()))
    }

    /// Hash the password and store the user; a taken email is `EmailTaken`
    pub async fn register(&self, registration: Registration) -> Result<User, IdentityError> {
        let Registration {
            name,
            email,
            imei,
            password,
        } = registration;

        let hash = tokio::task::spawn_blocking(move || auth::hash_password(&password))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))??;

        let new_user = NewUser {
            name,
            email: email.clone(),
            imei,
            password: hash,
        };

        match self.users.persist(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, email = %user.email, "registered user");
                Ok(user)
            }
            Err(DatabaseError::UniqueViolation(_)) => Err(IdentityError::EmailTaken(email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Unknown email and wrong password are indistinguishable to the caller
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, IdentityError> {
        let user = match self.resolve_by_email(email).await {
            Ok(user) => user,
            Err(IdentityError::NotFound(_)) => return Err(IdentityError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        let password = password.to_string();
        let hash = user.password.clone();
        let verified = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))?;

        if verified {
            Ok(user)
        } else {
            tracing::debug!(email = %email, "password mismatch");
            Err(IdentityError::InvalidCredentials)
        }
    }
}
