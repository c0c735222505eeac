//! Optional persistence hooks for confirmed identities.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use super::claims::User;

/// Stores a user once its address has been confirmed.
#[async_trait]
pub trait UserSaver: Send + Sync {
    async fn save(&self, user: &User) -> Result<()>;
}

/// Moves a user's picture somewhere durable and returns the updated user.
#[async_trait]
pub trait AvatarSaver: Send + Sync {
    async fn save(&self, user: User, client: &Client) -> Result<User>;
}

/// Verifies the secret submitted in the password step.
#[async_trait]
pub trait PasswordChecker: Send + Sync {
    /// `Ok(false)` means the password was checked and rejected.
    async fn check(&self, user: &User, password: &SecretString) -> Result<bool>;
}
