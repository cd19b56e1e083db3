//! External identity service seam.

pub mod firebase;
pub mod memory;

use async_trait::async_trait;

use crate::error::AuthError;

pub use firebase::FirebaseIdentity;
pub use memory::{MemoryAuthority, MemoryIdentity};

/// An authenticated account as reported by the identity service.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthAccount {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The account restored from a previous session, if any.
    async fn current_account(&self) -> Option<AuthAccount>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Mints a fresh bearer credential for the current account.
    async fn fresh_token(&self) -> Result<String, AuthError>;
}
