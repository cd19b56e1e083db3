use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::{AuthAccount, IdentityProvider};
use crate::error::AuthError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct StoredAccount {
    account: AuthAccount,
    password: String,
}

#[derive(Default)]
struct Registry {
    by_email: HashMap<String, StoredAccount>,
    tokens: HashMap<String, String>,
}

/// In-process identity service: accounts plus the bearer tokens it minted.
///
/// The memory backend verifies bearer credentials against the same
/// authority, so tokens issued here are accepted there.
#[derive(Clone, Default)]
pub struct MemoryAuthority {
    registry: Arc<Mutex<Registry>>,
    next_uid: Arc<AtomicU64>,
    next_token: Arc<AtomicU64>,
}

impl MemoryAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthAccount, AuthError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let mut registry = self.registry.lock().await;
        if registry.by_email.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }
        let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::Relaxed) + 1);
        let account = AuthAccount {
            uid,
            email: email.clone(),
            display_name: display_name.map(str::to_string),
        };
        registry.by_email.insert(
            email,
            StoredAccount { account: account.clone(), password: password.to_string() },
        );
        info!(uid = %account.uid, "Account registered");
        Ok(account)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        let registry = self.registry.lock().await;
        let stored = registry.by_email.get(&email).ok_or(AuthError::UserNotFound)?;
        if stored.password != password {
            return Err(AuthError::WrongPassword);
        }
        Ok(stored.account.clone())
    }

    pub async fn issue_token(&self, uid: &str) -> String {
        let token = format!("mem-{uid}-{}", self.next_token.fetch_add(1, Ordering::Relaxed) + 1);
        self.registry.lock().await.tokens.insert(token.clone(), uid.to_string());
        token
    }

    /// The uid a token was issued to, while it has not been revoked.
    pub async fn verify(&self, token: &str) -> Option<String> {
        self.registry.lock().await.tokens.get(token).cloned()
    }

    /// Invalidates every token issued to `uid`.
    pub async fn revoke(&self, uid: &str) {
        let mut registry = self.registry.lock().await;
        registry.tokens.retain(|_, owner| owner != uid);
        debug!(uid, "Tokens revoked");
    }

    /// A fresh signed-out session handle on this authority.
    pub fn identity(&self) -> MemoryIdentity {
        MemoryIdentity { authority: self.clone(), current: Mutex::new(None) }
    }
}

/// Per-session handle, the in-memory counterpart of [`super::FirebaseIdentity`].
pub struct MemoryIdentity {
    authority: MemoryAuthority,
    current: Mutex<Option<AuthAccount>>,
}

impl MemoryIdentity {
    /// A handle that starts with `account` already signed in, as if restored
    /// from persisted credentials.
    pub fn restored(authority: &MemoryAuthority, account: AuthAccount) -> Self {
        Self { authority: authority.clone(), current: Mutex::new(Some(account)) }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn current_account(&self) -> Option<AuthAccount> {
        self.current.lock().await.clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let account = self.authority.authenticate(email, password).await?;
        *self.current.lock().await = Some(account.clone());
        Ok(account)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let account = self.authority.register(email, password, None).await?;
        *self.current.lock().await = Some(account.clone());
        Ok(account)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(account) = self.current.lock().await.take() {
            self.authority.revoke(&account.uid).await;
        }
        Ok(())
    }

    async fn fresh_token(&self) -> Result<String, AuthError> {
        let uid = match self.current.lock().await.as_ref() {
            Some(account) => account.uid.clone(),
            None => return Err(AuthError::NotSignedIn),
        };
        Ok(self.authority.issue_token(&uid).await)
    }
}
