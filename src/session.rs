//! The single session object shared by every workflow.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::domain::{CurrentUser, Role, UserProfile};
use crate::error::{AuthError, StorefrontError};
use crate::identity::{AuthAccount, IdentityProvider};
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The identity provider has not reported yet.
    Loading,
    SignedOut,
    SignedIn(CurrentUser),
}

impl SessionState {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionState::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(CurrentUser::is_admin)
    }
}

/// Owns the identity handle and publishes session changes.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct SessionContext {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionContext {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { identity, store, state: Arc::new(state) }
    }

    /// Resolves a restored identity, if any, and leaves `Loading`.
    #[instrument(skip(self))]
    pub async fn init(&self) -> SessionState {
        let next = match self.identity.current_account().await {
            Some(account) => SessionState::SignedIn(self.resolve(account).await),
            None => SessionState::SignedOut,
        };
        self.publish(next.clone());
        next
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, StorefrontError> {
        let account = self.identity.sign_in(email, password).await?;
        let user = self.resolve(account).await;
        info!(uid = %user.uid, role = ?user.role, "Session started");
        self.publish(SessionState::SignedIn(user.clone()));
        Ok(user)
    }

    /// Registers the account and writes its `users/{uid}` profile.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<CurrentUser, StorefrontError> {
        let account = self.identity.sign_up(email, password).await?;
        let profile = UserProfile::new(account.uid.clone(), email.trim(), name.trim());
        self.store.put_user_profile(&profile).await?;

        let user = CurrentUser {
            uid: account.uid,
            email: account.email,
            display_name: account.display_name.or_else(|| Some(profile.name).filter(|n| !n.is_empty())),
            role: Role::User,
        };
        info!(uid = %user.uid, "Account registered");
        self.publish(SessionState::SignedIn(user.clone()));
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), StorefrontError> {
        self.identity.sign_out().await?;
        self.publish(SessionState::SignedOut);
        info!("Session closed");
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// A freshly minted bearer credential for the signed-in user.
    pub async fn bearer(&self) -> Result<String, AuthError> {
        if self.current().user().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        self.identity.fresh_token().await
    }

    /// Role is read once per sign-in; a missing or unreadable profile means `user`.
    async fn resolve(&self, account: AuthAccount) -> CurrentUser {
        let profile = match self.store.user_profile(&account.uid).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(uid = %account.uid, error = %e, "Could not read user profile");
                None
            }
        };
        let role = profile.as_ref().map(|p| p.role).unwrap_or_default();
        let display_name = account
            .display_name
            .or_else(|| profile.map(|p| p.name).filter(|n| !n.is_empty()));
        CurrentUser { uid: account.uid, email: account.email, display_name, role }
    }

    fn publish(&self, next: SessionState) {
        self.state.send_replace(next);
    }
}
