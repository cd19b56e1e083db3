use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{AuthAccount, IdentityProvider};
use crate::error::AuthError;

const IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_BASE: &str = "https://securetoken.googleapis.com/v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

struct Credentials {
    account: AuthAccount,
    refresh_token: String,
}

/// Email/password accounts on the Firebase Identity Toolkit REST API.
pub struct FirebaseIdentity {
    client: reqwest::Client,
    api_key: String,
    identity_base: String,
    token_base: String,
    credentials: Mutex<Option<Credentials>>,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        Self::with_endpoints(api_key, timeout, IDENTITY_BASE, TOKEN_BASE)
    }

    pub fn with_endpoints(
        api_key: impl Into<String>,
        timeout: Duration,
        identity_base: impl Into<String>,
        token_base: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            identity_base: identity_base.into(),
            token_base: token_base.into(),
            credentials: Mutex::new(None),
        })
    }

    async fn password_call(&self, operation: &str, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let url = format!("{}/accounts:{operation}", self.identity_base);
        let body = PasswordRequest { email, password, return_secure_token: true };
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let code = response
                .json::<ErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_default();
            warn!(operation, code = %code, "Identity provider rejected request");
            return Err(map_error_code(&code));
        }

        let payload: PasswordResponse = response.json().await.map_err(|e| AuthError::Provider(e.to_string()))?;
        let account = AuthAccount {
            uid: payload.local_id,
            email: payload.email,
            display_name: payload.display_name.filter(|n| !n.is_empty()),
        };
        *self.credentials.lock().await = Some(Credentials {
            account: account.clone(),
            refresh_token: payload.refresh_token,
        });
        Ok(account)
    }
}

/// Maps provider error codes (e.g. `WEAK_PASSWORD : Password should be...`).
pub fn map_error_code(code: &str) -> AuthError {
    let head = code.split([' ', ':']).next().unwrap_or_default();
    match head {
        "INVALID_EMAIL" => AuthError::InvalidEmail,
        "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
        "INVALID_PASSWORD" => AuthError::WrongPassword,
        "INVALID_LOGIN_CREDENTIALS" => AuthError::InvalidCredentials,
        "EMAIL_EXISTS" => AuthError::EmailInUse,
        "WEAK_PASSWORD" => AuthError::WeakPassword,
        "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN" => AuthError::NotSignedIn,
        "" => AuthError::Provider("unknown error".to_string()),
        other => AuthError::Provider(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn current_account(&self) -> Option<AuthAccount> {
        self.credentials.lock().await.as_ref().map(|c| c.account.clone())
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        debug!("Sending request");
        let account = self.password_call("signInWithPassword", email, password).await?;
        info!(uid = %account.uid, "Signed in");
        Ok(account)
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        debug!("Sending request");
        let account = self.password_call("signUp", email, password).await?;
        info!(uid = %account.uid, "Account created");
        Ok(account)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.credentials.lock().await.take();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fresh_token(&self) -> Result<String, AuthError> {
        let mut guard = self.credentials.lock().await;
        let credentials = guard.as_mut().ok_or(AuthError::NotSignedIn)?;
        debug!("Sending request");

        let url = format!("{}/token", self.token_base);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", credentials.refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let code = response
                .json::<ErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_default();
            warn!(code = %code, "Token refresh rejected");
            return Err(map_error_code(&code));
        }

        let refreshed: RefreshResponse = response.json().await.map_err(|e| AuthError::Provider(e.to_string()))?;
        credentials.refresh_token = refreshed.refresh_token;
        Ok(refreshed.id_token)
    }
}
