use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::domain::image::{PRODUCT_PLACEHOLDER, THUMBNAIL_PLACEHOLDER};
use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://us-central1-catering-app-ls.cloudfunctions.net/api";

/// Runtime settings for the remote stack.
#[derive(Debug, Clone, PartialEq)]
pub struct StorefrontConfig {
    pub api_base_url: String,
    pub firebase_api_key: Option<String>,
    pub firebase_project_id: String,
    pub storage_bucket: String,
    pub product_placeholder: String,
    pub thumbnail_placeholder: String,
    pub http_timeout: Duration,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            firebase_api_key: None,
            firebase_project_id: "catering-app-ls".to_string(),
            storage_bucket: "catering-app-ls.appspot.com".to_string(),
            product_placeholder: PRODUCT_PLACEHOLDER.to_string(),
            thumbnail_placeholder: THUMBNAIL_PLACEHOLDER.to_string(),
            http_timeout: Duration::from_secs(15),
        }
    }
}

impl StorefrontConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs: u64 = try_load(&lookup, "CATERING_HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs())?;
        Ok(Self {
            api_base_url: try_load(&lookup, "CATERING_API_URL", defaults.api_base_url)?
                .trim_end_matches('/')
                .to_string(),
            firebase_api_key: lookup("FIREBASE_API_KEY").filter(|k| !k.trim().is_empty()),
            firebase_project_id: try_load(&lookup, "FIREBASE_PROJECT_ID", defaults.firebase_project_id)?,
            storage_bucket: try_load(&lookup, "FIREBASE_STORAGE_BUCKET", defaults.storage_bucket)?,
            product_placeholder: try_load(&lookup, "CATERING_PRODUCT_PLACEHOLDER", defaults.product_placeholder)?,
            thumbnail_placeholder: try_load(&lookup, "CATERING_THUMBNAIL_PLACEHOLDER", defaults.thumbnail_placeholder)?,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// The identity key is only needed when talking to the real services.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.firebase_api_key.as_deref().ok_or(ConfigError::Missing("FIREBASE_API_KEY"))
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid { key, reason: e.to_string() }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
