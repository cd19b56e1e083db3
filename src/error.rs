use thiserror::Error;

use crate::actor_framework::FrameworkError;

/// Failures reported by the HTTP API (or the in-memory stand-in).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status { status, message: message.into() }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message used when the error body carries none.
    pub fn generic_message(status: u16) -> String {
        format!("Error {status}: request failed")
    }

    /// Expired, missing or insufficient credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

impl From<FrameworkError> for ApiError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => ApiError::status(404, format!("Not found: {id}")),
            FrameworkError::Rejected(reason) => ApiError::status(400, reason),
            other @ (FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                ApiError::status(503, other.to_string())
            }
        }
    }
}

/// Identity provider failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("User not found")]
    UserNotFound,
    #[error("Incorrect password")]
    WrongPassword,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("That email is already registered")]
    EmailInUse,
    #[error("The password must have at least 6 characters")]
    WeakPassword,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Identity provider error: {0}")]
    Provider(String),
    #[error("Network error: {0}")]
    Transport(String),
}

/// Document database failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Document store returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Malformed document: {0}")]
    Decode(String),
}

impl From<FrameworkError> for StoreError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => StoreError::Status { status: 404, message: id },
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// Form and workflow checks performed before any network call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Please sign in to continue.")]
    NotSignedIn,
    #[error("Administrators cannot use the cart.")]
    AdminCart,
    #[error("Please choose the event date.")]
    MissingEventDate,
    #[error("The event date is invalid: {0}")]
    InvalidEventDate(String),
    #[error("Please choose a delivery time.")]
    MissingDeliveryTime,
    #[error("The delivery time {0} is not available for that date.")]
    UnavailableDeliveryTime(String),
    #[error("Please enter the delivery address.")]
    MissingAddress,
    #[error("Please enter the number of people.")]
    MissingPeopleCount,
    #[error("The number of people must be greater than 0.")]
    InvalidPeopleCount,
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Product {0} is out of stock.")]
    OutOfStock(String),
    #[error("The product name is required.")]
    MissingProductName,
    #[error("No product is waiting for delete confirmation.")]
    NothingToDelete,
    #[error("Administrator access required.")]
    AdminOnly,
}

/// Configuration loading failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Umbrella error for the workflows.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorefrontError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StorefrontError {
    /// True when the user has to sign in again before retrying.
    pub fn requires_login(&self) -> bool {
        match self {
            StorefrontError::Api(e) => e.is_auth_failure(),
            StorefrontError::Auth(AuthError::NotSignedIn) => true,
            StorefrontError::Validation(ValidationError::NotSignedIn) => true,
            _ => false,
        }
    }
}
