//! Panic boundary around a view.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

use crate::routes::Route;

/// Terminal state shown instead of a view that panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub message: String,
    pub recovery: Route,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs `view`; a panic becomes a [`Fallback`] pointing back to the
/// catalog. Never retries.
pub async fn guarded<F, T>(view: F) -> Result<T, Fallback>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(view).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(payload) => {
            let cause = panic_message(payload.as_ref());
            error!(%cause, "View panicked");
            Err(Fallback {
                message: "Something went wrong. Please go back to the products page.".to_string(),
                recovery: Route::Products,
            })
        }
    }
}
