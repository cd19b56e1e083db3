//! System wiring, startup and shutdown.

pub mod memory_backend;
pub mod storefront;
pub mod tracing;

pub use self::memory_backend::*;
pub use self::storefront::*;
pub use self::tracing::setup_tracing;
