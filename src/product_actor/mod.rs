//! Catalog products in the in-memory backend, including stock actions.

mod actions;
pub mod entity;

pub use actions::*;
