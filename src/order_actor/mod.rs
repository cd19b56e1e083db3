//! Orders in the in-memory backend.

mod actions;
pub mod entity;

pub use actions::*;
pub use entity::{OrderPatch, TOTAL_TOLERANCE};
