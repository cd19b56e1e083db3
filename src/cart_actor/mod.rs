//! Per-user cart lines in the in-memory backend.

mod actions;
pub mod entity;

pub use actions::*;
pub use entity::{CartItem, CartItemCreate};
