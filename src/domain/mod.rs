//! Storefront records and the normalisation applied when they are decoded.

pub mod cart;
pub mod dates;
pub mod image;
pub mod order;
pub mod product;
pub mod user;

pub use cart::*;
pub use order::*;
pub use product::*;
pub use user::*;
