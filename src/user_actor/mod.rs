//! `users/{uid}` profiles in the in-memory backend.

pub mod entity;
