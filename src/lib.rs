//! Presentation and workflow layer of a catering storefront.
//!
//! Workflows ([`catalog::CatalogView`], [`cart::CartWorkflow`],
//! [`orders::OrderHistory`], [`orders::AdminOrders`], [`admin::ProductEditor`])
//! talk to an identity service, a document database and the storefront API
//! through the seams in [`identity`], [`store`] and [`api`], and report to
//! the UI through [`feedback::Feedback`]. [`app_system::Storefront`] wires
//! them together, either against the hosted services or against the
//! in-process [`app_system::MemoryBackend`].

pub mod actor_framework;
pub mod admin;
pub mod api;
pub mod app_system;
pub mod boundary;
pub mod cart;
pub mod cart_actor;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod feedback;
pub mod format;
pub mod identity;
pub mod maintenance;
pub mod order_actor;
pub mod orders;
pub mod product_actor;
pub mod routes;
pub mod session;
pub mod store;
pub mod user_actor;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod mock_framework;
