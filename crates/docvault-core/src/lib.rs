//! # docvault core
//!
//! Storage-agnostic pieces of docvault: the `User` and `Document` records,
//! the error taxonomy shared by every service call, the repository traits
//! the HTTP layer is written against, and an in-memory store.
//!
//! This crate has no tokio, sqlx, or HTTP dependencies.

pub mod error;
pub mod models;
pub mod store;

pub use error::{VaultError, VaultResult};
