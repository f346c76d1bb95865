//! # api-adapters
//!
//! The HTTP surface of the blog. Handlers turn requests into validated forms,
//! call the services, and render `Outcome`s and `DomainError`s as JSON.

#[cfg(feature = "web-axum")]
pub mod web;

#[cfg(feature = "web-axum")]
pub use web::{router, AppState, MediaMount, RateLimiter};
