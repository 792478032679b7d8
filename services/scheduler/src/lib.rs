//! Scheduling API service
//!
//! Exposes the availability store, conflict resolver, and meeting
//! lifecycle manager over HTTP. Identity arrives as a signed token from
//! the platform's auth service; lifecycle events go out to the
//! notification service as webhooks.

pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod repositories;
pub mod resolver;
pub mod routes;
pub mod state;
