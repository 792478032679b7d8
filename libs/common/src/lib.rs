//! Common library for the scheduling backend
//!
//! This crate provides shared functionality used by the scheduler and
//! sweeper services: database connectivity, the scheduling error
//! taxonomy, and the canonical civil date/time arithmetic that every
//! other component must go through.

pub mod civil;
pub mod database;
pub mod error;
