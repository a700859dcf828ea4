//! # Middleware
//!
//! Request-counting metrics and per-client rate limiting. Both read their
//! shared state from request extensions installed by [`crate::app`].

pub mod metrics;
pub mod rate_limit;
