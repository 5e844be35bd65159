//! Outbound-call resilience.
//!
//! # Responsibilities
//! - One shared HTTP client with connect and total timeouts (timeouts.rs)
//! - Jittered backoff for store write retries (backoff.rs)
//!
//! # Design Decisions
//! - No automatic retries of upstream calls; only the abuse tracker's
//!   compare-and-swap loop retries, and only on a lost race

pub mod backoff;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use timeouts::build_http_client;
