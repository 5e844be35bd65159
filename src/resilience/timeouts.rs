//! Timeout enforcement for outbound calls.
//!
//! # Responsibilities
//! - Build the single `reqwest::Client` shared by every upstream integration
//! - Enforce connect and total timeouts on each call
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Timed-out calls surface as ordinary transport errors to the caller

use std::time::Duration;

use crate::config::TimeoutConfig;

/// Build the outbound HTTP client with the configured deadlines.
pub fn build_http_client(config: &TimeoutConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_secs))
        .timeout(Duration::from_secs(config.upstream_secs))
        .user_agent(concat!("plataforma-backend/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_defaults() {
        assert!(build_http_client(&TimeoutConfig::default()).is_ok());
    }
}
