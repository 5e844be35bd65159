//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require credentials for both backend projects
//! - Validate value ranges (timeouts > 0, limits > 0) and URL shapes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use url::Url;

use crate::config::schema::{ActionLimits, AppConfig, StoreConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully assembled configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    validate_store("stores.nio_afiliados", &config.stores.nio_afiliados, &mut errors);
    validate_store("stores.painel_ura", &config.stores.painel_ura, &mut errors);

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.upstream_secs", timeouts.upstream_secs),
        ("timeouts.request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    validate_url("captcha.verify_url", &config.captcha.verify_url, &mut errors);
    validate_url("viability.base_url", &config.viability.base_url, &mut errors);
    if let Some(url) = &config.webhook.url {
        validate_url("webhook.url", url, &mut errors);
    }

    let limits = &config.abuse.limits;
    validate_limits("abuse.limits.signup", &limits.signup, &mut errors);
    validate_limits("abuse.limits.login", &limits.login, &mut errors);
    validate_limits("abuse.limits.default", &limits.default, &mut errors);
    if config.abuse.max_write_attempts == 0 {
        errors.push(ValidationError::new("abuse.max_write_attempts", "must be greater than zero"));
    }

    let push = &config.push;
    let vapid_fields = [
        push.vapid_subject.is_some(),
        push.vapid_public_key.is_some(),
        push.vapid_private_key.is_some(),
    ];
    if vapid_fields.iter().any(|set| *set) && !push.is_configured() {
        errors.push(ValidationError::new(
            "push",
            "vapid_subject, vapid_public_key and vapid_private_key must be set together",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_store(prefix: &str, store: &StoreConfig, errors: &mut Vec<ValidationError>) {
    if store.url.trim().is_empty() {
        errors.push(ValidationError::new(format!("{prefix}.url"), "is required"));
    } else {
        validate_url(&format!("{prefix}.url"), &store.url, errors);
    }
    if store.service_role_key.trim().is_empty() {
        errors.push(ValidationError::new(format!("{prefix}.service_role_key"), "is required"));
    }
}

fn validate_url(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {e}"))),
    }
}

fn validate_limits(field: &str, limits: &ActionLimits, errors: &mut Vec<ValidationError>) {
    if limits.max_attempts == 0 {
        errors.push(ValidationError::new(format!("{field}.max_attempts"), "must be greater than zero"));
    }
    if limits.window_minutes <= 0 || limits.block_minutes <= 0 {
        errors.push(ValidationError::new(field, "window and block must be positive"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.stores.nio_afiliados = StoreConfig {
            url: "https://nio.example.co".into(),
            service_role_key: "nio-key".into(),
        };
        config.stores.painel_ura = StoreConfig {
            url: "https://ura.example.co".into(),
            service_role_key: "ura-key".into(),
        };
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_store_credentials_are_all_reported() {
        let errors = validate_config(&AppConfig::default()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"stores.nio_afiliados.url"));
        assert!(fields.contains(&"stores.nio_afiliados.service_role_key"));
        assert!(fields.contains(&"stores.painel_ura.url"));
        assert!(fields.contains(&"stores.painel_ura.service_role_key"));
    }

    #[test]
    fn test_partial_vapid_rejected() {
        let mut config = valid_config();
        config.push.vapid_subject = Some("mailto:ops@example.com".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "push");
    }

    #[test]
    fn test_bad_webhook_url() {
        let mut config = valid_config();
        config.webhook.url = Some("ftp://hooks.example.com".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "webhook.url");
    }
}
