//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a parsed configuration.
///
/// Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = var("PORT") {
        let port: u16 = port.parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            message: format!("'{port}' is not a port number"),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }

    if let Some(v) = var("SUPABASE_URL_NIO_AFILIADOS") {
        config.stores.nio_afiliados.url = v;
    }
    if let Some(v) = var("SUPABASE_SERVICE_ROLE_KEY_NIO_AFILIADOS") {
        config.stores.nio_afiliados.service_role_key = v;
    }
    if let Some(v) = var("SUPABASE_URL_PAINEL_URA") {
        config.stores.painel_ura.url = v;
    }
    if let Some(v) = var("SUPABASE_SERVICE_ROLE_KEY_PAINEL_URA") {
        config.stores.painel_ura.service_role_key = v;
    }

    if let Some(v) = var("RECAPTCHA_SECRET_KEY") {
        config.captcha.secret_key = Some(v);
    }
    if let Some(v) = var("CHECK_CEP_API_URL") {
        config.viability.base_url = v;
    }
    if let Some(v) = var("N8N_WEBHOOK_URL") {
        config.webhook.url = Some(v);
    }
    if let Some(v) = var("ADMIN_API_KEY") {
        config.admin.api_key = v;
    }

    if let Some(v) = var("VAPID_SUBJECT") {
        config.push.vapid_subject = Some(v);
    }
    if let Some(v) = var("VAPID_PUBLIC_KEY") {
        config.push.vapid_public_key = Some(v);
    }
    if let Some(v) = var("VAPID_PRIVATE_KEY") {
        config.push.vapid_private_key = Some(v);
    }

    if let Some(v) = var("LOG_FORMAT") {
        config.observability.log_format = match v.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Env {
                    var: "LOG_FORMAT",
                    message: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_fill_credentials() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "8088"),
                ("SUPABASE_URL_NIO_AFILIADOS", "https://nio.example.co"),
                ("SUPABASE_SERVICE_ROLE_KEY_NIO_AFILIADOS", "nio"),
                ("SUPABASE_URL_PAINEL_URA", "https://ura.example.co"),
                ("SUPABASE_SERVICE_ROLE_KEY_PAINEL_URA", "ura"),
                ("CHECK_CEP_API_URL", "http://cep.example.com/check"),
                ("LOG_FORMAT", "JSON"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8088");
        assert_eq!(config.stores.painel_ura.service_role_key, "ura");
        assert_eq!(config.viability.base_url, "http://cep.example.com/check");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, env(&[("RECAPTCHA_SECRET_KEY", "  ")])).unwrap();
        assert!(config.captcha.secret_key.is_none());
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_toml_sections_parse() {
        let config: AppConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:4000"

            [abuse]
            reset_after_window = false

            [abuse.limits.login]
            max_attempts = 3
            window_minutes = 5
            block_minutes = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert!(!config.abuse.reset_after_window);
        assert_eq!(config.abuse.limits.login.max_attempts, 3);
        assert_eq!(config.abuse.limits.signup.max_attempts, 5);
    }
}
