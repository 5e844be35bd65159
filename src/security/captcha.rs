//! CAPTCHA token verification against the provider's siteverify endpoint.

use serde::{Deserialize, Serialize};

use crate::config::schema::CaptchaConfig;
use crate::observability::metrics;

/// Provider answer for one token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptchaVerdict {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, rename = "error-codes", skip_serializing_if = "Vec::is_empty")]
    pub error_codes: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("captcha secret key is not configured")]
    NotConfigured,
    #[error("captcha provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("captcha provider returned status {0}")]
    Status(u16),
}

#[derive(Clone)]
pub struct CaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret_key: Option<String>,
}

impl CaptchaVerifier {
    pub fn new(config: &CaptchaConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            verify_url: config.verify_url.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// Ask the provider about `token`. A `success: false` verdict is not an error.
    pub async fn verify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError> {
        let secret = self.secret_key.as_deref().ok_or(CaptchaError::NotConfigured)?;

        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", secret), ("response", token)])
            .send()
            .await
            .inspect_err(|_| metrics::record_upstream_call("captcha", false))?;

        let status = response.status();
        metrics::record_upstream_call("captcha", status.is_success());
        if !status.is_success() {
            return Err(CaptchaError::Status(status.as_u16()));
        }

        let verdict: CaptchaVerdict = response.json().await?;
        tracing::debug!(
            success = verdict.success,
            score = ?verdict.score,
            action = ?verdict.action,
            "Captcha verdict received"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_parses_provider_payload() {
        let verdict: CaptchaVerdict = serde_json::from_str(
            r#"{"success": false, "error-codes": ["invalid-input-response"], "challenge_ts": "2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.error_codes, vec!["invalid-input-response"]);
        assert_eq!(verdict.score, None);
    }

    #[tokio::test]
    async fn test_missing_secret_fails_before_network() {
        let verifier = CaptchaVerifier::new(&CaptchaConfig::default(), reqwest::Client::new());
        let err = verifier.verify("token").await.unwrap_err();
        assert!(matches!(err, CaptchaError::NotConfigured));
    }
}
