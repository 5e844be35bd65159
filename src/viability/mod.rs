//! CEP viability lookup.
//!
//! # Data Flow
//! ```text
//! {estado, cep}
//!     → validate (presence → text → 8 digits → known UF → numeric)
//!     → GET {base_url}?uf=SP&cep=01310100
//!     → rename results[].operator → operadora
//! ```
//!
//! # Design Decisions
//! - Input problems are 400s, each with its own message
//! - Provider failures (status, transport, body) degrade to
//!   `{found_any: false, error}` with 200

pub mod handlers;

use axum::{routing::post, Router};
use serde_json::{json, Map, Value};

use crate::config::schema::ViabilityConfig;
use crate::http::AppState;
use crate::observability::metrics;

/// The 27 federative unit codes.
pub const STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

pub fn router() -> Router<AppState> {
    Router::new().route("/check-cep-viability", post(handlers::check_cep_viability))
}

/// A validated lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViabilityQuery {
    /// Upper-case state code.
    pub uf: String,
    /// Eight digits, no separators.
    pub cep: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViabilityError {
    #[error("estado and cep are required")]
    Missing,
    #[error("estado and cep must be strings")]
    NotText,
    #[error("cep must have 8 digits")]
    WrongLength,
    #[error("estado is not a valid state")]
    UnknownState,
    #[error("cep must contain only digits")]
    NotNumeric,
}

/// Values a JavaScript client would consider empty.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Strip every non-digit character.
pub fn normalize_cep(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Trim and upper-case a state code, returning it only when recognized.
pub fn normalize_state(raw: &str) -> Option<String> {
    let uf = raw.trim().to_uppercase();
    STATES.contains(&uf.as_str()).then_some(uf)
}

/// Validate raw body fields in the documented order.
pub fn validate(estado: Option<&Value>, cep: Option<&Value>) -> Result<ViabilityQuery, ViabilityError> {
    if is_absent(estado) || is_absent(cep) {
        return Err(ViabilityError::Missing);
    }
    let (Some(Value::String(estado)), Some(Value::String(cep))) = (estado, cep) else {
        return Err(ViabilityError::NotText);
    };

    let clean_cep = normalize_cep(cep);
    if clean_cep.len() != 8 {
        return Err(ViabilityError::WrongLength);
    }

    let uf = normalize_state(estado).ok_or(ViabilityError::UnknownState)?;

    if !clean_cep.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ViabilityError::NotNumeric);
    }

    Ok(ViabilityQuery { uf, cep: clean_cep })
}

/// Rename `operator` to `operadora` on every entry of `results`.
pub fn normalize_results(mut body: Value) -> Value {
    if let Some(Value::Array(results)) = body.get_mut("results") {
        for result in results.iter_mut() {
            if let Value::Object(fields) = result {
                rename_operator(fields);
            }
        }
    }
    body
}

fn rename_operator(fields: &mut Map<String, Value>) {
    let operator = fields.remove("operator").filter(|v| !is_absent(Some(v)));
    match operator {
        Some(value) => {
            fields.insert("operadora".to_string(), value);
        }
        None => {
            if is_absent(fields.get("operadora")) {
                fields.remove("operadora");
            }
        }
    }
}

fn degraded(error: String) -> Value {
    json!({ "found_any": false, "error": error })
}

/// Client for the external viability service.
#[derive(Clone)]
pub struct ViabilityClient {
    client: reqwest::Client,
    base_url: String,
}

impl ViabilityClient {
    pub fn new(config: &ViabilityConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    /// Look up a validated query. Never fails; provider problems degrade.
    pub async fn lookup(&self, query: &ViabilityQuery) -> Value {
        tracing::info!(uf = %query.uf, cep = %query.cep, "Checking CEP viability");

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("uf", query.uf.as_str()), ("cep", query.cep.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream_call("viability", false);
                tracing::error!(error = %e, "Viability provider unreachable");
                return degraded(format!("Failed to reach viability service: {e}"));
            }
        };

        let status = response.status();
        metrics::record_upstream_call("viability", status.is_success());
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Viability provider returned an error status");
            return degraded(format!("Viability service returned status {}", status.as_u16()));
        }

        match response.json::<Value>().await {
            Ok(body) => {
                tracing::debug!(body = %body, "Viability provider response");
                normalize_results(body)
            }
            Err(e) => {
                tracing::error!(error = %e, "Viability provider sent an unreadable body");
                degraded("Viability service returned an unreadable response".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn test_cep_strips_non_digits() {
        assert_eq!(normalize_cep("01310-100"), "01310100");
        assert_eq!(normalize_cep(" 01.310 100 "), "01310100");
    }

    #[test]
    fn test_cep_length_enforced_after_stripping() {
        assert_eq!(validate(Some(&s("SP")), Some(&s("0131-010"))), Err(ViabilityError::WrongLength));
        assert_eq!(validate(Some(&s("SP")), Some(&s("01310-1000"))), Err(ViabilityError::WrongLength));
        assert!(validate(Some(&s("SP")), Some(&s("a0b1c3d1e0f1g0h0"))).is_ok());
    }

    #[test]
    fn test_state_is_case_insensitive_and_trimmed() {
        for raw in ["sp", " SP ", "Sp"] {
            let query = validate(Some(&s(raw)), Some(&s("01310100"))).unwrap();
            assert_eq!(query.uf, "SP");
        }
        assert_eq!(validate(Some(&s("XX")), Some(&s("01310100"))), Err(ViabilityError::UnknownState));
    }

    #[test]
    fn test_validation_order() {
        assert_eq!(validate(None, Some(&s("01310100"))), Err(ViabilityError::Missing));
        assert_eq!(validate(Some(&s("")), Some(&s("01310100"))), Err(ViabilityError::Missing));
        assert_eq!(validate(Some(&s("SP")), Some(&json!(1310100))), Err(ViabilityError::NotText));
        // Length is checked before the state.
        assert_eq!(validate(Some(&s("XX")), Some(&s("123"))), Err(ViabilityError::WrongLength));
    }

    #[test]
    fn test_scenario_normalization() {
        let query = validate(Some(&s("sp")), Some(&s("01310-100"))).unwrap();
        assert_eq!(query, ViabilityQuery { uf: "SP".into(), cep: "01310100".into() });
    }

    #[test]
    fn test_operator_renamed() {
        let body = json!({
            "found_any": true,
            "results": [
                {"operator": "NIO", "tech": "FTTH"},
                {"operadora": "Outra"},
                {"operator": "", "operadora": "Mantida"},
                {"tech": "HFC"}
            ]
        });
        let out = normalize_results(body);
        assert_eq!(
            out["results"],
            json!([
                {"operadora": "NIO", "tech": "FTTH"},
                {"operadora": "Outra"},
                {"operadora": "Mantida"},
                {"tech": "HFC"}
            ])
        );
        assert_eq!(out["found_any"], true);
    }

    #[test]
    fn test_body_without_results_passes_through() {
        let body = json!({"found_any": false});
        assert_eq!(normalize_results(body.clone()), body);
    }
}
