//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! POST /security/verify-recaptcha
//!     → captcha.rs (token → provider verdict)
//!     → abuse.rs   (identifier + action → counted / blocked)
//!     → handlers.rs (verdict + check → 200 / 400 / 429 / 500)
//! ```
//!
//! # Design Decisions
//! - CAPTCHA first: an invalid token never touches the attempt counters
//! - Rate limiting applies only when the client names an identifier

pub mod abuse;
pub mod captcha;
pub mod handlers;

use axum::{routing::post, Router};

use crate::http::AppState;

pub use abuse::{AbuseCheck, AbuseError, AbuseTracker};
pub use captcha::{CaptchaError, CaptchaVerdict, CaptchaVerifier};

pub fn router() -> Router<AppState> {
    Router::new().route("/verify-recaptcha", post(handlers::verify_recaptcha))
}
