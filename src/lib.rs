//! Platform backend library.
//!
//! Thin HTTP layer in front of two backend-as-a-service projects
//! (`nio_afiliados`, `painel_ura`) plus CAPTCHA, CEP viability, Web Push and
//! an automation webhook.

// Core subsystems
pub mod config;
pub mod context;
pub mod http;
pub mod routing;
pub mod store;

// Features
pub mod admin;
pub mod diagnostics;
pub mod push;
pub mod security;
pub mod viability;
pub mod webhook;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use context::AppContext;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
