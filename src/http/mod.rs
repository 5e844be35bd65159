//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, span, JSON extraction)
//!     → routing (prefix → subsystem handler)
//!     → response.rs (errors → JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ApiJson, X_REQUEST_ID};
pub use response::{json_response, ApiError};
pub use server::{AppState, HttpServer};
