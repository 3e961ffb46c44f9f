//! switchboard HTTP server.
//!
//! Exposes each assistant behind a JSON (or SSE, or multipart) endpoint.
//! [`build_router`] is public so tests can drive the full stack with
//! scripted backends.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, StartupError};
pub use routes::build_router;
pub use state::{AppState, Resources};
