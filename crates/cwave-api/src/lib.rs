//! Upload API server.
//!
//! This crate provides:
//! - The audio upload endpoint backing the ingestion pipeline
//! - Health probe
//! - CORS, body limit and trace layers

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
