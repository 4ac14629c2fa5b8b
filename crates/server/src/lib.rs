//! prodsearch Server - HTTP REST API for hybrid product search
//!
//! Exposes [`prodsearch::SearchOrchestrator`] over HTTP: request validation,
//! transport DTOs, health probes, and Prometheus metrics.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /api/search/semantic` - `{ query, limit?, offset?, filters? }`
//! - `GET /api/search/semantic?query=..` - same, filters as query parameters
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe (pings the search backend)
//! - `GET /metrics` - Prometheus metrics
//!
//! Errors are JSON: `{"error": {"code": "BAD_REQUEST", "message": ".."}}`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
