//! HTTP API for the fridge frontend.
//!
//! Routes are nested under `/api/`. Blocking work (inference, store I/O)
//! runs on the tokio blocking pool, never on the async workers.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::{ApiContext, HttpSettings};
