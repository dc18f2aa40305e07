//! Gateway Relay HTTP server.
//!
//! Exposes the sync engine behind a small axum app: `POST
//! /api/gateway-manager` triggers a run and `GET /health` reports liveness.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::AppError;
pub use handlers::health::HealthResponse;
pub use server::{create_router, create_router_with_state, run_server_with_state};
pub use state::AppState;
