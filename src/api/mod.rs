//! HTTP API.
//!
//! axum router over the tracking and referral services. Every route except
//! `/api/health` requires a bearer token (see [`auth`]).

pub mod auth;
mod server;

pub use auth::Caller;
pub use server::{AppState, ApiJson, build_router, start_server};
