//! HTTP server and operator CLI for the governance engine
//!
//! - [`handler`]: axum router over a shared [`governance_core::DecisionOrchestrator`]
//! - [`cli`]: `serve`, `issue-token` and `verify-audit` commands

pub mod cli;
pub mod handler;

pub use cli::{init_tracing, run, Commands, ExitCode, GovernanceCli};
pub use handler::{create_router, ApiError, ApiResponse, AppState, ErrorInfo};
