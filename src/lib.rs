//! timelab is a teaching-lab HTTP server with a single `GET /time`
//! endpoint, wrapped in a request instrumentation pipeline.
//!
//! Every request passes, outermost first, through an origin policy
//! (CORS, profile-scoped, may reject with `403`), correlation id
//! propagation (`X-Request-Id`), error page rendering with a panic
//! boundary, and exchange logging that writes one masked JSON record per
//! request to either the `internal` or the `outbound` log channel.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate).
//! - [`config`] -- Profile loading and validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`error_page`] -- HTML / JSON error page for unmapped paths and panics.
//! - [`logging`] -- Tracing setup, log channels and the exchange logger seam.
//! - [`middleware`] -- Origin policy, correlation id and exchange logging stages.
//! - [`server`] -- Application state, router assembly and graceful shutdown.
//! - [`time`] -- `GET /time` endpoint handler.

// Public functions are only consumed by the binary and tests.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod error_page;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod time;
