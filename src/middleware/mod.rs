//! Request pipeline stages.
//!
//! Composed in [`server::instrument`](crate::server::instrument), outermost
//! first:
//!
//! 1. [`cors::enforce`]: origin policy, may answer or reject on its own;
//! 2. [`correlation::propagate`]: resolves the request's correlation id;
//! 3. error page rendering and the panic boundary;
//! 4. [`request_log::log_exchange`]: times the rest and emits the record.

pub mod correlation;
pub mod cors;
pub mod request_log;
