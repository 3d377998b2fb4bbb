//! # retrieval-server
//!
//! HTTP transport for `retrieval-core`: an axum router exposing search,
//! health and Prometheus metrics over one index built at startup.

/// REST API: routes, handlers, DTOs, error mapping and metrics.
pub mod api;
