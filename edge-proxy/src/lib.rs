//! Edge reverse proxy for UK transport, geospatial and vehicle APIs.
//!
//! One origin fronts a dozen third-party providers: requests are matched
//! against a route table, credentials are attached server-side, and every
//! response leaves with the same CORS headers.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod providers;
pub mod stations;
pub mod upstream;
pub mod web;
