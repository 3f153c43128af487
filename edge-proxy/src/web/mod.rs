//! Web layer for the edge proxy.
//!
//! One axum router serves every path; see [`create_router`].

mod dto;
mod normalize;
mod routes;
mod state;


pub use dto::*;
pub use normalize::{JSON_CONTENT_TYPE, apply_cors, json_response, passthrough, preflight};
pub use routes::create_router;
pub use state::AppState;
