pub mod errors;
pub mod auth;
pub mod rate_limit;
pub mod observability;
pub mod openapi;
pub mod routes;
pub mod startup;

pub use startup::{build_app, build_state, run, ServerState};
