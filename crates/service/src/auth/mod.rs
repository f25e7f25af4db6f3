//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, email confirmation, login with session rotation, refresh
//! and logout live here, independent of the HTTP layer.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::{AuthConfig, AuthService};
