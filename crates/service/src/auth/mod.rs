//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Identifies the requesting user from a password login or a bearer token.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod repo;
pub mod service;

pub use domain::AuthUser;
pub use errors::AuthError;
pub use service::{AuthService, AuthSettings};
