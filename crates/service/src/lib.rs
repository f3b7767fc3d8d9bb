//! Service layer providing business-oriented operations on top of models.
//! - Separates business logic from data access through repository traits.
//! - Reuses entity definitions and query predicates from the `models` crate.
//! - Provides clear error types that the HTTP layer maps to responses.

pub mod errors;
pub mod account;
pub mod permission;
pub mod auth;
