//! Account module: domain types, persistence seam, boundary validation and
//! the business service.

pub mod domain;
pub mod repository;
pub mod repo;
pub mod service;
pub mod validation;

pub use domain::{Account, AccountChanges, AccountFields, AddressFields, NewAccount};
pub use repository::AccountRepository;
pub use service::AccountService;
