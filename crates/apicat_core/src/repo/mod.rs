//! Repository layer over the metadata and blob stores.
//!
//! # Responsibility
//! - Define the service and version repository contracts.
//! - Map store-level precondition failures onto domain errors.
//!
//! # Invariants
//! - Repositories hold no mutable state and never retry.
//! - Every failure is returned as a [`RepoError`].

pub mod error;
pub mod service_repo;
pub mod upload;
pub mod version_repo;

pub use error::{RepoError, RepoErrorKind, RepoResult};
