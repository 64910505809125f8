//! Catalog metadata records.
//!
//! # Responsibility
//! - Define the typed records persisted by the metadata repositories.
//! - Map Rust field names onto the persisted attribute names.
//!
//! # Invariants
//! - A service is identified by `ServiceRecord::id`.
//! - A version is identified by `(service_id, version)`.

pub mod service;
pub mod version;
