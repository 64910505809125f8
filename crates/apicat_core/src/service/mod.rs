//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Validate caller input that repositories accept as-is.

pub mod catalog_service;
