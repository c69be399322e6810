//! Foundation types for Strata.
//!
//! Strata is the persistence core of a version-controlled tabular database.
//! This crate provides the types every other Strata crate builds on.
//!
//! # Key Types
//!
//! - [`Hash`] — Content-addressed identifier (BLAKE3 hash) with a zero
//!   sentinel meaning "no object / no root yet"
//! - [`TypeError`] — Parse and length errors for the above

pub mod error;
pub mod hash;

pub use error::TypeError;
pub use hash::Hash;
