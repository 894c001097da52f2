//! OpalDB common types, errors, and utilities.
//!
//! This crate provides shared definitions used across all OpalDB components.

pub mod error;
pub mod types;

pub use error::{OpalError, Result};
pub use types::TypeId;
