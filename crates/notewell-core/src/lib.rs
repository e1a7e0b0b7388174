//! # notewell-core
//!
//! Core types, traits, and abstractions for the notewell workspace.
//!
//! This crate provides the domain models, error types, and trait
//! definitions that the database and API crates depend on.

pub mod error;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
