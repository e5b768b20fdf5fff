//! # mnemo-core
//!
//! Core types and error handling for the mnemo memory store.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod error;
pub mod types;

pub use error::{MnemoError, Result};
pub use types::*;
