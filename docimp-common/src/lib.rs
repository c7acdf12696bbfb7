//! # DocImport Common Library
//!
//! Shared code for the document import services including:
//! - Error types
//! - Event types (ImportEvent enum) and the EventBus
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
