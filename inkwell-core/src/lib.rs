//! Inkwell Core - shared infrastructure for the publishing workspace
//!
//! Error types with context, logging initialisation and configuration
//! loading used by the application and web layers.

pub mod config;
pub mod error;
pub mod logging;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::logging::*;

// Re-export commonly used external types
pub use tracing;
