//! HTTP handlers

pub mod health;
pub mod posts;
pub mod types;

pub use health::*;
pub use posts::*;
pub use types::*;
