//! Posts, users and collaborations

pub mod errors;
pub mod manager;
pub mod ownership;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod storage;
pub mod types;

pub use errors::*;
pub use manager::*;
#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePostStorage;
pub use storage::*;
pub use types::*;
