//! SQLite backend for the Cherry entity store, plus a filesystem store for
//! document content.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod content;
mod encode;
mod schema;
mod store;

pub mod error;

pub use content::FsContentStore;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
