//! Versioned response cache.
//!
//! Responses are stored per cache generation. A generation is named by a
//! version string fixed at deploy time; a new deployment starts a new
//! generation instead of mutating the old one, and activation removes every
//! generation except the current one.

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::SqliteStorage;
pub use traits::{CacheStorage, CachedResponse, RequestKey};
