pub mod backend;
pub mod cache;
pub mod error;
pub mod sqlite;
pub mod store;

pub use backend::MemoryBackend;
pub use error::MemoryError;
pub use sqlite::SqliteMemory;
pub use store::MemoryStore;
