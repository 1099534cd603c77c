pub mod client;
pub mod error;
pub mod file;
pub mod memory;

pub use client::{load_manager, PersistenceClient};
pub use error::{PersistError, Result};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
