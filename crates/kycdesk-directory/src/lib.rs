//! Directory synchronization, evidence caching, and record mutation for
//! the KycDesk console.

pub mod cache;
pub mod directory;
pub mod memory;
pub mod service;
pub mod sync;

pub use cache::FileReferenceCache;
pub use directory::Directory;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use service::DirectoryService;
pub use sync::{DirectorySnapshot, DirectoryStats, DirectorySync};
