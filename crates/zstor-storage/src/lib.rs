//! zstor-storage: where encoded frames live
//!
//! The chunk codec never touches storage. The orchestrator reaches a backend
//! through [`Remote`], which is either disabled or wraps an [`ObjectStore`].

pub mod directory;
pub mod memory;
pub mod remote;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use remote::{build_remote, ObjectStore, Remote};
