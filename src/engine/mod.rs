//! Pluggable collaborators: reading storage and sensor registry

pub mod memory;
pub mod traits;

pub use memory::{MemoryReadingStore, MemoryRegistry};
pub use traits::{ReadingStore, Registry};
