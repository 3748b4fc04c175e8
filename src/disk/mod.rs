pub mod backing_store;
pub mod types;

pub use backing_store::BackingStore;
pub use types::{DEFAULT_BLOCK_SIZE, DEFAULT_CAPACITY, HEADER_SIZE, INODE_SIZE, MIN_BLOCK_SIZE};
