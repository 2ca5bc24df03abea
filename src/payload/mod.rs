//! Keyed payload store: `id -> opaque bytes`, co-located with the R-tree
//! files (§4.1). At-most-one-writer, many-readers by convention; this
//! module provides no internal locking of its own.

mod memory;
mod sled_store;

pub use memory::MemoryPayloadStore;
pub use sled_store::SledPayloadStore;

use crate::error::Result;

pub trait PayloadStore: Send + Sync {
    fn put(&self, id: u64, bytes: &[u8]) -> Result<()>;
    fn get(&self, id: u64) -> Result<Option<Vec<u8>>>;
    fn delete(&self, id: u64) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn close(&self) -> Result<()>;
}
