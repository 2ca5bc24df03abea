use super::PayloadStore;
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory payload store for ephemeral indexes: unit tests and the
/// transient window of a `reset`'s rebuild.
#[derive(Default)]
pub struct MemoryPayloadStore {
    rows: RwLock<HashMap<u64, Vec<u8>>>,
}

impl MemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PayloadStore for MemoryPayloadStore {
    fn put(&self, id: u64, bytes: &[u8]) -> Result<()> {
        self.rows.write().insert(id, bytes.to_vec());
        Ok(())
    }

    fn get(&self, id: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    fn delete(&self, id: u64) -> Result<()> {
        self.rows.write().remove(&id);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete_round_trip() {
        let store = MemoryPayloadStore::new();
        store.put(1, b"abc").unwrap();
        assert_eq!(store.get(1).unwrap(), Some(b"abc".to_vec()));
        store.delete(1).unwrap();
        assert_eq!(store.get(1).unwrap(), None);
    }
}
