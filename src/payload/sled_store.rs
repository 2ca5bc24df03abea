use super::PayloadStore;
use crate::error::Result;
use std::path::Path;

/// On-disk payload store, a `sled` tree rooted at `<name>.payload`. Survives
/// process restart when opened against the same path (mirrors the upstream
/// kyotocabinet-backed `.kch` file).
pub struct SledPayloadStore {
    db: sled::Db,
}

impl SledPayloadStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

impl PayloadStore for SledPayloadStore {
    fn put(&self, id: u64, bytes: &[u8]) -> Result<()> {
        self.db.insert(id.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn get(&self, id: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(id.to_be_bytes())?.map(|v| v.to_vec()))
    }

    fn delete(&self, id: u64) -> Result<()> {
        self.db.remove(id.to_be_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.flush()
    }
}
