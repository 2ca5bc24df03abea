//! Bounding-box index: a thin wrapper over `rstar::RTree`, persisted as a
//! periodic snapshot (§4.2). The upstream used `libspatialindex`'s on-disk
//! pager directly (`.dat`/`.idx`); this crate keeps the two-file naming but
//! gives `.dat` a small header and puts the actual tree contents in
//! `.idx` as a `bincode` snapshot.

use crate::error::Result;
use crate::geometry::Envelope;
use rstar::{Envelope as _, Point as _, PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedEnvelope {
    pub id: u64,
    pub envelope: Envelope,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.envelope.minx, self.envelope.miny],
            [self.envelope.maxx, self.envelope.maxy],
        )
    }
}

/// Required by `RTree::nearest_neighbor_iter` (§4.2). The distance of the
/// envelope's center to the query point, matching the upstream's coarse
/// nearest-neighbour semantics (no exact-geometry refinement for `nearest`).
impl PointDistance for IndexedEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope().center().distance_2(point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.envelope().contains_point(point)
    }
}

#[derive(Serialize, Deserialize)]
struct Header {
    version: u32,
    entry_count: usize,
}

/// The R-tree half of the Linked R-tree (§4.2). Not thread-safe on its own;
/// callers serialise writes per the single-writer discipline (§5).
pub struct RtreeIndex {
    tree: RTree<IndexedEnvelope>,
    dat_path: Option<PathBuf>,
    idx_path: Option<PathBuf>,
}

impl RtreeIndex {
    /// Open (or create) a persistent index rooted at `<name>.dat`/`<name>.idx`
    /// inside `data_dir`.
    pub fn open(data_dir: &Path, name: &str) -> Result<Self> {
        let dat_path = data_dir.join(format!("{name}.dat"));
        let idx_path = data_dir.join(format!("{name}.idx"));

        let tree = if idx_path.exists() {
            let bytes = fs::read(&idx_path)?;
            let (tree, _): (RTree<IndexedEnvelope>, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                    .map_err(|e| crate::error::LsiError::Internal(format!("corrupt R-tree snapshot: {e}")))?;
            tree
        } else {
            RTree::new()
        };

        let mut index = Self {
            tree,
            dat_path: Some(dat_path),
            idx_path: Some(idx_path),
        };
        index.write_header()?;
        Ok(index)
    }

    /// An ephemeral, non-persisted index (used by ephemeral/in-memory
    /// indexes and by tests).
    pub fn in_memory() -> Self {
        Self {
            tree: RTree::new(),
            dat_path: None,
            idx_path: None,
        }
    }

    pub fn insert(&mut self, id: u64, envelope: Envelope) {
        self.tree.insert(IndexedEnvelope { id, envelope });
    }

    /// Remove the entry with `id` whose envelope is contained within
    /// `search_within` (the world envelope at call sites, per the
    /// unconditional-evict insertion protocol). Linear locate + equality
    /// check, since `rstar::RTree::remove` needs the exact object.
    pub fn remove(&mut self, id: u64, search_within: Envelope) -> bool {
        let aabb = AABB::from_corners(
            [search_within.minx, search_within.miny],
            [search_within.maxx, search_within.maxy],
        );
        let target = self
            .tree
            .locate_in_envelope(&aabb)
            .find(|candidate| candidate.id == id)
            .copied();
        match target {
            Some(entry) => self.tree.remove(&entry).is_some(),
            None => false,
        }
    }

    pub fn nearest_ids(&self, point: [f64; 2], limit: usize) -> Vec<u64> {
        self.tree
            .nearest_neighbor_iter(&point)
            .take(limit)
            .map(|entry| entry.id)
            .collect()
    }

    pub fn ids_in_envelope(&self, envelope: Envelope) -> Vec<u64> {
        let aabb = AABB::from_corners(
            [envelope.minx, envelope.miny],
            [envelope.maxx, envelope.maxy],
        );
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|entry| entry.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    fn write_header(&self) -> Result<()> {
        if let Some(dat_path) = &self.dat_path {
            let header = Header {
                version: FORMAT_VERSION,
                entry_count: self.tree.size(),
            };
            let bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
                .map_err(|e| crate::error::LsiError::Internal(e.to_string()))?;
            fs::write(dat_path, bytes)?;
        }
        Ok(())
    }

    /// Flush the current tree contents to `<name>.idx` and refresh the
    /// `<name>.dat` header.
    pub fn flush(&self) -> Result<()> {
        if let Some(idx_path) = &self.idx_path {
            let bytes = bincode::serde::encode_to_vec(&self.tree, bincode::config::standard())
                .map_err(|e| crate::error::LsiError::Internal(e.to_string()))?;
            fs::write(idx_path, bytes)?;
        }
        self.write_header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Envelope {
        Envelope { minx, maxx, miny, maxy }
    }

    #[test]
    fn insert_and_nearest() {
        let mut index = RtreeIndex::in_memory();
        index.insert(1, env(0.0, 0.0, 0.0, 0.0));
        index.insert(2, env(10.0, 10.0, 10.0, 10.0));
        let nearest = index.nearest_ids([0.1, 0.1], 1);
        assert_eq!(nearest, vec![1]);
    }

    #[test]
    fn remove_evicts_stale_entry() {
        let mut index = RtreeIndex::in_memory();
        index.insert(5, env(0.0, 0.0, 0.0, 0.0));
        assert!(index.remove(5, crate::geometry::WORLD_ENVELOPE));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut index = RtreeIndex::open(dir.path(), "parks").unwrap();
            index.insert(42, env(1.0, 1.0, 2.0, 2.0));
            index.flush().unwrap();
        }
        let reopened = RtreeIndex::open(dir.path(), "parks").unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.ids_in_envelope(env(0.0, 0.0, 3.0, 3.0)), vec![42]);
    }
}
