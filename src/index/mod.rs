//! The Linked R-tree façade (§4.3): the glue between RDF quads and the
//! R-tree + payload store. Owns both exclusively; callers serialise writes
//! per the single-writer discipline (§5) via the internal `RwLock`.

use crate::error::Result;
use crate::geometry::{self, WORLD_ENVELOPE};
use crate::ingest::{DescribeFn, Ingester};
use crate::model::Rdr;
use crate::payload::{MemoryPayloadStore, PayloadStore, SledPayloadStore};
use crate::rtree::RtreeIndex;
use geo_types::Geometry;
use parking_lot::RwLock;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

pub struct LinkedRtree {
    rtree: RwLock<RtreeIndex>,
    payload: Arc<dyn PayloadStore>,
    describe: Option<DescribeFn>,
}

impl LinkedRtree {
    /// Open a persistent index rooted at `<name>.dat`/`<name>.idx`/`<name>.payload`
    /// inside `data_dir`.
    pub fn open(data_dir: &Path, name: &str, describe: Option<DescribeFn>) -> Result<Self> {
        let rtree = RtreeIndex::open(data_dir, name)?;
        let payload = SledPayloadStore::open(&data_dir.join(format!("{name}.payload")))?;
        Ok(Self {
            rtree: RwLock::new(rtree),
            payload: Arc::new(payload),
            describe,
        })
    }

    /// An ephemeral, non-persisted index: tests and the transient rebuild
    /// window of a `reset`.
    pub fn ephemeral(describe: Option<DescribeFn>) -> Self {
        Self {
            rtree: RwLock::new(RtreeIndex::in_memory()),
            payload: Arc::new(MemoryPayloadStore::new()),
            describe,
        }
    }

    /// Consume a quad stream (N-Quads, UTF-8) to completion. Already
    /// finalised records remain indexed even if the stream itself turns
    /// out malformed partway through (§4.7).
    pub fn add_quad_stream<R: Read>(&self, reader: R) -> Result<()> {
        let mut ingester = Ingester::new(self.describe.clone());
        let parser = oxttl::NQuadsParser::new().parse_read(reader);
        for quad in parser {
            let quad = quad.map_err(|e| crate::error::LsiError::Rdf(e.to_string()))?;
            if let Some(rdr) = ingester.push(quad)? {
                self.insert_record(rdr)?;
            }
        }
        if let Some(rdr) = ingester.finish()? {
            self.insert_record(rdr)?;
        }
        self.rtree.write().flush()?;
        Ok(())
    }

    /// Insertion protocol for a single finalised RDR (§4.3): evict any
    /// stale bounding box, insert the fresh one, then persist the payload.
    /// Steps are not externally atomic (§4.3, §5).
    fn insert_record(&self, rdr: Rdr) -> Result<()> {
        let id = rdr.id();
        {
            let mut tree = self.rtree.write();
            tree.remove(id, WORLD_ENVELOPE);
            tree.insert(id, rdr.envelope);
        }
        let bytes = serde_json::to_vec(&rdr)?;
        self.payload.put(id, &bytes)?;
        Ok(())
    }

    fn fetch(&self, id: u64) -> Option<Rdr> {
        match self.payload.get(id) {
            Ok(Some(bytes)) => serde_json::from_slice::<Rdr>(&bytes).ok(),
            _ => None,
        }
    }

    /// `geom` reduces to its centroid (points use themselves) and is
    /// matched against the R-tree's k-nearest bounding-box search;
    /// envelope-only, no exact refinement (§4.3).
    pub fn nearest(&self, geom: &Geometry<f64>, limit: usize) -> Result<impl Iterator<Item = Rdr> + '_> {
        let centroid = geometry::centroid_or_self(geom)?;
        let ids = self.rtree.read().nearest_ids([centroid.x(), centroid.y()], limit);
        Ok(ids.into_iter().filter_map(move |id| self.fetch(id)))
    }

    /// Coarse filter by envelope, then exact refinement via `geo::Intersects`.
    pub fn intersection(&self, geom: Geometry<f64>) -> Result<impl Iterator<Item = Rdr> + '_> {
        let envelope = geometry::envelope_of(&geom)?;
        let ids = self.rtree.read().ids_in_envelope(envelope);
        Ok(ids.into_iter().filter_map(move |id| self.fetch(id)).filter(move |rdr| {
            geometry::parse_wkt(&rdr.geom_wkt)
                .map(|stored| geometry::intersects(&geom, &stored))
                .unwrap_or(false)
        }))
    }

    /// Coarse filter by envelope, then exact refinement via `geo::Contains`
    /// (`geom.contains(&rdr.geom)`).
    pub fn contains(&self, geom: Geometry<f64>) -> Result<impl Iterator<Item = Rdr> + '_> {
        let envelope = geometry::envelope_of(&geom)?;
        let ids = self.rtree.read().ids_in_envelope(envelope);
        Ok(ids.into_iter().filter_map(move |id| self.fetch(id)).filter(move |rdr| {
            geometry::parse_wkt(&rdr.geom_wkt)
                .map(|stored| geometry::contains(&geom, &stored))
                .unwrap_or(false)
        }))
    }

    /// Flushes and releases all resources (R-tree snapshot + payload store).
    pub fn close(&self) -> Result<()> {
        self.rtree.write().flush()?;
        self.payload.close()
    }

    pub fn len(&self) -> usize {
        self.rtree.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.read().is_empty()
    }
}

/// Remove the three on-disk artefacts for `<name>` from `data_dir`
/// (§4.7's reset; missing files are not an error).
pub fn remove_index_files(data_dir: &Path, name: &str) -> Result<()> {
    for suffix in [".dat", ".idx"] {
        let path = data_dir.join(format!("{name}{suffix}"));
        if path.exists() {
            std::fs::remove_file(path)?;
        }
    }
    let payload_dir = data_dir.join(format!("{name}.payload"));
    if payload_dir.exists() {
        std::fs::remove_dir_all(payload_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::parse_wkt;

    fn nquads(body: &str) -> std::io::Cursor<Vec<u8>> {
        std::io::Cursor::new(body.as_bytes().to_vec())
    }

    #[test]
    fn wgs84_point_nearest() {
        let index = LinkedRtree::ephemeral(None);
        let quads = r#"<http://example.org/foo> <http://www.w3.org/2003/01/geo/wgs84_pos#lat> "10.0" <http://example.org/g1> .
<http://example.org/foo> <http://www.w3.org/2003/01/geo/wgs84_pos#long> "10.0" <http://example.org/g1> .
"#;
        index.add_quad_stream(nquads(quads)).unwrap();
        let origin = parse_wkt("POINT(0 0)").unwrap();
        let results: Vec<_> = index.nearest(&origin, 10).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "http://example.org/foo");
    }

    #[test]
    fn disjoint_polygon_returns_nothing() {
        let index = LinkedRtree::ephemeral(None);
        let quads = format!(
            "<http://example.org/bar> <{}> \"POLYGON((-83.6 34.1, -83.2 34.1, -83.2 34.5, -83.6 34.5, -83.6 34.1))\" <http://example.org/g1> .\n",
            crate::ingest::GEOSPARQL_AS_WKT
        );
        index.add_quad_stream(nquads(&quads)).unwrap();
        let disjoint = parse_wkt("POLYGON((0 0,10 0,10 10,0 10,0 0))").unwrap();
        let results: Vec<_> = index.intersection(disjoint).unwrap().collect();
        assert!(results.is_empty());
    }

    #[test]
    fn reingesting_same_uri_graph_overwrites() {
        let index = LinkedRtree::ephemeral(None);
        let g = "http://example.org/g1";
        let first = format!(
            "<http://example.org/foo> <{}> \"10.0\" <{g}> .\n<http://example.org/foo> <{}> \"10.0\" <{g}> .\n",
            crate::ingest::WGS84_LAT,
            crate::ingest::WGS84_LONG,
        );
        index.add_quad_stream(nquads(&first)).unwrap();
        assert_eq!(index.len(), 1);

        let second = format!(
            "<http://example.org/foo> <{}> \"20.0\" <{g}> .\n<http://example.org/foo> <{}> \"20.0\" <{g}> .\n",
            crate::ingest::WGS84_LAT,
            crate::ingest::WGS84_LONG,
        );
        index.add_quad_stream(nquads(&second)).unwrap();
        assert_eq!(index.len(), 1);

        let origin = parse_wkt("POINT(20 20)").unwrap();
        let results: Vec<_> = index.nearest(&origin, 1).unwrap().collect();
        assert_eq!(results[0].geom_wkt, "POINT(20 20)");
    }

    #[test]
    fn empty_stream_indexes_nothing() {
        let index = LinkedRtree::ephemeral(None);
        index.add_quad_stream(nquads("")).unwrap();
        assert!(index.is_empty());
    }
}
