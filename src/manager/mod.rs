//! Index Manager (§4.2, §4.7): the name→index registry behind the HTTP
//! shell's three operations — provision, reset, search.

mod tail;

pub use tail::{ChannelTailSource, NullTailSource, TailSource};

use crate::config::IndexConfig;
use crate::error::{LsiError, Result};
use crate::index::{remove_index_files, LinkedRtree};
use crate::model::Rdr;
use crate::query::{self, Predicate};
use geo_types::Geometry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

struct Entry {
    index: Arc<LinkedRtree>,
    closed: Arc<AtomicBool>,
}

/// Holds every currently-open named index. Provisioning a name that is
/// already open closes the previous instance first (§4.7); this mirrors the
/// upstream's `add_index` tearing down any live `GeoIndex` before rebinding
/// the name.
pub struct IndexManager {
    data_dir: PathBuf,
    indexes: Mutex<HashMap<String, Entry>>,
}

impl IndexManager {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir, indexes: Mutex::new(HashMap::new()) })
    }

    /// Provision (or reprovision) a named index: close any previous live
    /// instance, read and rewrite the persisted config (`rebuild` always
    /// clears to `false`), and open fresh. `tail_source`, if given, is
    /// polled on a background task until the index is closed or
    /// reprovisioned (§4.7).
    pub fn provision(&self, name: &str, tail_source: Option<Arc<dyn TailSource>>) -> Result<Arc<LinkedRtree>> {
        self.close_existing(name)?;

        let mut config = IndexConfig::read(&self.data_dir, name);
        config.rebuild = false;
        config.tail = tail_source.is_some();
        config.write(&self.data_dir, name)?;

        let index = Arc::new(LinkedRtree::open(&self.data_dir, name, None)?);
        let closed = Arc::new(AtomicBool::new(false));
        self.indexes
            .lock()
            .insert(name.to_string(), Entry { index: index.clone(), closed: closed.clone() });

        if let Some(source) = tail_source {
            spawn_tail_task(name.to_string(), index.clone(), source, closed);
        }

        info!(index = name, "provisioned index");
        Ok(index)
    }

    /// Unlink the persisted artefacts, then re-provision from scratch (§4.7).
    pub fn reset(&self, name: &str, tail_source: Option<Arc<dyn TailSource>>) -> Result<Arc<LinkedRtree>> {
        self.close_existing(name)?;
        remove_index_files(&self.data_dir, name)?;
        self.provision(name, tail_source)
    }

    pub fn get(&self, name: &str) -> Result<Arc<LinkedRtree>> {
        self.indexes
            .lock()
            .get(name)
            .map(|e| e.index.clone())
            .ok_or_else(|| LsiError::NotFound(format!("no such index '{name}'")))
    }

    fn close_existing(&self, name: &str) -> Result<()> {
        let prev = self.indexes.lock().remove(name);
        if let Some(entry) = prev {
            entry.closed.store(true, Ordering::SeqCst);
            entry.index.close()?;
        }
        Ok(())
    }

    /// Run the full query pipeline (§4.4, §4.6) against a named index:
    /// coarse spatial predicate, then type/text/offset/limit refinement.
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        name: &str,
        predicate: Predicate,
        geom: Geometry<f64>,
        types: &[String],
        text: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Rdr>> {
        let index = self.get(name)?;
        let capped_limit = limit.min(1000);
        let fetch_count = offset.saturating_add(capped_limit).min(1000);

        let coarse: Vec<Rdr> = match predicate {
            Predicate::Nearest => index.nearest(&geom, fetch_count)?.collect(),
            Predicate::Intersects => index.intersection(geom)?.collect(),
            Predicate::Contains => index.contains(geom)?.collect(),
        };

        query::apply(coarse.into_iter(), types, text, offset, capped_limit)
    }
}

fn spawn_tail_task(name: String, index: Arc<LinkedRtree>, source: Arc<dyn TailSource>, closed: Arc<AtomicBool>) {
    tokio::task::spawn_blocking(move || loop {
        if closed.load(Ordering::SeqCst) {
            return;
        }
        match source.next_batch() {
            Ok(Some(batch)) => {
                if let Err(e) = index.add_quad_stream(Cursor::new(batch)) {
                    warn!(index = name.as_str(), error = %e, "tail ingest failed");
                }
            }
            Ok(None) => return,
            Err(e) => {
                warn!(index = name.as_str(), error = %e, "tail source failed");
                return;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;
    use std::sync::mpsc;

    #[test]
    fn provisioning_same_name_closes_previous() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::new(dir.path().to_path_buf()).unwrap();
        let first = manager.provision("parks", None).unwrap();
        first
            .add_quad_stream(std::io::Cursor::new(
                b"<http://example.org/a> <http://www.w3.org/2003/01/geo/wgs84_pos#lat> \"1\" <http://example.org/g> .\n<http://example.org/a> <http://www.w3.org/2003/01/geo/wgs84_pos#long> \"1\" <http://example.org/g> .\n".to_vec(),
            ))
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = manager.provision("parks", None).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn reset_wipes_prior_data() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::new(dir.path().to_path_buf()).unwrap();
        let first = manager.provision("parks", None).unwrap();
        first
            .add_quad_stream(std::io::Cursor::new(
                b"<http://example.org/a> <http://www.w3.org/2003/01/geo/wgs84_pos#lat> \"1\" <http://example.org/g> .\n<http://example.org/a> <http://www.w3.org/2003/01/geo/wgs84_pos#long> \"1\" <http://example.org/g> .\n".to_vec(),
            ))
            .unwrap();

        let reopened = manager.reset("parks", None).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn search_against_unknown_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::new(dir.path().to_path_buf()).unwrap();
        let geom = crate::geometry::parse_wkt("POINT(0 0)").unwrap();
        let err = manager
            .search("nosuch", Predicate::Nearest, geom, &[], None, 0, 10)
            .unwrap_err();
        assert!(matches!(err, LsiError::NotFound(_)));
    }

    #[tokio::test]
    async fn channel_tail_source_feeds_index() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::new(dir.path().to_path_buf()).unwrap();
        let (tx, rx) = mpsc::channel();
        let source: Arc<dyn TailSource> = Arc::new(ChannelTailSource::new(rx));
        let index = manager.provision("tailed", Some(source)).unwrap();
        tx.send(b"<http://example.org/a> <http://www.w3.org/2003/01/geo/wgs84_pos#lat> \"1\" <http://example.org/g> .\n<http://example.org/a> <http://www.w3.org/2003/01/geo/wgs84_pos#long> \"1\" <http://example.org/g> .\n".to_vec()).unwrap();
        drop(tx);

        for _ in 0..50 {
            if index.len() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(index.len(), 1);
    }
}
