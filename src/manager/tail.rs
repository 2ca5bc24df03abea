//! Tail ingestion transport (§4.7, §9). The upstream wires its tail thread
//! to a message queue; we leave the transport abstract behind `TailSource`
//! and ship a no-op default plus an in-memory channel source for tests.

use crate::error::Result;
use parking_lot::Mutex;

/// Supplies batches of N-Quads bytes to append to a tailing index.
/// `next_batch` blocks until a batch is available and returns `Ok(None)`
/// once the source is exhausted, ending the tail task.
pub trait TailSource: Send + Sync {
    fn next_batch(&self) -> Result<Option<Vec<u8>>>;
}

/// The default: no background ingestion. Matches an index provisioned
/// without a `tail` configuration.
pub struct NullTailSource;

impl TailSource for NullTailSource {
    fn next_batch(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// An in-memory tail source fed by an `mpsc::Sender<Vec<u8>>`, useful for
/// tests and for embedding this crate behind a hand-rolled transport.
pub struct ChannelTailSource {
    rx: Mutex<std::sync::mpsc::Receiver<Vec<u8>>>,
}

impl ChannelTailSource {
    pub fn new(rx: std::sync::mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx: Mutex::new(rx) }
    }
}

impl TailSource for ChannelTailSource {
    fn next_batch(&self) -> Result<Option<Vec<u8>>> {
        match self.rx.lock().recv() {
            Ok(batch) => Ok(Some(batch)),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_source_ends_immediately() {
        assert!(NullTailSource.next_batch().unwrap().is_none());
    }

    #[test]
    fn channel_source_yields_sent_batches() {
        let (tx, rx) = std::sync::mpsc::channel();
        let source = ChannelTailSource::new(rx);
        tx.send(b"hello".to_vec()).unwrap();
        drop(tx);
        assert_eq!(source.next_batch().unwrap(), Some(b"hello".to_vec()));
        assert_eq!(source.next_batch().unwrap(), None);
    }
}
