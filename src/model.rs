//! Resource Description Record (§3): the unit stored per indexed resource
//! and returned from every query.

use crate::geometry::Envelope;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rdr {
    pub uri: String,
    pub graph: String,
    pub geom_wkt: String,
    pub envelope: Envelope,
    pub description_json: serde_json::Value,
}

impl Rdr {
    pub fn id(&self) -> u64 {
        crate::hash::index_id(&self.uri, &self.graph)
    }
}
