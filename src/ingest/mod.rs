//! Quad ingester & geometry extractor (§4.5).
//!
//! Groups incoming quads by `(subject, graph)`, accumulates a pending
//! description, and — on group change or end of stream — finalises it into
//! zero or one `Rdr`, resolving GeoSPARQL-style blank-node indirection via
//! an injected describe callback.

mod predicates;

pub use predicates::*;

use crate::error::{LsiError, Result};
use crate::geometry;
use crate::model::Rdr;
use crate::rdf_json;
use oxrdf::{GraphName, NamedNode, Quad, Subject, Term, Triple};
use std::sync::Arc;

/// Capability injected at index construction to resolve the outer resource
/// for a blank-node geometry indirection (§4.5, §9). Stubbed in tests.
pub type DescribeFn = Arc<dyn Fn(&Subject) -> Result<Vec<Triple>> + Send + Sync>;

#[derive(Default)]
struct GeometryCandidates {
    as_wkt: Option<String>,
    as_geojson: Option<String>,
    lat: Option<String>,
    long: Option<String>,
    georss_point: Option<String>,
}

struct PendingDescription {
    subject: Subject,
    graph: GraphName,
    description: Vec<Triple>,
    candidates: GeometryCandidates,
}

impl PendingDescription {
    fn new(subject: Subject, graph: GraphName) -> Self {
        Self {
            subject,
            graph,
            description: Vec::new(),
            candidates: GeometryCandidates::default(),
        }
    }

    fn push(&mut self, predicate: NamedNode, object: Term) {
        if let Some(text) = literal_text(&object) {
            // last-observed-wins per recognised predicate (§9 open question)
            match predicate.as_str() {
                WGS84_LAT => self.candidates.lat = Some(text),
                WGS84_LONG => self.candidates.long = Some(text),
                GEORSS_POINT => self.candidates.georss_point = Some(text),
                GEOSPARQL_AS_WKT => self.candidates.as_wkt = Some(text),
                OSG_AS_GEOJSON => self.candidates.as_geojson = Some(text),
                _ => {}
            }
        }
        self.description.push(Triple::new(self.subject.clone(), predicate, object));
    }
}

fn literal_text(term: &Term) -> Option<String> {
    match term {
        Term::Literal(l) => Some(l.value().to_string()),
        _ => None,
    }
}

fn graph_name_to_string(graph: &GraphName) -> String {
    match graph {
        GraphName::NamedNode(n) => n.as_str().to_string(),
        GraphName::BlankNode(b) => format!("_:{}", b.as_str()),
        GraphName::DefaultGraph => String::new(),
    }
}

fn subject_to_uri_string(subject: &Subject) -> String {
    match subject {
        Subject::NamedNode(n) => n.as_str().to_string(),
        Subject::BlankNode(b) => format!("_:{}", b.as_str()),
        #[allow(unreachable_patterns)]
        _ => String::new(),
    }
}

pub struct Ingester {
    describe: Option<DescribeFn>,
    pending: Option<PendingDescription>,
}

impl Ingester {
    pub fn new(describe: Option<DescribeFn>) -> Self {
        Self { describe, pending: None }
    }

    /// Feed one quad. Returns a finalised record if this quad closed out a
    /// different `(subject, graph)` group.
    pub fn push(&mut self, quad: Quad) -> Result<Option<Rdr>> {
        let Quad { subject, predicate, object, graph_name } = quad;

        let emitted = match &self.pending {
            Some(pending) if pending.subject == subject && pending.graph == graph_name => None,
            _ => self.finalise()?,
        };

        let entry = self
            .pending
            .get_or_insert_with(|| PendingDescription::new(subject, graph_name));
        entry.push(predicate, object);

        Ok(emitted)
    }

    /// Force-finalise whatever is pending. Call once at end of stream.
    pub fn finish(&mut self) -> Result<Option<Rdr>> {
        self.finalise()
    }

    fn finalise(&mut self) -> Result<Option<Rdr>> {
        let Some(mut pending) = self.pending.take() else {
            return Ok(None);
        };

        let wkt_text = if let Some(crs_wkt) = pending.candidates.as_wkt.take() {
            let (_, wkt) = crs_wkt.trim().split_once(char::is_whitespace).unwrap_or(("", crs_wkt.trim()));
            self.resolve_indirection(&mut pending)?;
            Some(geometry::normalise_whitespace(wkt))
        } else if let Some(geojson_text) = pending.candidates.as_geojson.take() {
            let value: serde_json::Value = serde_json::from_str(&geojson_text)
                .map_err(|e| LsiError::Geometry(format!("invalid GeoJSON: {e}")))?;
            let geom = match geometry::geojson_value_to_geometry(&value) {
                Ok(geom) => geom,
                Err(_) => return Ok(None),
            };
            self.resolve_indirection(&mut pending)?;
            Some(geometry::to_wkt(&geom))
        } else if let (Some(lat), Some(long)) = (&pending.candidates.lat, &pending.candidates.long) {
            Some(format!("POINT({long} {lat})"))
        } else if let Some(point) = &pending.candidates.georss_point {
            let parts: Vec<&str> = point.split_whitespace().collect();
            if parts.len() != 2 {
                None
            } else {
                Some(format!("POINT({} {})", parts[1], parts[0]))
            }
        } else {
            None
        };

        let Some(wkt_text) = wkt_text else {
            return Ok(None);
        };

        let geom = match geometry::parse_wkt(&wkt_text) {
            Ok(geom) => geom,
            Err(_) => return Ok(None),
        };
        let envelope = match geometry::envelope_of(&geom) {
            Ok(envelope) => envelope,
            Err(_) => return Ok(None),
        };

        let uri = subject_to_uri_string(&pending.subject);
        let graph = graph_name_to_string(&pending.graph);
        let description_json = rdf_json::triples_to_rdf_json(&pending.description);

        Ok(Some(Rdr {
            uri,
            graph,
            geom_wkt: geometry::to_wkt(&geom),
            envelope,
            description_json,
        }))
    }

    /// Resolve GeoSPARQL-style blank-node indirection: if a describe
    /// callback is configured, fetch more triples about the pending
    /// subject and retarget `uri` to whichever outer resource points at it.
    fn resolve_indirection(&self, pending: &mut PendingDescription) -> Result<()> {
        let Some(describe) = &self.describe else {
            return Ok(());
        };
        let extra = describe(&pending.subject).map_err(|e| match e {
            LsiError::BadRequest(_) | LsiError::NotFound(_) | LsiError::NotAcceptable => e,
            other => LsiError::Internal(format!("describe callback failed: {other}")),
        })?;

        let target = find_referring_subject(&extra, &pending.subject);
        pending.description.extend(extra);
        if let Some(outer) = target {
            pending.subject = outer;
        }
        Ok(())
    }
}

/// Find a subject that has `bnode` as the object of some predicate within
/// `triples` — i.e. the outer resource pointing at the indirected geometry
/// node (§4.5).
fn find_referring_subject(triples: &[Triple], bnode: &Subject) -> Option<Subject> {
    let bnode_term = match bnode {
        Subject::NamedNode(n) => Term::NamedNode(n.clone()),
        Subject::BlankNode(b) => Term::BlankNode(b.clone()),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    triples
        .iter()
        .find(|t| t.object == bnode_term)
        .map(|t| t.subject.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::rdf;
    use oxrdf::{Literal, NamedNode};

    fn quad(s: &str, p: &str, o: Term, g: &str) -> Quad {
        Quad::new(
            NamedNode::new(s).unwrap(),
            NamedNode::new(p).unwrap(),
            o,
            NamedNode::new(g).unwrap(),
        )
    }

    #[test]
    fn lat_long_point_emits_record() {
        let mut ingester = Ingester::new(None);
        let g = "http://example.org/g1";
        let r1 = ingester
            .push(quad(
                "http://example.org/foo",
                rdf::TYPE.as_str(),
                Term::NamedNode(NamedNode::new("http://www.w3.org/2003/01/geo/wgs84_pos#SpatialThing").unwrap()),
                g,
            ))
            .unwrap();
        assert!(r1.is_none());
        ingester
            .push(quad(
                "http://example.org/foo",
                WGS84_LAT,
                Term::Literal(Literal::new_simple_literal("10.0")),
                g,
            ))
            .unwrap();
        ingester
            .push(quad(
                "http://example.org/foo",
                WGS84_LONG,
                Term::Literal(Literal::new_simple_literal("10.0")),
                g,
            ))
            .unwrap();
        let rdr = ingester.finish().unwrap().unwrap();
        assert_eq!(rdr.uri, "http://example.org/foo");
        assert_eq!(rdr.geom_wkt, "POINT(10 10)");
    }

    #[test]
    fn different_subject_finalises_previous_group() {
        let mut ingester = Ingester::new(None);
        let g = "http://example.org/g1";
        ingester
            .push(quad("http://example.org/a", WGS84_LAT, Term::Literal(Literal::new_simple_literal("1")), g))
            .unwrap();
        ingester
            .push(quad("http://example.org/a", WGS84_LONG, Term::Literal(Literal::new_simple_literal("2")), g))
            .unwrap();
        let emitted = ingester
            .push(quad("http://example.org/b", WGS84_LAT, Term::Literal(Literal::new_simple_literal("3")), g))
            .unwrap();
        assert!(emitted.is_some());
        assert_eq!(emitted.unwrap().uri, "http://example.org/a");
    }

    #[test]
    fn empty_stream_finalises_nothing() {
        let mut ingester = Ingester::new(None);
        assert!(ingester.finish().unwrap().is_none());
    }

    #[test]
    fn no_geometry_predicate_drops_record() {
        let mut ingester = Ingester::new(None);
        let g = "http://example.org/g1";
        ingester
            .push(quad(
                "http://example.org/a",
                rdf::TYPE.as_str(),
                Term::NamedNode(NamedNode::new("http://example.org/Thing").unwrap()),
                g,
            ))
            .unwrap();
        assert!(ingester.finish().unwrap().is_none());
    }

    #[test]
    fn georss_point_order_is_lat_then_long() {
        let mut ingester = Ingester::new(None);
        let g = "http://example.org/g1";
        ingester
            .push(quad(
                "http://example.org/a",
                GEORSS_POINT,
                Term::Literal(Literal::new_simple_literal("34.3 -83.4")),
                g,
            ))
            .unwrap();
        let rdr = ingester.finish().unwrap().unwrap();
        assert_eq!(rdr.geom_wkt, "POINT(-83.4 34.3)");
    }

    #[test]
    fn geosparql_indirection_retargets_uri() {
        let describe: DescribeFn = Arc::new(|subject| {
            let bnode = match subject {
                Subject::BlankNode(b) => b.clone(),
                _ => panic!("expected blank node"),
            };
            Ok(vec![Triple::new(
                NamedNode::new("http://example.org/bar").unwrap(),
                NamedNode::new("http://purl.org/dc/terms/spatial").unwrap(),
                Term::BlankNode(bnode),
            )])
        });
        let mut ingester = Ingester::new(Some(describe));
        let bnode = oxrdf::BlankNode::new("geom1").unwrap();
        let q = Quad::new(
            bnode,
            NamedNode::new(GEOSPARQL_AS_WKT).unwrap(),
            Term::Literal(Literal::new_simple_literal(
                "<http://www.opengis.net/def/crs/OGC/1.3/CRS84> POLYGON((-83.6 34.1, -83.2 34.1, -83.2 34.5, -83.6 34.5, -83.6 34.1))",
            )),
            NamedNode::new("http://example.org/ex2").unwrap(),
        );
        ingester.push(q).unwrap();
        let rdr = ingester.finish().unwrap().unwrap();
        assert_eq!(rdr.uri, "http://example.org/bar");
    }
}
