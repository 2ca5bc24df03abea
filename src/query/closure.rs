//! Closure query (§4.4, §4.6): assemble all surviving RDRs into one
//! conjunctive graph and serialize it in a negotiated RDF format.

use crate::error::{LsiError, Result};
use crate::model::Rdr;
use crate::rdf_json;
use oxrdf::{GraphName, NamedNode, Quad};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureFormat {
    Turtle,
    NTriples,
    NQuads,
    RdfXml,
    RdfJson,
}

impl ClosureFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ClosureFormat::Turtle => "text/turtle",
            ClosureFormat::NTriples => "application/n-triples",
            ClosureFormat::NQuads => "application/n-quads",
            ClosureFormat::RdfXml => "application/rdf+xml",
            ClosureFormat::RdfJson => "application/json",
        }
    }
}

const CANDIDATES: [(&str, ClosureFormat); 6] = [
    ("text/turtle", ClosureFormat::Turtle),
    ("application/json", ClosureFormat::RdfJson),
    ("application/n-triples", ClosureFormat::NTriples),
    ("text/n-triples", ClosureFormat::NTriples),
    ("application/n-quads", ClosureFormat::NQuads),
    ("application/rdf+xml", ClosureFormat::RdfXml),
];

struct AcceptEntry {
    mime: String,
    q: f32,
}

fn parse_accept(accept: &str) -> Vec<AcceptEntry> {
    let mut entries: Vec<AcceptEntry> = accept
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let mut segments = part.split(';');
            let mime = segments.next()?.trim().to_lowercase();
            let mut q = 1.0f32;
            for seg in segments {
                if let Some(v) = seg.trim().strip_prefix("q=") {
                    q = v.parse().unwrap_or(1.0);
                }
            }
            Some(AcceptEntry { mime, q })
        })
        .collect();
    entries.sort_by(|a, b| b.q.partial_cmp(&a.q).unwrap_or(std::cmp::Ordering::Equal));
    entries
}

fn mime_matches(accepted: &str, candidate: &str) -> bool {
    if accepted == candidate {
        return true;
    }
    let Some((accepted_type, accepted_sub)) = accepted.split_once('/') else { return false };
    let Some((candidate_type, _)) = candidate.split_once('/') else { return false };
    accepted_type == candidate_type && accepted_sub == "*"
}

/// Negotiate a closure serialization format from an `Accept` header. Falls
/// back to Turtle for `*/*` or an absent header, matching the upstream's
/// `negotiate` default. Fails with `NotAcceptable` if nothing matches.
pub fn negotiate_closure(accept: Option<&str>) -> Result<ClosureFormat> {
    let accept = accept.unwrap_or("*/*");
    for entry in parse_accept(accept) {
        if entry.mime == "*/*" {
            return Ok(ClosureFormat::Turtle);
        }
        for (mime, format) in CANDIDATES {
            if mime_matches(&entry.mime, mime) {
                return Ok(format);
            }
        }
    }
    Err(LsiError::NotAcceptable)
}

fn all_triples(rdrs: &[Rdr]) -> Result<Vec<(String, Vec<oxrdf::Triple>)>> {
    rdrs.iter()
        .map(|rdr| Ok((rdr.graph.clone(), rdf_json::rdf_json_to_triples(&rdr.description_json)?)))
        .collect()
}

fn graph_name_for(graph: &str) -> Result<GraphName> {
    if graph.is_empty() {
        Ok(GraphName::DefaultGraph)
    } else if let Some(id) = graph.strip_prefix("_:") {
        Ok(GraphName::BlankNode(
            oxrdf::BlankNode::new(id).map_err(|e| LsiError::Internal(e.to_string()))?,
        ))
    } else {
        Ok(GraphName::NamedNode(
            NamedNode::new(graph).map_err(|e| LsiError::Internal(e.to_string()))?,
        ))
    }
}

fn merge_rdf_json(rdrs: &[Rdr]) -> Value {
    let mut by_graph: Map<String, Value> = Map::new();
    for rdr in rdrs {
        let entry = by_graph
            .entry(rdr.graph.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(graph_obj) = entry else { continue };
        if let Value::Object(subjects) = &rdr.description_json {
            for (subject, predicates) in subjects {
                let subject_entry = graph_obj
                    .entry(subject.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(subject_obj) = subject_entry else { continue };
                if let Value::Object(preds) = predicates {
                    for (pred, values) in preds {
                        let pred_entry = subject_obj
                            .entry(pred.clone())
                            .or_insert_with(|| Value::Array(Vec::new()));
                        if let (Value::Array(existing), Value::Array(new_values)) = (pred_entry, values) {
                            existing.extend(new_values.iter().cloned());
                        }
                    }
                }
            }
        }
    }
    Value::Object(by_graph)
}

/// Serialize the surviving RDRs' descriptions as a single conjunctive graph
/// in `format`. Returns the serialized body.
pub fn serialize_closure(rdrs: &[Rdr], format: ClosureFormat) -> Result<String> {
    match format {
        ClosureFormat::RdfJson => {
            let value = merge_rdf_json(rdrs);
            Ok(serde_json::to_string(&value)?)
        }
        ClosureFormat::NQuads => {
            let grouped = all_triples(rdrs)?;
            let mut writer = oxttl::NQuadsSerializer::new().serialize_to_write(Vec::new());
            for (graph, triples) in grouped {
                let graph_name = graph_name_for(&graph)?;
                for triple in triples {
                    let quad = Quad::new(triple.subject, triple.predicate, triple.object, graph_name.clone());
                    writer.write_quad(quad.as_ref()).map_err(|e| LsiError::Internal(e.to_string()))?;
                }
            }
            let bytes = writer.finish().map_err(|e| LsiError::Internal(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        ClosureFormat::Turtle => {
            let grouped = all_triples(rdrs)?;
            let mut writer = oxttl::TurtleSerializer::new().serialize_to_write(Vec::new());
            for (_, triples) in grouped {
                for triple in triples {
                    writer.write_triple(triple.as_ref()).map_err(|e| LsiError::Internal(e.to_string()))?;
                }
            }
            let bytes = writer.finish().map_err(|e| LsiError::Internal(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        ClosureFormat::NTriples => {
            let grouped = all_triples(rdrs)?;
            let mut writer = oxttl::NTriplesSerializer::new().serialize_to_write(Vec::new());
            for (_, triples) in grouped {
                for triple in triples {
                    writer.write_triple(triple.as_ref()).map_err(|e| LsiError::Internal(e.to_string()))?;
                }
            }
            let bytes = writer.finish().map_err(|e| LsiError::Internal(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        ClosureFormat::RdfXml => {
            let grouped = all_triples(rdrs)?;
            let mut writer = oxrdfxml::RdfXmlSerializer::new().serialize_to_write(Vec::new());
            for (_, triples) in grouped {
                for triple in triples {
                    writer.write_triple(triple.as_ref()).map_err(|e| LsiError::Internal(e.to_string()))?;
                }
            }
            let bytes = writer.finish().map_err(|e| LsiError::Internal(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_accept_defaults_to_turtle() {
        assert_eq!(negotiate_closure(Some("*/*")).unwrap(), ClosureFormat::Turtle);
        assert_eq!(negotiate_closure(None).unwrap(), ClosureFormat::Turtle);
    }

    #[test]
    fn unacceptable_media_fails() {
        let err = negotiate_closure(Some("application/pdf")).unwrap_err();
        assert!(matches!(err, LsiError::NotAcceptable));
    }

    #[test]
    fn prefers_higher_q_value() {
        let format = negotiate_closure(Some("application/n-quads;q=0.2, text/turtle;q=0.9")).unwrap();
        assert_eq!(format, ClosureFormat::Turtle);
    }
}
