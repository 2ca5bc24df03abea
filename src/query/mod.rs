//! The query pipeline (§4.4, §4.6): spatial operand construction, lazy
//! filter stages layered over the façade's coarse iterator, and closure
//! serialization.

mod closure;
mod spatial;

pub use closure::{negotiate_closure, serialize_closure, ClosureFormat};
pub use spatial::{parse_spatial_operand, SpatialOperand};

use crate::error::{LsiError, Result};
use crate::model::Rdr;
use crate::rdf_json;
use aho_corasick::AhoCorasickBuilder;
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{NamedNode, Subject, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Intersects,
    Contains,
    Nearest,
}

impl Predicate {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "intersects" => Ok(Predicate::Intersects),
            "contains" => Ok(Predicate::Contains),
            "nearest" => Ok(Predicate::Nearest),
            other => Err(LsiError::BadRequest(format!(
                "predicate must be one of intersects, contains, nearest (got '{other}')"
            ))),
        }
    }
}

fn subject_for_uri(uri: &str) -> Result<Subject> {
    if let Some(id) = uri.strip_prefix("_:") {
        Ok(Subject::BlankNode(
            oxrdf::BlankNode::new(id).map_err(|e| LsiError::Internal(e.to_string()))?,
        ))
    } else {
        Ok(Subject::NamedNode(
            NamedNode::new(uri).map_err(|e| LsiError::Internal(e.to_string()))?,
        ))
    }
}

/// A string-like literal per §4.6 stage 4: datatype absent, `xsd:string`,
/// or `rdf:langString`.
fn is_string_like(term: &Term) -> Option<&str> {
    match term {
        Term::Literal(l) => {
            let datatype = l.datatype();
            if l.language().is_some() || datatype == xsd::STRING || datatype == rdf::LANG_STRING {
                Some(l.value())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Apply the type/text filters, trim, offset and limit stages (§4.6) over a
/// coarse iterator already produced by the façade. `limit` is capped at
/// 1000 regardless of the caller's request.
pub fn apply<'a>(
    coarse: impl Iterator<Item = Rdr> + 'a,
    types: &[String],
    text: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<Vec<Rdr>> {
    let limit = limit.min(1000);
    let need_graph = !types.is_empty() || text.is_some();

    let type_subjects: Vec<NamedNode> = types
        .iter()
        .map(|t| NamedNode::new(t.clone()).map_err(|e| LsiError::BadRequest(format!("invalid type IRI '{t}': {e}"))))
        .collect::<Result<_>>()?;

    let matcher = match text {
        Some(query) => Some(
            AhoCorasickBuilder::new()
                .ascii_case_insensitive(true)
                .build([query])
                .map_err(|e| LsiError::Internal(e.to_string()))?,
        ),
        None => None,
    };

    let filtered: Box<dyn Iterator<Item = Rdr> + 'a> = if need_graph {
        Box::new(coarse.filter(move |rdr| {
            let triples = match rdf_json::rdf_json_to_triples(&rdr.description_json) {
                Ok(triples) => triples,
                Err(_) => return false,
            };

            if !type_subjects.is_empty() {
                let Ok(subject) = subject_for_uri(&rdr.uri) else { return false };
                let has_type = triples.iter().any(|t| {
                    t.subject == subject
                        && t.predicate == rdf::TYPE
                        && matches!(&t.object, Term::NamedNode(n) if type_subjects.contains(n))
                });
                if !has_type {
                    return false;
                }
            }

            if let Some(ac) = &matcher {
                let has_text = triples.iter().any(|t| {
                    is_string_like(&t.object)
                        .map(|value| ac.is_match(value))
                        .unwrap_or(false)
                });
                if !has_text {
                    return false;
                }
            }

            true
        }))
    } else {
        Box::new(coarse)
    };

    Ok(filtered.skip(offset).take(limit).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Envelope;
    use serde_json::json;

    fn rdr(uri: &str, type_iri: Option<&str>, text: Option<&str>) -> Rdr {
        let mut obj = serde_json::Map::new();
        let mut preds = serde_json::Map::new();
        if let Some(t) = type_iri {
            preds.insert(
                rdf::TYPE.as_str().to_string(),
                json!([{"type": "uri", "value": t}]),
            );
        }
        if let Some(text) = text {
            preds.insert(
                "http://www.w3.org/2000/01/rdf-schema#label".to_string(),
                json!([{"type": "literal", "value": text}]),
            );
        }
        obj.insert(uri.to_string(), serde_json::Value::Object(preds));

        Rdr {
            uri: uri.to_string(),
            graph: "http://example.org/g".to_string(),
            geom_wkt: "POINT(0 0)".to_string(),
            envelope: Envelope { minx: 0.0, maxx: 0.0, miny: 0.0, maxy: 0.0 },
            description_json: serde_json::Value::Object(obj),
        }
    }

    #[test]
    fn type_filter_retains_matching_only() {
        let park = rdr("http://example.org/park", Some("http://example.org/Park"), None);
        let lake = rdr("http://example.org/lake", Some("http://example.org/Lake"), None);
        let results = apply(
            vec![park.clone(), lake].into_iter(),
            &["http://example.org/Park".to_string()],
            None,
            0,
            10,
        )
        .unwrap();
        assert_eq!(results, vec![park]);
    }

    #[test]
    fn text_filter_is_case_insensitive() {
        let atl = rdr("http://example.org/a", None, Some("Downtown Atlanta"));
        let den = rdr("http://example.org/b", None, Some("Downtown Denver"));
        let results = apply(vec![atl.clone(), den].into_iter(), &[], Some("atlanta"), 0, 10).unwrap();
        assert_eq!(results, vec![atl]);
    }

    #[test]
    fn limit_is_capped_at_1000() {
        let rows: Vec<Rdr> = (0..5).map(|i| rdr(&format!("http://example.org/{i}"), None, None)).collect();
        let results = apply(rows.into_iter(), &[], None, 0, 5000).unwrap();
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn offset_beyond_results_is_empty() {
        let rows: Vec<Rdr> = (0..3).map(|i| rdr(&format!("http://example.org/{i}"), None, None)).collect();
        let results = apply(rows.into_iter(), &[], None, 100, 10).unwrap();
        assert!(results.is_empty());
    }
}
