//! RDF/JSON: subject → predicate → `[{value, type, datatype?, lang?}]`.
//!
//! This is the serialization the upstream used for each payload row's
//! `json_description` (via `rdflib`'s `rdf-json` plugin) and for the
//! `application/json` closure-query format. Neither `oxrdf` nor `oxttl`
//! ship it, so it's hand-rolled here, matching this crate's own `Rdr`
//! struct rather than imitating `rdflib`'s internals.

use crate::error::{LsiError, Result};
use oxrdf::{BlankNode, Literal, NamedNode, Subject, Term, Triple};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn term_to_json(term: &Term) -> Value {
    match term {
        Term::NamedNode(n) => serde_json::json!({"type": "uri", "value": n.as_str()}),
        Term::BlankNode(b) => serde_json::json!({"type": "bnode", "value": b.as_str()}),
        Term::Literal(l) => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), Value::String("literal".to_string()));
            obj.insert("value".to_string(), Value::String(l.value().to_string()));
            if let Some(lang) = l.language() {
                obj.insert("lang".to_string(), Value::String(lang.to_string()));
            } else if l.datatype() != oxrdf::vocab::xsd::STRING {
                obj.insert(
                    "datatype".to_string(),
                    Value::String(l.datatype().as_str().to_string()),
                );
            }
            Value::Object(obj)
        }
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}

fn subject_key(subject: &Subject) -> String {
    match subject {
        Subject::NamedNode(n) => n.as_str().to_string(),
        Subject::BlankNode(b) => format!("_:{}", b.as_str()),
        #[allow(unreachable_patterns)]
        _ => String::new(),
    }
}

/// Serialize a flat triple list into an RDF/JSON object, grouping by
/// subject then predicate.
pub fn triples_to_rdf_json(triples: &[Triple]) -> Value {
    // BTreeMap for deterministic key order; not required by the format but
    // keeps payload bytes stable across re-ingestion of the same graph.
    let mut by_subject: BTreeMap<String, BTreeMap<String, Vec<Value>>> = BTreeMap::new();
    for triple in triples {
        let skey = subject_key(&triple.subject);
        let pkey = triple.predicate.as_str().to_string();
        by_subject
            .entry(skey)
            .or_default()
            .entry(pkey)
            .or_default()
            .push(term_to_json(&triple.object));
    }

    let mut root = Map::new();
    for (subject, predicates) in by_subject {
        let mut pred_obj = Map::new();
        for (predicate, values) in predicates {
            pred_obj.insert(predicate, Value::Array(values));
        }
        root.insert(subject, Value::Object(pred_obj));
    }
    Value::Object(root)
}

fn json_to_term(value: &Value) -> Result<Term> {
    let obj = value
        .as_object()
        .ok_or_else(|| LsiError::Rdf("RDF/JSON object value must be an object".to_string()))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| LsiError::Rdf("RDF/JSON object value missing 'type'".to_string()))?;
    let text = obj
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| LsiError::Rdf("RDF/JSON object value missing 'value'".to_string()))?;
    match kind {
        "uri" => Ok(Term::NamedNode(
            NamedNode::new(text).map_err(|e| LsiError::Rdf(e.to_string()))?,
        )),
        "bnode" => Ok(Term::BlankNode(BlankNode::new(text).map_err(|e| LsiError::Rdf(e.to_string()))?)),
        "literal" => {
            if let Some(lang) = obj.get("lang").and_then(Value::as_str) {
                Ok(Term::Literal(
                    Literal::new_language_tagged_literal(text, lang)
                        .map_err(|e| LsiError::Rdf(e.to_string()))?,
                ))
            } else if let Some(datatype) = obj.get("datatype").and_then(Value::as_str) {
                let datatype = NamedNode::new(datatype).map_err(|e| LsiError::Rdf(e.to_string()))?;
                Ok(Term::Literal(Literal::new_typed_literal(text, datatype)))
            } else {
                Ok(Term::Literal(Literal::new_simple_literal(text)))
            }
        }
        other => Err(LsiError::Rdf(format!("unknown RDF/JSON term type '{other}'"))),
    }
}

fn json_to_subject(key: &str) -> Result<Subject> {
    if let Some(id) = key.strip_prefix("_:") {
        Ok(Subject::BlankNode(
            BlankNode::new(id).map_err(|e| LsiError::Rdf(e.to_string()))?,
        ))
    } else {
        Ok(Subject::NamedNode(
            NamedNode::new(key).map_err(|e| LsiError::Rdf(e.to_string()))?,
        ))
    }
}

/// Parse an RDF/JSON object back into a flat triple list.
pub fn rdf_json_to_triples(value: &Value) -> Result<Vec<Triple>> {
    let root = value
        .as_object()
        .ok_or_else(|| LsiError::Rdf("RDF/JSON document must be an object".to_string()))?;
    let mut triples = Vec::new();
    for (subject_key, predicates) in root {
        let subject = json_to_subject(subject_key)?;
        let predicates = predicates
            .as_object()
            .ok_or_else(|| LsiError::Rdf("RDF/JSON subject value must be an object".to_string()))?;
        for (predicate, values) in predicates {
            let predicate = NamedNode::new(predicate).map_err(|e| LsiError::Rdf(e.to_string()))?;
            let values = values
                .as_array()
                .ok_or_else(|| LsiError::Rdf("RDF/JSON predicate value must be an array".to_string()))?;
            for value in values {
                let object = json_to_term(value)?;
                triples.push(Triple::new(subject.clone(), predicate.clone(), object));
            }
        }
    }
    Ok(triples)
}
