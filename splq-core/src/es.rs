//! Elasticsearch-style query DSL output types
//!
//! These serialize to exactly the wire shape the search backend expects:
//!
//! ```json
//! {
//!   "query": { "query_string": { "query": "...", "default_field": "_message" } },
//!   "from": 0,
//!   "size": 10,
//!   "_source": [],
//!   "aggs": { "group1": { "terms": { "field": "group1", "size": 10000 }, "aggs": { ... } } },
//!   "sort": [ { "field": { "order": "desc", "unmapped_type": "string" } } ],
//!   "script_fields": { "name": { "script": { "lang": "painless", "source": "..." } } }
//! }
//! ```
//!
//! `sort`, `aggs` and `script_fields` are map-shaped on the wire, so their
//! entries carry hand-written `Serialize` impls.

use crate::ast::SortOrder;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// The `query_string` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryString {
    pub query: String,
    pub default_field: String,
}

/// The top-level `query` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryClause {
    pub query_string: QueryString,
}

/// One entry of the `sort` array: `{ field: { order, unmapped_type } }`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortEntry {
    pub field: String,
    pub order: SortOrder,
    pub unmapped_type: &'static str,
}

impl Serialize for SortEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Params<'a> {
            order: &'a str,
            unmapped_type: &'a str,
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.field,
            &Params {
                order: self.order.as_str(),
                unmapped_type: self.unmapped_type,
            },
        )?;
        map.end()
    }
}

/// Aggregation kinds the backend understands. `Terms` buckets values;
/// the rest are direct metric aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggrKind {
    Terms,
    Max,
    Min,
    Sum,
    Avg,
}

impl AggrKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggrKind::Terms => "terms",
            AggrKind::Max => "max",
            AggrKind::Min => "min",
            AggrKind::Sum => "sum",
            AggrKind::Avg => "avg",
        }
    }
}

/// Body of one aggregation: the target field plus the bucket cap for
/// `terms` aggregations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggrTerm {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A single-keyed, possibly nested aggregation:
/// `{ key: { <kind>: { field, size? }, aggs?: { ... } } }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub key: String,
    pub kind: AggrKind,
    pub term: AggrTerm,
    pub aggs: Option<Box<Aggregation>>,
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Body<'a>(&'a Aggregation);

        impl Serialize for Body<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let len = if self.0.aggs.is_some() { 2 } else { 1 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry(self.0.kind.as_str(), &self.0.term)?;
                if let Some(child) = &self.0.aggs {
                    map.serialize_entry("aggs", child.as_ref())?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &Body(self))?;
        map.end()
    }
}

/// A computed-field script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub lang: &'static str,
    pub source: String,
}

/// One `script_fields` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptField {
    pub script: Script,
}

/// The complete query DSL document sent to the search backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsQuery {
    pub query: QueryClause,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Aggregation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<SortEntry>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_fields: Option<BTreeMap<String, ScriptField>>,
}
