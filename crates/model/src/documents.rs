use serde::{Deserialize, Serialize};

/// A `[longitude, latitude]` pair.
pub type Point = [f64; 2];

/// GeoJSON-like polygon attached to generated documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Point>,
}

impl Polygon {
    pub const KIND: &'static str = "polygon";

    pub fn new(coordinates: Vec<Point>) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            coordinates,
        }
    }
}

/// Generic document written by the batch import workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    #[serde(rename = "_key")]
    pub key: String,
    pub sha: String,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<Polygon>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub words: String,
}

/// Edge between two `pubmed` users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "_from")]
    pub from: String,
    #[serde(rename = "_to")]
    pub to: String,
    #[serde(rename = "fromUid")]
    pub from_uid: u32,
    #[serde(rename = "toUid")]
    pub to_uid: u32,
    pub score: u32,
    pub last_modified: String,
}

/// Vertex of the tenant graph (`instances`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub payload: String,
}

/// Edge of the tenant graph (`steps`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "_from")]
    pub from: String,
    #[serde(rename = "_to")]
    pub to: String,
    pub payload: String,
}

/// Vertex of the connected-components smart graph (`vertices`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "smartPart")]
    pub smart_part: String,
    pub payload: String,
}

/// Edge of the connected-components smart graph (`links`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "_from")]
    pub from: String,
    #[serde(rename = "_to")]
    pub to: String,
    pub payload: String,
}

/// Single-field document used when filling a collection to a target size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleField {
    #[serde(rename = "a", default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}
