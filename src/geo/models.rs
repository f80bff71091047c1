use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Payload returned by the geodata backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoPayload {
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

/// Geometry kind of a raw element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Node,
    Way,
    Relation,
    #[serde(other)]
    Other,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Node => "node",
            GeometryKind::Way => "way",
            GeometryKind::Relation => "relation",
            GeometryKind::Other => "other",
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, GeometryKind::Way | GeometryKind::Relation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Center {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// One map feature as sent by the backend, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// The subset of source tags an attraction keeps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttractionTags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tourism: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attraction: Option<String>,
    /// `website`, falling back to `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Knowledge-base (Wikidata) identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<String>,
    /// Encyclopedia reference in `lang:Title` form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr_street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr_housenumber: Option<String>,
}

/// Canonical point of interest handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attraction {
    /// `{geometryKind}/{numericId}`
    pub id: String,
    pub name: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub tags: AttractionTags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}
