//! The feature abstraction consumed by feature-dependent operators.

use mapstyle_types::{Object, Value};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeometryType {
    #[default]
    Unknown,
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Unknown => "Unknown",
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        }
    }

    /// Maps a GeoJSON geometry type name; multi-geometries collapse to their base kind.
    pub fn from_geojson(name: &str) -> Self {
        match name {
            "Point" | "MultiPoint" => GeometryType::Point,
            "LineString" | "MultiLineString" => GeometryType::LineString,
            "Polygon" | "MultiPolygon" => GeometryType::Polygon,
            _ => GeometryType::Unknown,
        }
    }
}

/// A map feature as seen by expressions.
///
/// Implemented by the host over whatever tile or document representation it
/// uses; the engine only reads through this trait.
pub trait Feature {
    /// The property named `key`, if present.
    fn property(&self, key: &str) -> Option<Value>;

    /// All properties, in source order.
    fn properties(&self) -> Object;

    /// The feature id: a number or a string.
    fn id(&self) -> Option<Value>;

    fn geometry_type(&self) -> GeometryType;
}

/// A GeoJSON `Feature` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonFeature {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable_properties")]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default, rename = "geometry", deserialize_with = "geometry_kind")]
    pub geometry_type: GeometryType,
}

#[derive(Deserialize)]
struct GeometryHeader {
    #[serde(rename = "type")]
    kind: String,
}

fn nullable_properties<'de, D>(
    deserializer: D,
) -> Result<serde_json::Map<String, serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

fn geometry_kind<'de, D>(deserializer: D) -> Result<GeometryType, D::Error>
where
    D: Deserializer<'de>,
{
    let header: Option<GeometryHeader> = Option::deserialize(deserializer)?;
    Ok(header.map_or(GeometryType::Unknown, |h| GeometryType::from_geojson(&h.kind)))
}

impl JsonFeature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_id(mut self, id: serde_json::Value) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_geometry_type(mut self, geometry_type: GeometryType) -> Self {
        self.geometry_type = geometry_type;
        self
    }
}

impl Feature for JsonFeature {
    fn property(&self, key: &str) -> Option<Value> {
        self.properties.get(key).map(Value::from_json)
    }

    fn properties(&self) -> Object {
        self.properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    }

    fn id(&self) -> Option<Value> {
        match &self.id {
            Some(serde_json::Value::Number(n)) => n.as_f64().map(Value::Number),
            Some(serde_json::Value::String(s)) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }
}
