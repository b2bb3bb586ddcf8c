use crate::{
    core::geo::{numeric_like, LatLng},
    Result,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied marker options.
///
/// Coordinates are optional at this stage: a marker is only placed once both
/// are present, see [`MarkerOptions::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerOptions {
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Info window body, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickable: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_coordinate<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(numeric_like))
}

impl MarkerOptions {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    /// Parses a loose JSON dictionary; numeric strings are accepted as coordinates
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Position of the marker, if both coordinates are present
    pub fn position(&self) -> Option<LatLng> {
        Some(LatLng::new(self.latitude?, self.longitude?))
    }

    /// Merges these options over the marker defaults.
    ///
    /// Returns `None` when a coordinate is missing.
    pub fn resolve(&self) -> Option<MarkerSpec> {
        let position = self.position()?;
        Some(MarkerSpec {
            position,
            title: self.title.clone(),
            label: self.label.clone(),
            icon: self.icon.clone(),
            draggable: self.draggable.unwrap_or(false),
            clickable: self.clickable.unwrap_or(true),
            optimized: true,
            extra: self.extra.clone(),
        })
    }
}

/// Fully resolved marker handed to the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub position: LatLng,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub draggable: bool,
    pub clickable: bool,
    pub optimized: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
