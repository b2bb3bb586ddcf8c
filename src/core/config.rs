//! Configuration for the script loader, the facade and the map itself
//!
//! Every struct here has a `Default` impl holding the documented defaults and
//! deserializes with serde, so callers can hand over partial JSON dictionaries
//! that get merged over those defaults.

use crate::{
    core::{
        constants,
        geo::{numeric_like, LatLng},
    },
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

/// Shallow-merges `patch` over `base`, key by key.
///
/// A `null` patch leaves `base` untouched; any other non-object patch is
/// rejected.
pub fn merge_json(base: &mut Value, patch: &Value) -> Result<()> {
    let patch = match patch {
        Value::Null => return Ok(()),
        Value::Object(patch) => patch,
        other => {
            return Err(MapError::InvalidOptions(format!(
                "expected an options object, got `{other}`"
            )))
        }
    };

    match base {
        Value::Object(base) => {
            for (key, value) in patch {
                base.insert(key.clone(), value.clone());
            }
            Ok(())
        }
        _ => {
            *base = Value::Object(patch.clone());
            Ok(())
        }
    }
}

fn center_shorthand(patch: &Value) -> Value {
    let mut patch = patch.clone();
    if let Value::Object(fields) = &mut patch {
        let lat = fields.get("latitude").and_then(numeric_like);
        let lng = fields.get("longitude").and_then(numeric_like);
        if let (Some(lat), Some(lng)) = (lat, lng) {
            fields.remove("latitude");
            fields.remove("longitude");
            fields.insert("center".to_string(), json!({ "lat": lat, "lng": lng }));
        }
    }
    patch
}

/// Options forwarded to the library when the map is constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    #[serde(rename = "disableDefaultUI")]
    pub disable_default_ui: bool,
    /// Keys the facade does not know about, forwarded untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for MapOptions {
    fn default() -> Self {
        let (lat, lng) = constants::DEFAULT_CENTER;
        Self {
            center: LatLng::new(lat, lng),
            zoom: constants::DEFAULT_ZOOM,
            min_zoom: constants::DEFAULT_MIN_ZOOM,
            disable_default_ui: false,
            extra: Map::new(),
        }
    }
}

impl MapOptions {
    /// Returns a copy of these options with `patch` merged over them.
    ///
    /// Top-level `latitude`/`longitude` keys are shorthand for `center`.
    pub fn merged(&self, patch: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        merge_json(&mut base, &center_shorthand(patch))?;
        serde_json::from_value(base).map_err(|e| MapError::InvalidOptions(e.to_string()))
    }

    /// Defaults with `patch` merged over them
    pub fn from_patch(patch: &Value) -> Result<Self> {
        Self::default().merged(patch)
    }
}

/// Facade-level switches that are not forwarded to the library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacadeConfig {
    /// Track a bounds accumulator and refit the viewport on every marker add
    pub enable_bounds: bool,
}

impl FacadeConfig {
    pub fn with_bounds(mut self, enable: bool) -> Self {
        self.enable_bounds = enable;
        self
    }
}

/// Parameters of the vendor script request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    pub api_key: String,
    pub language: String,
    pub version: String,
    pub region: Option<String>,
    pub libraries: Vec<String>,
    pub base_url: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: constants::DEFAULT_LANGUAGE.to_string(),
            version: constants::DEFAULT_SCRIPT_VERSION.to_string(),
            region: None,
            libraries: Vec::new(),
            base_url: constants::DEFAULT_SCRIPT_URL.to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_libraries<I, S>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries = libraries.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the script URL with every parameter query-encoded
    pub fn script_url(&self) -> Result<Url> {
        if self.api_key.trim().is_empty() {
            return Err(MapError::InvalidConfig("api key is empty".to_string()));
        }

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            MapError::InvalidConfig(format!("invalid script url `{}`: {}", self.base_url, e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.api_key);
            query.append_pair("v", &self.version);
            query.append_pair("language", &self.language);
            if let Some(region) = &self.region {
                query.append_pair("region", region);
            }
            if !self.libraries.is_empty() {
                query.append_pair("libraries", &self.libraries.join(","));
            }
        }

        Ok(url)
    }
}
