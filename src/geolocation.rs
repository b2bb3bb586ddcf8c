//! Device position types
//!
//! The query itself is a pass-through to the platform [`Geolocation`]
//! implementation; the facade adds no retry and no timeout of its own.
//!
//! [`Geolocation`]: crate::traits::Geolocation

use crate::core::{constants, geo::LatLng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Accuracy and freshness requirements of a position query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Milliseconds the platform may spend before failing with a timeout
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    /// Milliseconds a cached position stays acceptable
    #[serde(rename = "maximumAge")]
    pub maximum_age_ms: u64,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: constants::DEFAULT_GEOLOCATION_TIMEOUT_MS,
            maximum_age_ms: constants::DEFAULT_GEOLOCATION_MAXIMUM_AGE_MS,
        }
    }
}

impl PositionOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn maximum_age(&self) -> Duration {
        Duration::from_millis(self.maximum_age_ms)
    }

    pub fn with_high_accuracy(mut self, enable: bool) -> Self {
        self.enable_high_accuracy = enable;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_maximum_age(mut self, maximum_age: Duration) -> Self {
        self.maximum_age_ms = maximum_age.as_millis() as u64;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub altitude_accuracy: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

/// A position fix as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: Coordinates,
    /// Milliseconds since the Unix epoch
    pub timestamp: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: f64) -> Self {
        Self {
            coords: Coordinates {
                latitude,
                longitude,
                accuracy,
                altitude: None,
                altitude_accuracy: None,
                heading: None,
                speed: None,
            },
            timestamp,
        }
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.coords.latitude, self.coords.longitude)
    }
}

/// Platform error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeolocationErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl GeolocationErrorCode {
    /// Maps the numeric code used by the platform API
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationErrorCode::PermissionDenied,
            3 => GeolocationErrorCode::Timeout,
            _ => GeolocationErrorCode::PositionUnavailable,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            GeolocationErrorCode::PermissionDenied => 1,
            GeolocationErrorCode::PositionUnavailable => 2,
            GeolocationErrorCode::Timeout => 3,
        }
    }
}

impl fmt::Display for GeolocationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeolocationErrorCode::PermissionDenied => "PERMISSION_DENIED",
            GeolocationErrorCode::PositionUnavailable => "POSITION_UNAVAILABLE",
            GeolocationErrorCode::Timeout => "TIMEOUT",
        };
        f.write_str(name)
    }
}

/// Error reported by the platform, passed through unchanged
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("geolocation failed ({code}): {message}")]
pub struct GeolocationError {
    pub code: GeolocationErrorCode,
    pub message: String,
}

impl GeolocationError {
    pub fn new(code: GeolocationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
