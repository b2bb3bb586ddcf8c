//! Routing request and response types
//!
//! The facade does not compute routes; it builds a [`DirectionsRequest`], hands
//! it to the library and interprets the returned [`RouteStatus`].

use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Origin or destination of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Waypoint {
    /// Coordinates, converted to the library's point type
    Point(LatLng),
    /// Free-form address or place name
    Place(String),
    /// Any other provider value (place id object...), passed through unchanged
    Raw(Value),
}

impl From<LatLng> for Waypoint {
    fn from(point: LatLng) -> Self {
        Waypoint::Point(point)
    }
}

impl From<&str> for Waypoint {
    fn from(place: &str) -> Self {
        Waypoint::Place(place.to_string())
    }
}

impl From<String> for Waypoint {
    fn from(place: String) -> Self {
        Waypoint::Place(place)
    }
}

impl From<Value> for Waypoint {
    /// Objects carrying `latitude`/`longitude` become points, strings become
    /// places, everything else is passed through.
    fn from(value: Value) -> Self {
        if let Some(point) = LatLng::from_value(&value) {
            return Waypoint::Point(point);
        }
        match value {
            Value::String(place) => Waypoint::Place(place),
            other => Waypoint::Raw(other),
        }
    }
}

/// Routing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    Driving,
    Walking,
    Transit,
    #[serde(alias = "CYCLING")]
    Bicycling,
    TwoWheeler,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "DRIVING",
            TravelMode::Walking => "WALKING",
            TravelMode::Transit => "TRANSIT",
            TravelMode::Bicycling => "BICYCLING",
            TravelMode::TwoWheeler => "TWO_WHEELER",
        }
    }
}

impl Default for TravelMode {
    fn default() -> Self {
        TravelMode::Driving
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRIVING" => Ok(TravelMode::Driving),
            "WALKING" => Ok(TravelMode::Walking),
            "TRANSIT" => Ok(TravelMode::Transit),
            "BICYCLING" | "CYCLING" => Ok(TravelMode::Bicycling),
            "TWO_WHEELER" => Ok(TravelMode::TwoWheeler),
            other => Err(format!("unknown travel mode `{other}`")),
        }
    }
}

/// Status reported by the routing service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RouteStatus {
    Ok,
    NotFound,
    ZeroResults,
    MaxWaypointsExceeded,
    MaxRouteLengthExceeded,
    InvalidRequest,
    OverQueryLimit,
    RequestDenied,
    UnknownError,
    /// A code this crate does not know, kept verbatim
    Other(String),
}

impl RouteStatus {
    /// Maps a provider status code; unrecognised codes are kept as `Other`
    pub fn from_wire(code: &str) -> Self {
        match code {
            "OK" => RouteStatus::Ok,
            "NOT_FOUND" => RouteStatus::NotFound,
            "ZERO_RESULTS" => RouteStatus::ZeroResults,
            "MAX_WAYPOINTS_EXCEEDED" => RouteStatus::MaxWaypointsExceeded,
            "MAX_ROUTE_LENGTH_EXCEEDED" => RouteStatus::MaxRouteLengthExceeded,
            "INVALID_REQUEST" => RouteStatus::InvalidRequest,
            "OVER_QUERY_LIMIT" => RouteStatus::OverQueryLimit,
            "REQUEST_DENIED" => RouteStatus::RequestDenied,
            "UNKNOWN_ERROR" => RouteStatus::UnknownError,
            other => RouteStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RouteStatus::Ok => "OK",
            RouteStatus::NotFound => "NOT_FOUND",
            RouteStatus::ZeroResults => "ZERO_RESULTS",
            RouteStatus::MaxWaypointsExceeded => "MAX_WAYPOINTS_EXCEEDED",
            RouteStatus::MaxRouteLengthExceeded => "MAX_ROUTE_LENGTH_EXCEEDED",
            RouteStatus::InvalidRequest => "INVALID_REQUEST",
            RouteStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            RouteStatus::RequestDenied => "REQUEST_DENIED",
            RouteStatus::UnknownError => "UNKNOWN_ERROR",
            RouteStatus::Other(code) => code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RouteStatus::Ok)
    }
}

impl From<String> for RouteStatus {
    fn from(code: String) -> Self {
        RouteStatus::from_wire(&code)
    }
}

impl From<RouteStatus> for String {
    fn from(status: RouteStatus) -> Self {
        match status {
            RouteStatus::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request sent to the routing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsRequest {
    pub origin: Waypoint,
    pub destination: Waypoint,
    pub travel_mode: TravelMode,
}

impl DirectionsRequest {
    pub fn new(
        origin: impl Into<Waypoint>,
        destination: impl Into<Waypoint>,
        travel_mode: TravelMode,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            travel_mode,
        }
    }
}

/// Raw result returned by the routing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectionsResult(Value);

impl DirectionsResult {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Number of alternative routes in the result
    pub fn route_count(&self) -> usize {
        self.0
            .get("routes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

/// What the routing service answered: `(result, status)`
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub status: RouteStatus,
    pub result: Option<DirectionsResult>,
}

impl RouteResponse {
    pub fn ok(result: DirectionsResult) -> Self {
        Self {
            status: RouteStatus::Ok,
            result: Some(result),
        }
    }

    pub fn failed(status: RouteStatus) -> Self {
        Self {
            status,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_waypoint_from_value() {
        assert_eq!(
            Waypoint::from(json!({ "latitude": 48.85, "longitude": 2.35 })),
            Waypoint::Point(LatLng::new(48.85, 2.35))
        );
        assert_eq!(Waypoint::from(json!("Lyon")), Waypoint::Place("Lyon".to_string()));
        assert_eq!(
            Waypoint::from(json!({ "placeId": "ChIJ" })),
            Waypoint::Raw(json!({ "placeId": "ChIJ" }))
        );
    }

    #[test]
    fn test_request_wire_format() {
        let request = DirectionsRequest::new(LatLng::new(48.85, 2.35), "Lyon", TravelMode::Driving);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "origin": { "lat": 48.85, "lng": 2.35 },
                "destination": "Lyon",
                "travelMode": "DRIVING"
            })
        );
    }

    #[test]
    fn test_travel_mode_parsing() {
        assert_eq!("driving".parse::<TravelMode>(), Ok(TravelMode::Driving));
        assert_eq!("CYCLING".parse::<TravelMode>(), Ok(TravelMode::Bicycling));
        assert_eq!("two_wheeler".parse::<TravelMode>(), Ok(TravelMode::TwoWheeler));
        assert!("FLYING".parse::<TravelMode>().is_err());
        assert_eq!(TravelMode::TwoWheeler.to_string(), "TWO_WHEELER");
    }

    #[test]
    fn test_route_status_codes() {
        assert_eq!(RouteStatus::from_wire("ZERO_RESULTS"), RouteStatus::ZeroResults);
        assert_eq!(RouteStatus::from_wire("UNKNOWN_ERROR"), RouteStatus::UnknownError);
        assert!(RouteStatus::Ok.is_ok());

        let status: RouteStatus = serde_json::from_value(json!("NOT_FOUND")).unwrap();
        assert_eq!(status, RouteStatus::NotFound);
        assert_eq!(serde_json::to_value(status).unwrap(), json!("NOT_FOUND"));
    }

    #[test]
    fn test_unrecognised_status_keeps_its_code() {
        let status = RouteStatus::from_wire("SOME_NEW_CODE");
        assert_eq!(status, RouteStatus::Other("SOME_NEW_CODE".to_string()));
        assert_eq!(status.to_string(), "SOME_NEW_CODE");
        assert!(!status.is_ok());
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("SOME_NEW_CODE"));
    }

    #[test]
    fn test_route_count() {
        let result = DirectionsResult::new(json!({ "routes": [{}, {}] }));
        assert_eq!(result.route_count(), 2);
        assert_eq!(DirectionsResult::new(json!({})).route_count(), 0);
    }
}
