//! Defaults applied when callers leave map, marker or loader options unset.
//! Keeping them in a single place makes it easier to tweak facade-wide defaults.

/// Default map center (north-west of Paris) as `(lat, lng)`.
pub const DEFAULT_CENTER: (f64, f64) = (48.92340114684859, 2.259291646326453);

/// Initial zoom level of a freshly created map.
pub const DEFAULT_ZOOM: f64 = 9.0;

/// Lowest zoom the user may reach.
pub const DEFAULT_MIN_ZOOM: f64 = 2.0;

/// Endpoint serving the vendor script.
pub const DEFAULT_SCRIPT_URL: &str = "https://maps.googleapis.com/maps/api/js";

/// Script release channel requested when none is configured.
pub const DEFAULT_SCRIPT_VERSION: &str = "weekly";

/// UI language requested when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Geolocation query timeout in milliseconds.
pub const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 5_000;

/// Maximum age of a cached position, in milliseconds (0 = always query).
pub const DEFAULT_GEOLOCATION_MAXIMUM_AGE_MS: u64 = 0;
