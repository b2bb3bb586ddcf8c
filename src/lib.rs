//! # mapfacade
//!
//! A lazy-loading facade over a browser mapping library.
//!
//! The crate is split in two cooperating pieces: a [`ScriptLoader`] that makes
//! sure the vendor script is injected at most once, and a [`MapFacade`] that
//! owns the map, its markers, the open info window, a bounds accumulator and a
//! directions pair. The library itself is reached through the traits in
//! [`traits`], so the same facade runs against the browser (`wasm` feature) or
//! against the in-memory [`provider::headless`] implementation.

pub mod core;
pub mod directions;
pub mod geolocation;
pub mod layers;
pub mod loader;
pub mod prelude;
pub mod provider;
pub mod traits;
pub mod ui;

pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::BoundsAccumulator,
    config::{FacadeConfig, LoaderConfig, MapOptions},
    geo::{LatLng, LatLngBounds},
    handles::{ContainerHandle, DirectionsHandle, InfoWindowHandle, MapHandle, MarkerHandle},
    map::{MapFacade, OptionsUpdate},
};

pub use directions::{DirectionsRequest, DirectionsResult, RouteResponse, RouteStatus, TravelMode, Waypoint};

pub use geolocation::{Coordinates, GeolocationError, GeolocationErrorCode, Position, PositionOptions};

pub use layers::marker::{MarkerOptions, MarkerSpec};

pub use loader::{LoadState, PageLoad, ScriptLoader};

pub use traits::{Geolocation, HostDocument, LibraryHandle, Listener, MapsLibrary, ScriptHost};

pub use ui::info_window::InfoWindowSlot;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Raised when the vendor script cannot be fetched or does not expose its
/// entry point once loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load mapping library from {url}: {reason}")]
pub struct ScriptLoadError {
    pub url: String,
    pub reason: String,
}

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("map is already initialized")]
    AlreadyInitialized,

    #[error("map is not initialized")]
    NotInitialized,

    #[error("no container matches selector `{0}`")]
    ContainerNotFound(String),

    #[error(transparent)]
    ScriptLoad(#[from] ScriptLoadError),

    #[error("no route found: {status}")]
    RouteNotFound { status: RouteStatus },

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    #[error("no geolocation source configured")]
    GeolocationUnavailable,

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = MapError;
