//! Prelude module for common mapfacade types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapfacade::prelude::*;`

pub use crate::core::{
    bounds::BoundsAccumulator,
    config::{FacadeConfig, LoaderConfig, MapOptions},
    geo::{LatLng, LatLngBounds},
    handles::{ContainerHandle, DirectionsHandle, InfoWindowHandle, MapHandle, MarkerHandle},
    map::{MapFacade, OptionsUpdate},
};

pub use crate::directions::{DirectionsResult, RouteStatus, TravelMode, Waypoint};

pub use crate::geolocation::{Position, PositionOptions};

pub use crate::layers::marker::MarkerOptions;

pub use crate::loader::{LoadState, ScriptLoader};

pub use crate::traits::{Geolocation, HostDocument, LibraryHandle, MapsLibrary, ScriptHost};

pub use crate::{Error as MapError, Result};

pub use std::rc::Rc;
