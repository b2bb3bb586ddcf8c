//! Narrow contracts towards the outside world
//!
//! The facade never touches a global: the mapping library, the host document,
//! the script host and the geolocation source are all injected through these
//! traits. Everything runs on a single cooperative thread, so the traits are
//! `?Send` and implementations are shared with `Rc`.

use crate::{
    core::{
        config::MapOptions,
        geo::{LatLng, LatLngBounds},
        handles::{ContainerHandle, DirectionsHandle, InfoWindowHandle, MapHandle, MarkerHandle},
    },
    directions::{DirectionsRequest, DirectionsResult, RouteResponse},
    geolocation::{GeolocationError, Position, PositionOptions},
    layers::marker::MarkerSpec,
    loader::PageLoad,
    Result,
};
use async_trait::async_trait;
use std::rc::Rc;
use url::Url;

/// Event callback registered with the library
pub type Listener = Box<dyn FnMut()>;

/// Shared reference to a loaded mapping library
pub type LibraryHandle = Rc<dyn MapsLibrary>;

/// Primitives the facade needs from the mapping library
#[async_trait(?Send)]
pub trait MapsLibrary {
    /// Construct a map bound to a container
    fn create_map(&self, container: ContainerHandle, options: &MapOptions) -> Result<MapHandle>;

    /// Push a full set of options to an existing map
    fn set_map_options(&self, map: MapHandle, options: &MapOptions) -> Result<()>;

    /// Construct a marker and attach it to `map`
    fn create_marker(&self, map: MapHandle, marker: &MarkerSpec) -> Result<MarkerHandle>;

    /// Current position of a marker, `None` for unknown handles
    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng>;

    /// Remove a marker from whatever map it is attached to
    fn detach_marker(&self, marker: MarkerHandle);

    /// Forget a marker and drop its listeners; the handle is dead afterwards
    fn release_marker(&self, marker: MarkerHandle);

    fn create_info_window(&self, content: &str) -> Result<InfoWindowHandle>;

    fn open_info_window(&self, window: InfoWindowHandle, map: MapHandle, anchor: MarkerHandle);

    fn close_info_window(&self, window: InfoWindowHandle);

    /// Forget an info window and drop its listeners
    fn release_info_window(&self, window: InfoWindowHandle);

    /// Call `listener` every time the user clicks `marker`
    fn on_marker_click(&self, marker: MarkerHandle, listener: Listener);

    /// Call `listener` when the user closes `window` with its close button
    fn on_info_window_close(&self, window: InfoWindowHandle, listener: Listener);

    /// Move the viewport so that `bounds` is fully visible
    fn fit_bounds(&self, map: MapHandle, bounds: &LatLngBounds);

    /// Construct a directions service together with its renderer
    fn create_directions(&self) -> Result<DirectionsHandle>;

    /// Attach the renderer to `map`, or detach it with `None`
    fn attach_directions(&self, directions: DirectionsHandle, map: Option<MapHandle>);

    fn render_route(&self, directions: DirectionsHandle, result: &DirectionsResult);

    /// Issue a routing request; the response carries the provider status
    async fn route(
        &self,
        directions: DirectionsHandle,
        request: &DirectionsRequest,
    ) -> Result<RouteResponse>;
}

/// Where the vendor script gets injected and where its entry point lives
#[async_trait(?Send)]
pub trait ScriptHost {
    /// The library, if its entry point is already callable
    fn library(&self) -> Option<LibraryHandle>;

    /// Injection record shared by every loader working on this page
    fn page_load(&self) -> &PageLoad;

    /// Inject a script tag for `url` and wait for its load event
    async fn inject_script(&self, url: &Url) -> std::result::Result<(), String>;
}

/// Element lookup in the host document
pub trait HostDocument {
    fn query_selector(&self, selector: &str) -> Option<ContainerHandle>;
}

/// Platform position source
#[async_trait(?Send)]
pub trait Geolocation {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> std::result::Result<Position, GeolocationError>;
}
