use crate::{
    core::{
        bounds::BoundsAccumulator,
        config::{FacadeConfig, MapOptions},
        geo::LatLng,
        handles::{DirectionsHandle, InfoWindowHandle, MapHandle, MarkerHandle},
    },
    directions::{DirectionsRequest, DirectionsResult, TravelMode, Waypoint},
    geolocation::{Position, PositionOptions},
    layers::marker::MarkerOptions,
    loader::ScriptLoader,
    traits::{Geolocation, HostDocument, LibraryHandle},
    ui::info_window::InfoWindowSlot,
    MapError, Result,
};
use fxhash::FxHashMap;
use once_cell::unsync::OnceCell;
use serde_json::{json, Value};
use std::rc::Rc;

/// Outcome of a lenient option update
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum OptionsUpdate {
    Applied,
    /// The update was skipped; the map keeps its previous options
    Degraded(String),
}

impl OptionsUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, OptionsUpdate::Applied)
    }
}

/// Stateful wrapper around one map of the mapping library.
///
/// The facade owns at most one map (set exactly once by [`initialize`]), the
/// insertion-ordered list of markers it placed, the currently open info
/// window, an optional bounds accumulator and a lazily created directions
/// pair. Every operation forwards to the library.
///
/// [`initialize`]: MapFacade::initialize
pub struct MapFacade {
    library: LibraryHandle,
    document: Rc<dyn HostDocument>,
    geolocation: Option<Rc<dyn Geolocation>>,
    map: OnceCell<MapHandle>,
    options: MapOptions,
    config: FacadeConfig,
    markers: Vec<MarkerHandle>,
    marker_windows: FxHashMap<MarkerHandle, InfoWindowHandle>,
    info_window: InfoWindowSlot,
    bounds: Option<BoundsAccumulator>,
    directions: OnceCell<DirectionsHandle>,
}

impl MapFacade {
    /// Creates a facade over an already loaded library
    pub fn new(library: LibraryHandle, document: Rc<dyn HostDocument>) -> Self {
        Self {
            library,
            document,
            geolocation: None,
            map: OnceCell::new(),
            options: MapOptions::default(),
            config: FacadeConfig::default(),
            markers: Vec::new(),
            marker_windows: FxHashMap::default(),
            info_window: InfoWindowSlot::new(),
            bounds: None,
            directions: OnceCell::new(),
        }
    }

    /// Waits for `loader` to make the library available, then creates a facade
    pub async fn load(loader: &ScriptLoader, document: Rc<dyn HostDocument>) -> Result<Self> {
        let library = loader.load().await?;
        Ok(Self::new(library, document))
    }

    pub fn with_geolocation(mut self, geolocation: Rc<dyn Geolocation>) -> Self {
        self.geolocation = Some(geolocation);
        self
    }

    /// Creates the map inside the element matching `selector`.
    ///
    /// `map_options` is a JSON object merged over [`MapOptions::default`];
    /// `null` keeps the defaults. Fails with `AlreadyInitialized` on a second
    /// call, whatever the selector.
    pub fn initialize(
        &mut self,
        selector: &str,
        map_options: &Value,
        config: FacadeConfig,
    ) -> Result<MapHandle> {
        if self.map.get().is_some() {
            return Err(MapError::AlreadyInitialized);
        }

        let container = self
            .document
            .query_selector(selector)
            .ok_or_else(|| MapError::ContainerNotFound(selector.to_string()))?;

        let options = MapOptions::from_patch(map_options)?;
        let map = self.library.create_map(container, &options)?;
        self.map
            .set(map)
            .map_err(|_| MapError::AlreadyInitialized)?;

        if config.enable_bounds {
            self.bounds = Some(BoundsAccumulator::new());
        }
        self.options = options;
        self.config = config;

        log::info!("map {} initialized in `{}`", map, selector);
        Ok(map)
    }

    pub fn is_initialized(&self) -> bool {
        self.map.get().is_some()
    }

    pub fn map(&self) -> Option<MapHandle> {
        self.map.get().copied()
    }

    fn require_map(&self) -> Result<MapHandle> {
        self.map().ok_or(MapError::NotInitialized)
    }

    pub fn library(&self) -> &LibraryHandle {
        &self.library
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    /// Current merged map options
    pub fn map_options(&self) -> &MapOptions {
        &self.options
    }

    /// Merges `patch` over the current options and pushes them to the map.
    ///
    /// Never fails: anything that goes wrong is logged and reported as
    /// [`OptionsUpdate::Degraded`], and the previous options stay in place.
    pub fn set_map_options(&mut self, patch: &Value) -> OptionsUpdate {
        let map = match self.require_map() {
            Ok(map) => map,
            Err(e) => return self.degraded(e),
        };

        let options = match self.options.merged(patch) {
            Ok(options) => options,
            Err(e) => return self.degraded(e),
        };

        if let Err(e) = self.library.set_map_options(map, &options) {
            return self.degraded(e);
        }

        self.options = options;
        OptionsUpdate::Applied
    }

    fn degraded(&self, error: MapError) -> OptionsUpdate {
        log::warn!("could not update map options: {}", error);
        OptionsUpdate::Degraded(error.to_string())
    }

    pub fn set_center(&mut self, center: LatLng) -> OptionsUpdate {
        self.set_map_options(&json!({ "center": center }))
    }

    pub fn set_zoom(&mut self, zoom: f64) -> OptionsUpdate {
        self.set_map_options(&json!({ "zoom": zoom }))
    }

    /// Places a marker on the map.
    ///
    /// Missing or non-numeric coordinates make this a no-op returning
    /// `Ok(None)`. With `enable_info_window`, a click on the marker opens an
    /// info window showing `options.content` (if there is any content). When
    /// bounds tracking is on, the accumulator is extended and the viewport
    /// refit on every call.
    pub fn add_marker(
        &mut self,
        options: MarkerOptions,
        enable_info_window: bool,
    ) -> Result<Option<MarkerHandle>> {
        let Some(map) = self.map() else {
            log::warn!("ignoring marker added before the map was initialized");
            return Ok(None);
        };

        let Some(spec) = options.resolve() else {
            log::warn!(
                "ignoring marker without numeric latitude/longitude: {:?}, {:?}",
                options.latitude,
                options.longitude
            );
            return Ok(None);
        };

        let window = if enable_info_window {
            self.create_info_window(&options)?
        } else {
            None
        };

        let marker = match self.library.create_marker(map, &spec) {
            Ok(marker) => marker,
            Err(e) => {
                if let Some(window) = window {
                    self.library.release_info_window(window);
                }
                return Err(e);
            }
        };
        self.markers.push(marker);

        if let Some(window) = window {
            self.wire_info_window(map, marker, window);
            self.marker_windows.insert(marker, window);
        }

        if self.config.enable_bounds {
            let position = self.library.marker_position(marker).unwrap_or(spec.position);
            let bounds = self.bounds.get_or_insert_with(BoundsAccumulator::new);
            bounds.extend(position);
            if let Some(union) = bounds.bounds() {
                self.library.fit_bounds(map, union);
            }
        }

        log::debug!("added {} at {:?}", marker, spec.position);
        Ok(Some(marker))
    }

    /// Builds an info window for `options.content`; `None` without content
    pub fn create_info_window(&self, options: &MarkerOptions) -> Result<Option<InfoWindowHandle>> {
        match options.content.as_deref() {
            Some(content) => Ok(Some(self.library.create_info_window(content)?)),
            None => Ok(None),
        }
    }

    fn wire_info_window(&self, map: MapHandle, marker: MarkerHandle, window: InfoWindowHandle) {
        // Weak: the library owns these listeners, a strong handle would cycle.
        let library = Rc::downgrade(&self.library);
        let slot = self.info_window.clone();
        self.library.on_marker_click(
            marker,
            Box::new(move || {
                if let Some(library) = library.upgrade() {
                    slot.open(library.as_ref(), window, map, marker);
                }
            }),
        );

        let slot = self.info_window.clone();
        self.library
            .on_info_window_close(window, Box::new(move || slot.closed_by_user(window)));
    }

    /// Opens `window` on `anchor`, closing the current window first
    pub fn open_info_window(&self, window: InfoWindowHandle, anchor: MarkerHandle) -> Result<()> {
        let map = self.require_map()?;
        self.info_window
            .open(self.library.as_ref(), window, map, anchor);
        Ok(())
    }

    /// Closes the current info window, returning it
    pub fn close_info_window(&self) -> Option<InfoWindowHandle> {
        self.info_window.close(self.library.as_ref())
    }

    pub fn current_info_window(&self) -> Option<InfoWindowHandle> {
        self.info_window.current()
    }

    /// Detaches `marker` from the map.
    ///
    /// The tracked list is left as is; only [`clear_markers`] prunes it.
    ///
    /// [`clear_markers`]: MapFacade::clear_markers
    pub fn delete_marker(&self, marker: MarkerHandle) {
        self.library.detach_marker(marker);
    }

    /// Detaches every tracked marker and forgets them.
    ///
    /// The markers, their info windows and their listeners are released in
    /// the library as well.
    pub fn clear_markers(&mut self) {
        for marker in self.markers.drain(..) {
            self.library.detach_marker(marker);
            if let Some(window) = self.marker_windows.remove(&marker) {
                if self.info_window.current() == Some(window) {
                    self.info_window.close(self.library.as_ref());
                }
                self.library.release_info_window(window);
            }
            self.library.release_marker(marker);
        }
    }

    /// Tracked markers, in insertion order
    pub fn markers(&self) -> &[MarkerHandle] {
        &self.markers
    }

    /// The bounds accumulator, if tracking is on or a fit happened
    pub fn bounds(&self) -> Option<&BoundsAccumulator> {
        self.bounds.as_ref()
    }

    /// Rebuilds the accumulator from the tracked markers and fits the viewport.
    ///
    /// Unlike the per-add update this starts from scratch, so markers cleared
    /// since the last fit no longer count.
    pub fn fit_all_markers(&mut self) -> Result<&BoundsAccumulator> {
        let map = self.require_map()?;
        let library = &self.library;
        let accumulator = BoundsAccumulator::from_points(
            self.markers
                .iter()
                .filter_map(|marker| library.marker_position(*marker)),
        );

        match accumulator.bounds() {
            Some(union) => self.library.fit_bounds(map, union),
            None => log::debug!("no tracked markers to fit"),
        }

        Ok(&*self.bounds.insert(accumulator))
    }

    /// Requests a route and draws it on the map.
    ///
    /// The directions pair is created on first use and reattached to the map
    /// on every call. Any status other than `OK` fails with `RouteNotFound`.
    pub async fn trace_direction(
        &self,
        origin: impl Into<Waypoint>,
        destination: impl Into<Waypoint>,
        travel_mode: TravelMode,
    ) -> Result<DirectionsResult> {
        let map = self.require_map()?;
        let directions = *self
            .directions
            .get_or_try_init(|| self.library.create_directions())?;
        self.library.attach_directions(directions, Some(map));

        let request = DirectionsRequest::new(origin, destination, travel_mode);
        log::debug!("requesting {} route", request.travel_mode);

        let response = self.library.route(directions, &request).await?;
        if !response.status.is_ok() {
            log::warn!("route request failed with status {}", response.status);
            return Err(MapError::RouteNotFound {
                status: response.status,
            });
        }

        let result = response.result.ok_or_else(|| {
            MapError::Provider("routing service answered OK without a result".to_string())
        })?;
        self.library.render_route(directions, &result);
        Ok(result)
    }

    /// Removes the drawn route, keeping the directions pair for reuse
    pub fn clear_directions(&self) {
        if let Some(directions) = self.directions.get() {
            self.library.attach_directions(*directions, None);
        }
    }

    pub fn directions(&self) -> Option<DirectionsHandle> {
        self.directions.get().copied()
    }

    /// Queries the device position; platform errors are passed through
    pub async fn get_current_position(&self, options: PositionOptions) -> Result<Position> {
        let geolocation = self
            .geolocation
            .as_ref()
            .ok_or(MapError::GeolocationUnavailable)?;
        Ok(geolocation.current_position(&options).await?)
    }
}
