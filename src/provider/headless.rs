//! In-memory implementation of the library, document, script host and
//! geolocation contracts.
//!
//! Nothing is rendered. Every library call is recorded so that the facade can
//! be driven and inspected outside a browser, and user interactions (marker
//! clicks, info window close buttons) can be simulated.

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
    traits::{Geolocation, HostDocument, LibraryHandle, Listener, MapsLibrary, ScriptHost},
    MapError, Result,
};
use async_trait::async_trait;
use futures::channel::oneshot;
use fxhash::FxHashMap;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::hash::Hash;
use std::rc::Rc;
use url::Url;

/// One recorded call into [`HeadlessLibrary`]
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryCall {
    CreateMap {
        map: MapHandle,
        container: ContainerHandle,
        options: MapOptions,
    },
    SetMapOptions {
        map: MapHandle,
        options: MapOptions,
    },
    CreateMarker {
        marker: MarkerHandle,
        map: MapHandle,
        spec: MarkerSpec,
    },
    DetachMarker(MarkerHandle),
    ReleaseMarker(MarkerHandle),
    CreateInfoWindow {
        window: InfoWindowHandle,
        content: String,
    },
    OpenInfoWindow {
        window: InfoWindowHandle,
        anchor: MarkerHandle,
    },
    CloseInfoWindow(InfoWindowHandle),
    ReleaseInfoWindow(InfoWindowHandle),
    FitBounds {
        map: MapHandle,
        bounds: LatLngBounds,
    },
    CreateDirections(DirectionsHandle),
    AttachDirections {
        directions: DirectionsHandle,
        map: Option<MapHandle>,
    },
    Route {
        directions: DirectionsHandle,
        request: DirectionsRequest,
    },
    RenderRoute(DirectionsHandle),
}

struct HeadlessMarker {
    position: LatLng,
    map: Option<MapHandle>,
}

struct HeadlessWindow {
    content: String,
    anchor: Option<MarkerHandle>,
}

/// Runs every listener registered under `key`, keeping them registered.
fn fire<K: Copy + Eq + Hash>(listeners: &RefCell<FxHashMap<K, Vec<Listener>>>, key: K) -> usize {
    // Listeners may call back into the library, so none of its cells may be
    // borrowed while they run.
    let taken = listeners.borrow_mut().remove(&key);
    let Some(mut taken) = taken else {
        return 0;
    };

    for listener in taken.iter_mut() {
        listener();
    }

    let count = taken.len();
    let mut listeners = listeners.borrow_mut();
    let registered_meanwhile = listeners.remove(&key).unwrap_or_default();
    taken.extend(registered_meanwhile);
    listeners.insert(key, taken);
    count
}

/// A mapping library that keeps its objects in memory
#[derive(Default)]
pub struct HeadlessLibrary {
    next_id: Cell<u64>,
    calls: RefCell<Vec<LibraryCall>>,
    markers: RefCell<FxHashMap<MarkerHandle, HeadlessMarker>>,
    windows: RefCell<FxHashMap<InfoWindowHandle, HeadlessWindow>>,
    marker_listeners: RefCell<FxHashMap<MarkerHandle, Vec<Listener>>>,
    close_listeners: RefCell<FxHashMap<InfoWindowHandle, Vec<Listener>>>,
    routes: RefCell<VecDeque<Result<RouteResponse>>>,
    reject_options: Cell<bool>,
    reject_windows: Cell<bool>,
}

impl HeadlessLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for building a shared [`LibraryHandle`] while keeping a
    /// typed reference for inspection.
    pub fn shared() -> (Rc<HeadlessLibrary>, LibraryHandle) {
        let library = Rc::new(Self::new());
        let handle: LibraryHandle = library.clone();
        (library, handle)
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn record(&self, call: LibraryCall) {
        self.calls.borrow_mut().push(call);
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<LibraryCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Markers currently attached to a map, by ascending handle
    pub fn attached_markers(&self) -> Vec<MarkerHandle> {
        let mut attached: Vec<MarkerHandle> = self
            .markers
            .borrow()
            .iter()
            .filter(|(_, marker)| marker.map.is_some())
            .map(|(handle, _)| *handle)
            .collect();
        attached.sort();
        attached
    }

    /// Info windows currently displayed, by ascending handle
    pub fn open_windows(&self) -> Vec<InfoWindowHandle> {
        let mut open: Vec<InfoWindowHandle> = self
            .windows
            .borrow()
            .iter()
            .filter(|(_, window)| window.anchor.is_some())
            .map(|(handle, _)| *handle)
            .collect();
        open.sort();
        open
    }

    pub fn window_content(&self, window: InfoWindowHandle) -> Option<String> {
        self.windows
            .borrow()
            .get(&window)
            .map(|window| window.content.clone())
    }

    /// Simulates a user click on a marker; returns how many listeners ran
    pub fn click_marker(&self, marker: MarkerHandle) -> usize {
        fire(&self.marker_listeners, marker)
    }

    /// Simulates the user pressing the close button of an info window
    pub fn dismiss_info_window(&self, window: InfoWindowHandle) -> usize {
        if let Some(window) = self.windows.borrow_mut().get_mut(&window) {
            window.anchor = None;
        }
        fire(&self.close_listeners, window)
    }

    /// Queues the answer of the next `route` call
    pub fn queue_route(&self, response: Result<RouteResponse>) {
        self.routes.borrow_mut().push_back(response);
    }

    /// Makes `set_map_options` fail until switched back
    pub fn reject_map_options(&self, reject: bool) {
        self.reject_options.set(reject);
    }

    /// Makes `create_info_window` fail until switched back
    pub fn reject_info_windows(&self, reject: bool) {
        self.reject_windows.set(reject);
    }

    /// Objects still known to the library, markers and info windows together
    pub fn live_objects(&self) -> usize {
        self.markers.borrow().len() + self.windows.borrow().len()
    }
}

#[async_trait(?Send)]
impl MapsLibrary for HeadlessLibrary {
    fn create_map(&self, container: ContainerHandle, options: &MapOptions) -> Result<MapHandle> {
        let map = MapHandle(self.next_id());
        self.record(LibraryCall::CreateMap {
            map,
            container,
            options: options.clone(),
        });
        Ok(map)
    }

    fn set_map_options(&self, map: MapHandle, options: &MapOptions) -> Result<()> {
        if self.reject_options.get() {
            return Err(MapError::Provider("map rejected the options".to_string()));
        }
        self.record(LibraryCall::SetMapOptions {
            map,
            options: options.clone(),
        });
        Ok(())
    }

    fn create_marker(&self, map: MapHandle, spec: &MarkerSpec) -> Result<MarkerHandle> {
        let marker = MarkerHandle(self.next_id());
        self.markers.borrow_mut().insert(
            marker,
            HeadlessMarker {
                position: spec.position,
                map: Some(map),
            },
        );
        self.record(LibraryCall::CreateMarker {
            marker,
            map,
            spec: spec.clone(),
        });
        Ok(marker)
    }

    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng> {
        self.markers.borrow().get(&marker).map(|marker| marker.position)
    }

    fn detach_marker(&self, marker: MarkerHandle) {
        if let Some(marker) = self.markers.borrow_mut().get_mut(&marker) {
            marker.map = None;
        }
        self.record(LibraryCall::DetachMarker(marker));
    }

    fn release_marker(&self, marker: MarkerHandle) {
        self.markers.borrow_mut().remove(&marker);
        self.marker_listeners.borrow_mut().remove(&marker);
        self.record(LibraryCall::ReleaseMarker(marker));
    }

    fn create_info_window(&self, content: &str) -> Result<InfoWindowHandle> {
        if self.reject_windows.get() {
            return Err(MapError::Provider("info window rejected".to_string()));
        }
        let window = InfoWindowHandle(self.next_id());
        self.windows.borrow_mut().insert(
            window,
            HeadlessWindow {
                content: content.to_string(),
                anchor: None,
            },
        );
        self.record(LibraryCall::CreateInfoWindow {
            window,
            content: content.to_string(),
        });
        Ok(window)
    }

    fn open_info_window(&self, window: InfoWindowHandle, _map: MapHandle, anchor: MarkerHandle) {
        if let Some(window) = self.windows.borrow_mut().get_mut(&window) {
            window.anchor = Some(anchor);
        }
        self.record(LibraryCall::OpenInfoWindow { window, anchor });
    }

    fn close_info_window(&self, window: InfoWindowHandle) {
        if let Some(window) = self.windows.borrow_mut().get_mut(&window) {
            window.anchor = None;
        }
        self.record(LibraryCall::CloseInfoWindow(window));
    }

    fn release_info_window(&self, window: InfoWindowHandle) {
        self.windows.borrow_mut().remove(&window);
        self.close_listeners.borrow_mut().remove(&window);
        self.record(LibraryCall::ReleaseInfoWindow(window));
    }

    fn on_marker_click(&self, marker: MarkerHandle, listener: Listener) {
        self.marker_listeners
            .borrow_mut()
            .entry(marker)
            .or_default()
            .push(listener);
    }

    fn on_info_window_close(&self, window: InfoWindowHandle, listener: Listener) {
        self.close_listeners
            .borrow_mut()
            .entry(window)
            .or_default()
            .push(listener);
    }

    fn fit_bounds(&self, map: MapHandle, bounds: &LatLngBounds) {
        self.record(LibraryCall::FitBounds {
            map,
            bounds: bounds.clone(),
        });
    }

    fn create_directions(&self) -> Result<DirectionsHandle> {
        let directions = DirectionsHandle(self.next_id());
        self.record(LibraryCall::CreateDirections(directions));
        Ok(directions)
    }

    fn attach_directions(&self, directions: DirectionsHandle, map: Option<MapHandle>) {
        self.record(LibraryCall::AttachDirections { directions, map });
    }

    fn render_route(&self, directions: DirectionsHandle, _result: &DirectionsResult) {
        self.record(LibraryCall::RenderRoute(directions));
    }

    async fn route(
        &self,
        directions: DirectionsHandle,
        request: &DirectionsRequest,
    ) -> Result<RouteResponse> {
        self.record(LibraryCall::Route {
            directions,
            request: request.clone(),
        });

        let queued = self.routes.borrow_mut().pop_front();
        match queued {
            Some(response) => response,
            None => Ok(RouteResponse::ok(DirectionsResult::new(json!({
                "routes": [{ "summary": "headless" }],
                "request": request,
            })))),
        }
    }
}

/// A document whose selectors are registered up front
#[derive(Debug, Default)]
pub struct HeadlessDocument {
    next_id: Cell<u64>,
    elements: RefCell<FxHashMap<String, ContainerHandle>>,
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, selector: &str) -> Self {
        self.insert(selector);
        self
    }

    /// Registers `selector`, returning its existing handle if already known
    pub fn insert(&self, selector: &str) -> ContainerHandle {
        let mut elements = self.elements.borrow_mut();
        if let Some(handle) = elements.get(selector) {
            return *handle;
        }
        let handle = ContainerHandle(self.next_id.get() + 1);
        self.next_id.set(handle.0);
        elements.insert(selector.to_string(), handle);
        handle
    }
}

impl HostDocument for HeadlessDocument {
    fn query_selector(&self, selector: &str) -> Option<ContainerHandle> {
        self.elements.borrow().get(selector).copied()
    }
}

/// Releases a gated [`HeadlessScriptHost`] injection
pub struct ScriptGate(oneshot::Sender<()>);

impl ScriptGate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

/// A script host that "loads" a given library when its script is injected
pub struct HeadlessScriptHost {
    library: LibraryHandle,
    loaded: Cell<bool>,
    failure: Option<String>,
    injected: RefCell<Vec<Url>>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
    page: PageLoad,
}

impl HeadlessScriptHost {
    /// The library becomes available after the first injection
    pub fn new(library: LibraryHandle) -> Self {
        Self {
            library,
            loaded: Cell::new(false),
            failure: None,
            injected: RefCell::new(Vec::new()),
            gate: RefCell::new(None),
            page: PageLoad::new(),
        }
    }

    /// The library is already present; injection should never happen
    pub fn preloaded(library: LibraryHandle) -> Self {
        let host = Self::new(library);
        host.loaded.set(true);
        host
    }

    /// Every injection fails with `reason`
    pub fn failing(library: LibraryHandle, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(library)
        }
    }

    /// Holds the next injection until the returned gate is released
    pub fn gated(self) -> (Self, ScriptGate) {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx);
        (self, ScriptGate(tx))
    }

    pub fn injected_urls(&self) -> Vec<Url> {
        self.injected.borrow().clone()
    }

    pub fn injection_count(&self) -> usize {
        self.injected.borrow().len()
    }
}

#[async_trait(?Send)]
impl ScriptHost for HeadlessScriptHost {
    fn library(&self) -> Option<LibraryHandle> {
        self.loaded.get().then(|| Rc::clone(&self.library))
    }

    fn page_load(&self) -> &PageLoad {
        &self.page
    }

    async fn inject_script(&self, url: &Url) -> std::result::Result<(), String> {
        self.injected.borrow_mut().push(url.clone());

        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let Some(reason) = &self.failure {
            return Err(reason.clone());
        }
        self.loaded.set(true);
        Ok(())
    }
}

/// A position source answering every query with the same outcome
pub struct StaticGeolocation {
    outcome: std::result::Result<Position, GeolocationError>,
    requests: RefCell<Vec<PositionOptions>>,
}

impl StaticGeolocation {
    pub fn new(position: Position) -> Self {
        Self {
            outcome: Ok(position),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self {
            outcome: Err(error),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Options of every query received so far
    pub fn requests(&self) -> Vec<PositionOptions> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Geolocation for StaticGeolocation {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> std::result::Result<Position, GeolocationError> {
        self.requests.borrow_mut().push(*options);
        self.outcome.clone()
    }
}
