//! Browser bindings for the library, the document, the script host and
//! geolocation.
//!
//! Library objects live in a registry keyed by the ids carried in the facade
//! handles. Calls go through `Reflect` on the `google.maps` namespace, so no
//! generated bindings are needed for the vendor API.

use crate::{
    core::{
        config::MapOptions,
        geo::{LatLng, LatLngBounds},
        handles::{ContainerHandle, DirectionsHandle, InfoWindowHandle, MapHandle, MarkerHandle},
    },
    directions::{DirectionsRequest, DirectionsResult, RouteResponse, RouteStatus, Waypoint},
    geolocation::{Coordinates, GeolocationError, GeolocationErrorCode, Position, PositionOptions},
    layers::marker::MarkerSpec,
    loader::PageLoad,
    traits::{Geolocation, HostDocument, LibraryHandle, Listener, MapsLibrary, ScriptHost},
    MapError, Result,
};
use async_trait::async_trait;
use fxhash::FxHashMap;
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use url::Url;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlScriptElement;

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            Reflect::get(value, &JsValue::from_str("message"))
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

fn provider_error(context: &str, value: JsValue) -> MapError {
    MapError::Provider(format!("{}: {}", context, describe(&value)))
}

fn get(target: &JsValue, key: &str) -> Result<JsValue> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(|e| provider_error(key, e))
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<()> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| provider_error(key, e))
}

fn call(target: &JsValue, method: &str, args: &[&JsValue]) -> Result<JsValue> {
    let function: Function = get(target, method)?
        .dyn_into()
        .map_err(|e| provider_error(method, e))?;
    let args: Array = args.iter().copied().collect();
    function
        .apply(target, &args)
        .map_err(|e| provider_error(method, e))
}

fn construct(namespace: &JsValue, class: &str, args: &[&JsValue]) -> Result<JsValue> {
    let constructor: Function = get(namespace, class)?
        .dyn_into()
        .map_err(|e| provider_error(class, e))?;
    let args: Array = args.iter().copied().collect();
    Reflect::construct(&constructor, &args).map_err(|e| provider_error(class, e))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    let text = serde_json::to_string(value)?;
    js_sys::JSON::parse(&text).map_err(|e| provider_error("JSON.parse", e))
}

fn from_js(value: &JsValue) -> Result<Value> {
    let text: String = js_sys::JSON::stringify(value)
        .map_err(|e| provider_error("JSON.stringify", e))?
        .into();
    Ok(serde_json::from_str(&text)?)
}

/// JS objects referenced by handle ids
#[derive(Default)]
struct JsRegistry {
    next_id: Cell<u64>,
    objects: RefCell<FxHashMap<u64, JsValue>>,
}

impl JsRegistry {
    fn insert(&self, value: JsValue) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.objects.borrow_mut().insert(id, value);
        id
    }

    /// Id of `value` if it is already registered, a fresh one otherwise
    fn intern(&self, value: JsValue) -> u64 {
        let known = self
            .objects
            .borrow()
            .iter()
            .find(|(_, object)| Object::is(object, &value))
            .map(|(id, _)| *id);
        known.unwrap_or_else(|| self.insert(value))
    }

    fn remove(&self, id: u64) -> Option<JsValue> {
        self.objects.borrow_mut().remove(&id)
    }

    fn get(&self, id: u64) -> Result<JsValue> {
        self.objects
            .borrow()
            .get(&id)
            .cloned()
            .ok_or_else(|| MapError::Provider(format!("unknown library object #{}", id)))
    }
}

/// `google.maps`, reached through the page global
pub struct WebLibrary {
    maps: JsValue,
    registry: Rc<JsRegistry>,
    listeners: RefCell<FxHashMap<u64, Vec<Closure<dyn FnMut()>>>>,
    routes: RefCell<FxHashMap<u64, JsValue>>,
}

impl WebLibrary {
    fn from_global(registry: Rc<JsRegistry>) -> Option<Self> {
        let google = Reflect::get(&js_sys::global(), &JsValue::from_str("google")).ok()?;
        if google.is_undefined() || google.is_null() {
            return None;
        }
        let maps = Reflect::get(&google, &JsValue::from_str("maps")).ok()?;
        if maps.is_undefined() || maps.is_null() {
            return None;
        }

        Some(Self {
            maps,
            registry,
            listeners: RefCell::new(FxHashMap::default()),
            routes: RefCell::new(FxHashMap::default()),
        })
    }

    fn lat_lng(&self, point: LatLng) -> Result<JsValue> {
        construct(
            &self.maps,
            "LatLng",
            &[&JsValue::from_f64(point.lat), &JsValue::from_f64(point.lng)],
        )
    }

    fn waypoint(&self, waypoint: &Waypoint) -> Result<JsValue> {
        match waypoint {
            Waypoint::Point(point) => self.lat_lng(*point),
            Waypoint::Place(place) => Ok(JsValue::from_str(place)),
            Waypoint::Raw(raw) => to_js(raw),
        }
    }

    fn listen(&self, id: u64, event: &str, listener: Listener) -> Result<()> {
        let target = self.registry.get(id)?;
        let closure = Closure::wrap(listener);
        let events = get(&self.maps, "event")?;
        call(
            &events,
            "addListener",
            &[&target, &JsValue::from_str(event), closure.as_ref()],
        )?;
        self.listeners.borrow_mut().entry(id).or_default().push(closure);
        Ok(())
    }

    /// Unregisters every listener of object `id`, then forgets the object.
    /// The closures are dropped only once the library no longer holds them.
    fn release(&self, id: u64) {
        if let Some(object) = self.registry.remove(id) {
            let result = get(&self.maps, "event")
                .and_then(|events| call(&events, "clearInstanceListeners", &[&object]));
            Self::report("clear listeners", result);
        }
        self.listeners.borrow_mut().remove(&id);
    }

    fn directions_pair(&self, directions: DirectionsHandle) -> Result<(JsValue, JsValue)> {
        let pair = Array::from(&self.registry.get(directions.0)?);
        Ok((pair.get(0), pair.get(1)))
    }

    fn report(context: &str, result: Result<JsValue>) {
        if let Err(e) = result {
            log::warn!("{} failed: {}", context, e);
        }
    }
}

#[async_trait(?Send)]
impl MapsLibrary for WebLibrary {
    fn create_map(&self, container: ContainerHandle, options: &MapOptions) -> Result<MapHandle> {
        let container = self.registry.get(container.0)?;
        let map = construct(&self.maps, "Map", &[&container, &to_js(options)?])?;
        Ok(MapHandle(self.registry.insert(map)))
    }

    fn set_map_options(&self, map: MapHandle, options: &MapOptions) -> Result<()> {
        let map = self.registry.get(map.0)?;
        call(&map, "setOptions", &[&to_js(options)?])?;
        Ok(())
    }

    fn create_marker(&self, map: MapHandle, marker: &MarkerSpec) -> Result<MarkerHandle> {
        let options = to_js(marker)?;
        set(&options, "map", &self.registry.get(map.0)?)?;
        let marker = construct(&self.maps, "Marker", &[&options])?;
        Ok(MarkerHandle(self.registry.insert(marker)))
    }

    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng> {
        let marker = self.registry.get(marker.0).ok()?;
        let position = call(&marker, "getPosition", &[]).ok()?;
        if position.is_null() || position.is_undefined() {
            return None;
        }
        let lat = call(&position, "lat", &[]).ok()?.as_f64()?;
        let lng = call(&position, "lng", &[]).ok()?.as_f64()?;
        Some(LatLng::new(lat, lng))
    }

    fn detach_marker(&self, marker: MarkerHandle) {
        let result = self
            .registry
            .get(marker.0)
            .and_then(|marker| call(&marker, "setMap", &[&JsValue::NULL]));
        Self::report("detach marker", result);
    }

    fn release_marker(&self, marker: MarkerHandle) {
        self.release(marker.0);
    }

    fn create_info_window(&self, content: &str) -> Result<InfoWindowHandle> {
        let options = to_js(&json!({ "content": content }))?;
        let window = construct(&self.maps, "InfoWindow", &[&options])?;
        Ok(InfoWindowHandle(self.registry.insert(window)))
    }

    fn open_info_window(&self, window: InfoWindowHandle, map: MapHandle, anchor: MarkerHandle) {
        let result = (|| {
            let window = self.registry.get(window.0)?;
            let map = self.registry.get(map.0)?;
            let anchor = self.registry.get(anchor.0)?;
            call(&window, "open", &[&map, &anchor])
        })();
        Self::report("open info window", result);
    }

    fn close_info_window(&self, window: InfoWindowHandle) {
        let result = self
            .registry
            .get(window.0)
            .and_then(|window| call(&window, "close", &[]));
        Self::report("close info window", result);
    }

    fn release_info_window(&self, window: InfoWindowHandle) {
        self.release(window.0);
    }

    fn on_marker_click(&self, marker: MarkerHandle, listener: Listener) {
        if let Err(e) = self.listen(marker.0, "click", listener) {
            log::warn!("marker click listener not attached: {}", e);
        }
    }

    fn on_info_window_close(&self, window: InfoWindowHandle, listener: Listener) {
        if let Err(e) = self.listen(window.0, "closeclick", listener) {
            log::warn!("info window close listener not attached: {}", e);
        }
    }

    fn fit_bounds(&self, map: MapHandle, bounds: &LatLngBounds) {
        let result = (|| {
            let map = self.registry.get(map.0)?;
            let south_west = self.lat_lng(bounds.south_west)?;
            let north_east = self.lat_lng(bounds.north_east)?;
            let bounds = construct(&self.maps, "LatLngBounds", &[&south_west, &north_east])?;
            call(&map, "fitBounds", &[&bounds])
        })();
        Self::report("fit bounds", result);
    }

    fn create_directions(&self) -> Result<DirectionsHandle> {
        let service = construct(&self.maps, "DirectionsService", &[])?;
        let renderer = construct(&self.maps, "DirectionsRenderer", &[])?;
        let pair = Array::of2(&service, &renderer);
        Ok(DirectionsHandle(self.registry.insert(pair.into())))
    }

    fn attach_directions(&self, directions: DirectionsHandle, map: Option<MapHandle>) {
        let result = (|| {
            let (_, renderer) = self.directions_pair(directions)?;
            let map = match map {
                Some(map) => self.registry.get(map.0)?,
                None => JsValue::NULL,
            };
            call(&renderer, "setMap", &[&map])
        })();
        Self::report("attach directions renderer", result);
    }

    fn render_route(&self, directions: DirectionsHandle, _result: &DirectionsResult) {
        let result = (|| {
            let (_, renderer) = self.directions_pair(directions)?;
            let raw = self
                .routes
                .borrow()
                .get(&directions.0)
                .cloned()
                .ok_or_else(|| MapError::Provider("no route to render".to_string()))?;
            call(&renderer, "setDirections", &[&raw])
        })();
        Self::report("render route", result);
    }

    async fn route(
        &self,
        directions: DirectionsHandle,
        request: &DirectionsRequest,
    ) -> Result<RouteResponse> {
        let (service, _) = self.directions_pair(directions)?;

        let js_request: JsValue = Object::new().into();
        set(&js_request, "origin", &self.waypoint(&request.origin)?)?;
        set(&js_request, "destination", &self.waypoint(&request.destination)?)?;
        set(
            &js_request,
            "travelMode",
            &JsValue::from_str(request.travel_mode.as_str()),
        )?;

        let promise = Promise::new(&mut |resolve: Function, reject: Function| {
            let callback = Closure::once_into_js(move |result: JsValue, status: JsValue| {
                let _ = resolve.call1(&JsValue::UNDEFINED, &Array::of2(&result, &status));
            });
            if let Err(e) = call(&service, "route", &[&js_request, &callback]) {
                let _ = reject.call1(&JsValue::UNDEFINED, &JsValue::from_str(&e.to_string()));
            }
        });

        let settled = JsFuture::from(promise)
            .await
            .map_err(|e| provider_error("route", e))?;
        let settled = Array::from(&settled);
        let (result, status) = (settled.get(0), settled.get(1));

        let status = RouteStatus::from_wire(&status.as_string().unwrap_or_default());
        if !status.is_ok() {
            return Ok(RouteResponse::failed(status));
        }

        let raw = from_js(&result)?;
        self.routes.borrow_mut().insert(directions.0, result);
        Ok(RouteResponse::ok(DirectionsResult::new(raw)))
    }
}

/// `document.querySelector`
pub struct WebDocument {
    registry: Rc<JsRegistry>,
}

impl HostDocument for WebDocument {
    fn query_selector(&self, selector: &str) -> Option<ContainerHandle> {
        let document = web_sys::window()?.document()?;
        let element = document.query_selector(selector).ok()??;
        Some(ContainerHandle(self.registry.intern(element.into())))
    }
}

thread_local! {
    static PAGE_LOAD: Rc<PageLoad> = Rc::new(PageLoad::new());
}

/// Injects `<script>` tags into the page head
pub struct WebScriptHost {
    registry: Rc<JsRegistry>,
    library: RefCell<Option<LibraryHandle>>,
    page: Rc<PageLoad>,
}

impl Default for WebScriptHost {
    fn default() -> Self {
        Self {
            registry: Rc::default(),
            library: RefCell::new(None),
            // One page, one injection record, whatever the number of hosts.
            page: PAGE_LOAD.with(Rc::clone),
        }
    }
}

impl WebScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page document, sharing this host's object registry
    pub fn document(&self) -> Rc<dyn HostDocument> {
        Rc::new(WebDocument {
            registry: Rc::clone(&self.registry),
        })
    }
}

#[async_trait(?Send)]
impl ScriptHost for WebScriptHost {
    fn library(&self) -> Option<LibraryHandle> {
        if let Some(library) = self.library.borrow().as_ref() {
            return Some(Rc::clone(library));
        }

        let library: LibraryHandle = Rc::new(WebLibrary::from_global(Rc::clone(&self.registry))?);
        *self.library.borrow_mut() = Some(Rc::clone(&library));
        Some(library)
    }

    fn page_load(&self) -> &PageLoad {
        &self.page
    }

    async fn inject_script(&self, url: &Url) -> std::result::Result<(), String> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| "no document available".to_string())?;
        let script: HtmlScriptElement = document
            .create_element("script")
            .map_err(|e| describe(&e))?
            .dyn_into()
            .map_err(|_| "created element is not a script".to_string())?;
        script.set_src(url.as_str());
        script.set_async(true);

        let loaded = Promise::new(&mut |resolve: Function, reject: Function| {
            script.set_onload(Some(&resolve));
            script.set_onerror(Some(&reject));
        });

        let head = document
            .head()
            .ok_or_else(|| "document has no head".to_string())?;
        head.append_child(&script).map_err(|e| describe(&e))?;

        JsFuture::from(loaded)
            .await
            .map(|_| ())
            .map_err(|_| "script request failed".to_string())
    }
}

/// `navigator.geolocation`
#[derive(Debug, Default, Clone, Copy)]
pub struct WebGeolocation;

fn read_position(value: &JsValue) -> Option<Position> {
    let number = |target: &JsValue, key: &str| {
        Reflect::get(target, &JsValue::from_str(key))
            .ok()
            .and_then(|value| value.as_f64())
    };

    let coords = Reflect::get(value, &JsValue::from_str("coords")).ok()?;
    Some(Position {
        coords: Coordinates {
            latitude: number(&coords, "latitude")?,
            longitude: number(&coords, "longitude")?,
            accuracy: number(&coords, "accuracy").unwrap_or_default(),
            altitude: number(&coords, "altitude"),
            altitude_accuracy: number(&coords, "altitudeAccuracy"),
            heading: number(&coords, "heading"),
            speed: number(&coords, "speed"),
        },
        timestamp: number(value, "timestamp").unwrap_or_default(),
    })
}

#[async_trait(?Send)]
impl Geolocation for WebGeolocation {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> std::result::Result<Position, GeolocationError> {
        let unavailable =
            |message: String| GeolocationError::new(GeolocationErrorCode::PositionUnavailable, message);

        let geolocation = web_sys::window()
            .ok_or_else(|| unavailable("no window available".to_string()))?
            .navigator()
            .geolocation()
            .map_err(|e| unavailable(describe(&e)))?;
        let js_options: web_sys::PositionOptions = to_js(options)
            .map_err(|e| unavailable(e.to_string()))?
            .unchecked_into();

        let promise = Promise::new(&mut |resolve: Function, reject: Function| {
            if let Err(e) = geolocation.get_current_position_with_error_callback_and_options(
                &resolve,
                Some(&reject),
                &js_options,
            ) {
                let _ = reject.call1(&JsValue::UNDEFINED, &e);
            }
        });

        match JsFuture::from(promise).await {
            Ok(position) => {
                read_position(&position).ok_or_else(|| unavailable("malformed position".to_string()))
            }
            Err(error) => {
                let code = Reflect::get(&error, &JsValue::from_str("code"))
                    .ok()
                    .and_then(|code| code.as_f64())
                    .unwrap_or(2.0) as u16;
                Err(GeolocationError::new(
                    GeolocationErrorCode::from_code(code),
                    describe(&error),
                ))
            }
        }
    }
}
