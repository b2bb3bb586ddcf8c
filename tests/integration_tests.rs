use mapfacade::provider::headless::{
    HeadlessDocument, HeadlessLibrary, HeadlessScriptHost, LibraryCall, StaticGeolocation,
};
use mapfacade::{
    FacadeConfig, GeolocationError, GeolocationErrorCode, LatLng, LatLngBounds, LoaderConfig,
    MapError, MapFacade, MarkerOptions, OptionsUpdate, Position, PositionOptions, RouteResponse,
    RouteStatus, ScriptLoader, TravelMode, Waypoint,
};
use serde_json::{json, Value};
use std::rc::Rc;
use std::time::Duration;

/// Integration tests driving the facade the way a page would:
/// load the script, initialize, then place markers and request routes.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn facade_with(config: FacadeConfig) -> (Rc<HeadlessLibrary>, MapFacade) {
    init_logging();
    let (library, handle) = HeadlessLibrary::shared();
    let document = Rc::new(HeadlessDocument::new().with_element("#map"));
    let mut facade = MapFacade::new(handle, document);
    facade.initialize("#map", &Value::Null, config).unwrap();
    (library, facade)
}

fn paris() -> MarkerOptions {
    MarkerOptions::new(48.85, 2.35)
}

fn lyon() -> MarkerOptions {
    MarkerOptions::new(45.75, 4.85)
}

#[tokio::test]
async fn test_load_then_initialize() {
    init_logging();
    let (library, handle) = HeadlessLibrary::shared();
    let host = Rc::new(HeadlessScriptHost::new(handle));
    let loader = ScriptLoader::new(host.clone(), LoaderConfig::new("key").with_language("fr"));
    let document = Rc::new(HeadlessDocument::new().with_element("#map"));

    let mut facade = MapFacade::load(&loader, document).await.unwrap();
    let map = facade
        .initialize(
            "#map",
            &json!({ "center": { "latitude": 45.75, "longitude": 4.85 }, "zoom": 9 }),
            FacadeConfig::default(),
        )
        .unwrap();

    assert_eq!(host.injection_count(), 1);
    match &library.calls()[0] {
        LibraryCall::CreateMap { map: created, options, .. } => {
            assert_eq!(*created, map);
            assert_eq!(options.center, LatLng::new(45.75, 4.85));
            assert_eq!(options.zoom, 9.0);
            assert_eq!(options.min_zoom, 2.0);
        }
        other => panic!("unexpected first call: {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_load_leaves_no_usable_facade() {
    init_logging();
    let (_, handle) = HeadlessLibrary::shared();
    let host = Rc::new(HeadlessScriptHost::failing(handle, "404"));
    let loader = ScriptLoader::new(host.clone(), LoaderConfig::new("key"));

    for _ in 0..2 {
        let document = Rc::new(HeadlessDocument::new());
        let result = MapFacade::load(&loader, document).await;
        assert!(matches!(result, Err(MapError::ScriptLoad(_))));
    }
    assert_eq!(host.injection_count(), 1);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_injection() {
    init_logging();
    let (_, handle) = HeadlessLibrary::shared();
    let (host, gate) = HeadlessScriptHost::new(handle).gated();
    let host = Rc::new(host);
    let loader = ScriptLoader::new(host.clone(), LoaderConfig::new("key"));

    let (first, second, _) = futures::join!(loader.load(), loader.load(), async move {
        tokio::task::yield_now().await;
        gate.release();
    });

    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(host.injection_count(), 1);
}

#[tokio::test]
async fn test_two_loaders_on_one_page_inject_once() {
    init_logging();
    let (_, handle) = HeadlessLibrary::shared();
    let (host, gate) = HeadlessScriptHost::new(handle).gated();
    let host = Rc::new(host);
    let first = ScriptLoader::new(host.clone(), LoaderConfig::new("key"));
    let second = ScriptLoader::new(host.clone(), LoaderConfig::new("key").with_language("fr"));

    let (a, b, _) = futures::join!(
        MapFacade::load(&first, Rc::new(HeadlessDocument::new())),
        MapFacade::load(&second, Rc::new(HeadlessDocument::new())),
        async move {
            tokio::task::yield_now().await;
            gate.release();
        }
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(host.injection_count(), 1);
}

#[test]
fn test_second_initialize_fails() {
    let (_, mut facade) = facade_with(FacadeConfig::default());
    let second = facade.initialize("#map", &Value::Null, FacadeConfig::default());
    assert!(matches!(second, Err(MapError::AlreadyInitialized)));
}

#[test]
fn test_marker_without_longitude_is_noop() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    facade.add_marker(paris(), false).unwrap();
    library.clear_calls();

    let options = MarkerOptions::from_value(json!({ "latitude": 48.85, "content": "x" })).unwrap();
    assert_eq!(facade.add_marker(options, true).unwrap(), None);

    assert_eq!(facade.markers().len(), 1);
    assert!(library.calls().is_empty());
}

#[test]
fn test_zero_longitude_marker_is_placed() {
    let (_, mut facade) = facade_with(FacadeConfig::default());
    let options = MarkerOptions::from_value(json!({ "latitude": 51.4779, "longitude": 0 })).unwrap();
    assert!(facade.add_marker(options, false).unwrap().is_some());
    assert_eq!(facade.markers().len(), 1);
}

#[test]
fn test_opening_b_closes_a_first() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    let a = facade.add_marker(paris().with_content("Paris"), true).unwrap().unwrap();
    let b = facade.add_marker(lyon().with_content("Lyon"), true).unwrap().unwrap();

    library.click_marker(a);
    let window_a = facade.current_info_window().unwrap();
    assert_eq!(library.window_content(window_a).as_deref(), Some("Paris"));

    library.clear_calls();
    library.click_marker(b);
    let window_b = facade.current_info_window().unwrap();

    assert_ne!(window_a, window_b);
    assert_eq!(
        library.calls(),
        vec![
            LibraryCall::CloseInfoWindow(window_a),
            LibraryCall::OpenInfoWindow { window: window_b, anchor: b },
        ]
    );
    assert_eq!(library.open_windows(), vec![window_b]);
}

#[test]
fn test_user_close_clears_current_window() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    let marker = facade.add_marker(paris().with_content("Paris"), true).unwrap().unwrap();

    library.click_marker(marker);
    let window = facade.current_info_window().unwrap();
    library.dismiss_info_window(window);

    assert_eq!(facade.current_info_window(), None);
    assert!(library.open_windows().is_empty());
}

#[test]
fn test_programmatic_open_and_close() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    let marker = facade.add_marker(paris(), false).unwrap().unwrap();
    let window = facade
        .create_info_window(&MarkerOptions::default().with_content("hello"))
        .unwrap()
        .unwrap();

    facade.open_info_window(window, marker).unwrap();
    assert_eq!(facade.current_info_window(), Some(window));

    assert_eq!(facade.close_info_window(), Some(window));
    assert_eq!(facade.current_info_window(), None);
    assert!(library.open_windows().is_empty());
}

#[test]
fn test_fit_all_markers_extends_in_order() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    facade.add_marker(paris(), false).unwrap();
    facade.add_marker(lyon(), false).unwrap();

    let accumulator = facade.fit_all_markers().unwrap();
    assert_eq!(
        accumulator.points(),
        &[LatLng::new(48.85, 2.35), LatLng::new(45.75, 4.85)]
    );

    let expected = LatLngBounds::from_coords(45.75, 2.35, 48.85, 4.85);
    assert!(library
        .calls()
        .contains(&LibraryCall::FitBounds { map: facade.map().unwrap(), bounds: expected }));
}

#[test]
fn test_fit_all_markers_ignores_previous_incremental_state() {
    let (_, mut facade) = facade_with(FacadeConfig::default().with_bounds(true));
    facade.add_marker(paris(), false).unwrap();
    facade.clear_markers();
    facade.add_marker(lyon(), false).unwrap();

    // The incremental accumulator never shrinks: it still remembers Paris.
    assert_eq!(facade.bounds().unwrap().len(), 2);

    let accumulator = facade.fit_all_markers().unwrap();
    assert_eq!(accumulator.points(), &[LatLng::new(45.75, 4.85)]);

    // Re-deriving is idempotent.
    let again = facade.fit_all_markers().unwrap().clone();
    assert_eq!(again.points(), &[LatLng::new(45.75, 4.85)]);
}

#[test]
fn test_incremental_bounds_refit_on_every_add() {
    let (library, mut facade) = facade_with(FacadeConfig::default().with_bounds(true));
    facade.add_marker(paris(), false).unwrap();
    facade.add_marker(lyon(), false).unwrap();

    let fits: Vec<LatLngBounds> = library
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            LibraryCall::FitBounds { bounds, .. } => Some(bounds),
            _ => None,
        })
        .collect();

    assert_eq!(
        fits,
        vec![
            LatLngBounds::from_point(LatLng::new(48.85, 2.35)),
            LatLngBounds::from_coords(45.75, 2.35, 48.85, 4.85),
        ]
    );
}

#[test]
fn test_delete_marker_keeps_tracked_list() {
    let (library, mut facade) = facade_with(FacadeConfig::default().with_bounds(true));
    let marker = facade.add_marker(paris(), false).unwrap().unwrap();

    facade.delete_marker(marker);

    assert_eq!(facade.markers(), &[marker]);
    assert!(library.attached_markers().is_empty());
    // Removal does not shrink the incremental accumulator.
    assert_eq!(facade.bounds().unwrap().len(), 1);
}

#[test]
fn test_clear_then_add_leaves_one_marker() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    facade.add_marker(paris(), false).unwrap();
    facade.add_marker(paris(), false).unwrap();

    facade.clear_markers();
    assert!(facade.markers().is_empty());
    assert!(library.attached_markers().is_empty());

    let marker = facade.add_marker(lyon(), false).unwrap().unwrap();
    assert_eq!(facade.markers(), &[marker]);
    assert_eq!(library.attached_markers(), vec![marker]);
}

#[test]
fn test_clear_markers_releases_library_objects() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    let a = facade.add_marker(paris().with_content("Paris"), true).unwrap().unwrap();
    let b = facade.add_marker(lyon(), true).unwrap().unwrap();
    library.click_marker(a);
    let window = facade.current_info_window().unwrap();
    assert_eq!(library.live_objects(), 3);

    library.clear_calls();
    facade.clear_markers();

    assert_eq!(library.live_objects(), 0);
    assert_eq!(facade.current_info_window(), None);
    assert_eq!(library.click_marker(a), 0);
    assert_eq!(
        library.calls(),
        vec![
            LibraryCall::DetachMarker(a),
            LibraryCall::CloseInfoWindow(window),
            LibraryCall::ReleaseInfoWindow(window),
            LibraryCall::ReleaseMarker(a),
            LibraryCall::DetachMarker(b),
            LibraryCall::ReleaseMarker(b),
        ]
    );
}

#[test]
fn test_failed_info_window_leaves_no_marker() {
    let (library, mut facade) = facade_with(FacadeConfig::default().with_bounds(true));
    library.reject_info_windows(true);
    library.clear_calls();

    let result = facade.add_marker(paris().with_content("Paris"), true);

    assert!(matches!(result, Err(MapError::Provider(_))));
    assert!(facade.markers().is_empty());
    assert!(facade.bounds().unwrap().is_empty());
    assert!(library.attached_markers().is_empty());
    assert!(library.calls().is_empty());
}

#[tokio::test]
async fn test_trace_direction_request_waypoints() {
    let (library, facade) = facade_with(FacadeConfig::default());
    let origin = json!({ "latitude": 48.85, "longitude": 2.35 });

    let result = facade
        .trace_direction(origin, "Lyon", TravelMode::Driving)
        .await
        .unwrap();
    assert_eq!(result.route_count(), 1);

    let request = library
        .calls()
        .into_iter()
        .find_map(|call| match call {
            LibraryCall::Route { request, .. } => Some(request),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.origin, Waypoint::Point(LatLng::new(48.85, 2.35)));
    assert_eq!(request.destination, Waypoint::Place("Lyon".to_string()));
    assert_eq!(request.travel_mode, TravelMode::Driving);
}

#[tokio::test]
async fn test_directions_pair_is_created_once() {
    let (library, facade) = facade_with(FacadeConfig::default());
    facade
        .trace_direction("Paris", "Lyon", TravelMode::Transit)
        .await
        .unwrap();
    facade
        .trace_direction("Lyon", "Marseille", TravelMode::Walking)
        .await
        .unwrap();

    let calls = library.calls();
    let created = calls
        .iter()
        .filter(|call| matches!(call, LibraryCall::CreateDirections(_)))
        .count();
    let attached = calls
        .iter()
        .filter(|call| matches!(call, LibraryCall::AttachDirections { map: Some(_), .. }))
        .count();
    let rendered = calls
        .iter()
        .filter(|call| matches!(call, LibraryCall::RenderRoute(_)))
        .count();

    assert_eq!((created, attached, rendered), (1, 2, 2));

    facade.clear_directions();
    assert_eq!(
        library.calls().last(),
        Some(&LibraryCall::AttachDirections {
            directions: facade.directions().unwrap(),
            map: None
        })
    );
}

#[tokio::test]
async fn test_non_ok_status_is_rejected() {
    let (library, facade) = facade_with(FacadeConfig::default());
    library.queue_route(Ok(RouteResponse::failed(RouteStatus::ZeroResults)));

    let result = facade
        .trace_direction("Paris", "Honolulu", TravelMode::Driving)
        .await;

    assert!(matches!(
        result,
        Err(MapError::RouteNotFound { status: RouteStatus::ZeroResults })
    ));
    assert!(!library
        .calls()
        .iter()
        .any(|call| matches!(call, LibraryCall::RenderRoute(_))));
}

#[tokio::test]
async fn test_unrecognised_status_is_reported_verbatim() {
    let (library, facade) = facade_with(FacadeConfig::default());
    library.queue_route(Ok(RouteResponse::failed(RouteStatus::from_wire("SOME_NEW_CODE"))));

    let error = facade
        .trace_direction("Paris", "Lyon", TravelMode::Driving)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        MapError::RouteNotFound { status: RouteStatus::Other(ref code) } if code == "SOME_NEW_CODE"
    ));
    assert_eq!(error.to_string(), "no route found: SOME_NEW_CODE");
}

#[tokio::test]
async fn test_request_errors_surface_as_failures() {
    let (library, facade) = facade_with(FacadeConfig::default());
    library.queue_route(Err(MapError::Provider("bad origin".to_string())));

    let result = facade
        .trace_direction("Paris", "Lyon", TravelMode::Bicycling)
        .await;
    assert!(matches!(result, Err(MapError::Provider(ref m)) if m == "bad origin"));
}

#[tokio::test]
async fn test_trace_direction_requires_map() {
    init_logging();
    let (_, handle) = HeadlessLibrary::shared();
    let facade = MapFacade::new(handle, Rc::new(HeadlessDocument::new()));

    let result = facade.trace_direction("Paris", "Lyon", TravelMode::Driving).await;
    assert!(matches!(result, Err(MapError::NotInitialized)));
}

#[test]
fn test_malformed_options_are_degraded() {
    let (library, mut facade) = facade_with(FacadeConfig::default());
    library.clear_calls();

    let update = facade.set_map_options(&json!({ "zoom": "closer" }));
    assert!(matches!(update, OptionsUpdate::Degraded(_)));
    assert_eq!(facade.map_options().zoom, 9.0);

    library.reject_map_options(true);
    assert!(!facade.set_zoom(5.0).is_applied());
    assert_eq!(facade.map_options().zoom, 9.0);

    assert!(library.calls().is_empty());
}

#[tokio::test]
async fn test_current_position_passes_options_through() {
    init_logging();
    let (_, handle) = HeadlessLibrary::shared();
    let geolocation = Rc::new(StaticGeolocation::new(Position::new(48.85, 2.35, 12.0, 1.0)));
    let facade = MapFacade::new(handle, Rc::new(HeadlessDocument::new()))
        .with_geolocation(geolocation.clone());

    let options = PositionOptions::default().with_timeout(Duration::from_secs(2));
    let position = facade.get_current_position(options).await.unwrap();

    assert_eq!(position.lat_lng(), LatLng::new(48.85, 2.35));
    assert_eq!(geolocation.requests(), vec![options]);
}

#[tokio::test]
async fn test_current_position_errors_pass_through() {
    init_logging();
    let (_, handle) = HeadlessLibrary::shared();
    let error = GeolocationError::new(GeolocationErrorCode::PermissionDenied, "denied");
    let facade = MapFacade::new(handle, Rc::new(HeadlessDocument::new()))
        .with_geolocation(Rc::new(StaticGeolocation::failing(error.clone())));

    let result = facade.get_current_position(PositionOptions::default()).await;
    assert!(matches!(result, Err(MapError::Geolocation(ref e)) if *e == error));
}

#[tokio::test]
async fn test_current_position_without_source() {
    init_logging();
    let (_, handle) = HeadlessLibrary::shared();
    let facade = MapFacade::new(handle, Rc::new(HeadlessDocument::new()));

    let result = facade.get_current_position(PositionOptions::default()).await;
    assert!(matches!(result, Err(MapError::GeolocationUnavailable)));
}
