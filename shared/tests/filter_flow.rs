use crux_core::testing::AppTester;
use crux_core::Request;

use culture_core::capabilities::{
    BackendOperation, BackendOutput, GeocodeOperation, GeocodeOutput, LocationOperation,
    LocationOutput, PermissionState,
};
use culture_core::error::ErrorKind;
use culture_core::filter::{CategoryChoice, PlaceSelection};
use culture_core::geometry::LatLon;
use culture_core::model::{CulturalEvent, CurrentUser, EventId, EventType, ScheduleEntry, UserId};
use culture_core::{App, Effect, Event, Model};

fn event(id: &str, event_type: EventType, country: &str, city: &str, at: LatLon) -> CulturalEvent {
    CulturalEvent {
        id: EventId::new(id),
        title: format!("{city} {id}"),
        event_type,
        schedule: vec![ScheduleEntry::new(format!("2099-06-{:02}T20:00:00Z", id.len()))],
        coordinates: Some(at),
        city: city.into(),
        country: country.into(),
        ..CulturalEvent::default()
    }
}

fn catalog() -> Vec<CulturalEvent> {
    vec![
        event("lx1", EventType::Music, "Portugal", "Lisboa", LatLon::new(38.72, -9.14)),
        event("lx22", EventType::Theater, "Portugal", "Lisboa", LatLon::new(38.71, -9.13)),
        event("po333", EventType::Music, "Portugal", "Porto", LatLon::new(41.15, -8.61)),
        event("md4444", EventType::Cinema, "Spain", "Madrid", LatLon::new(40.42, -3.70)),
    ]
}

fn backend_requests(effects: Vec<Effect>) -> Vec<Request<BackendOperation>> {
    effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Backend(request) => Some(request),
            _ => None,
        })
        .collect()
}

fn start_session(app: &AppTester<App, Effect>, model: &mut Model) {
    let update = app.update(
        Event::SessionStarted {
            user: CurrentUser {
                id: UserId::new("u1"),
                display_name: "Ana".into(),
                email: None,
            },
        },
        model,
    );

    let mut requests = backend_requests(update.effects);
    let ops: Vec<&str> = requests.iter().map(|r| r.operation.name()).collect();
    assert_eq!(ops, ["load_favorites", "load_participations", "fetch_events"]);

    let mut fetch = requests.pop().unwrap();
    let update = app
        .resolve(&mut fetch, Ok(BackendOutput::Events(catalog())))
        .expect("fetch resolves");
    for event in update.events {
        app.update(event, model);
    }
}

#[test]
fn test_events_load_builds_catalog() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    start_session(&app, &mut model);

    assert!(!model.events_loading);
    let view = app.view(&model);
    assert_eq!(view.total_event_count, 4);
    assert_eq!(view.events.len(), 4);
    assert_eq!(view.filters.available_countries, ["Portugal", "Spain"]);
    assert_eq!(view.filters.available_cities, ["Lisboa", "Madrid", "Porto"]);
    assert_eq!(view.display_name.as_deref(), Some("Ana"));
}

#[test]
fn test_country_change_drops_foreign_city() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    start_session(&app, &mut model);

    app.update(Event::CountrySelected("Portugal".into()), &mut model);
    assert_eq!(model.catalog.available_cities(), ["Lisboa", "Porto"]);

    app.update(Event::CitySelected("Lisboa".into()), &mut model);
    let view = app.view(&model);
    assert_eq!(view.events.len(), 2);
    assert_eq!(view.filters.selected_city.as_deref(), Some("Lisboa"));

    app.update(Event::CountrySelected("Spain".into()), &mut model);
    assert_eq!(model.filters.state().city(), &PlaceSelection::All);
    let view = app.view(&model);
    assert_eq!(view.events.len(), 1);
    assert_eq!(view.events[0].id, "md4444");
    assert_eq!(view.filters.available_cities, ["Madrid"]);
}

#[test]
fn test_category_and_clear_all() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    start_session(&app, &mut model);

    let update = app.update(
        Event::CategoryToggled(CategoryChoice::Type(EventType::Music)),
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
    let view = app.view(&model);
    assert_eq!(view.events.len(), 2);
    assert!(view.events.iter().all(|c| c.event_type == EventType::Music));
    // Ordered by earliest start.
    assert_eq!(view.events[0].id, "lx1");
    assert_eq!(view.filters.active_filter_count, 1);

    app.update(Event::CountrySelected("Spain".into()), &mut model);
    assert!(app.view(&model).events.is_empty());

    app.update(Event::ClearAllFilters, &mut model);
    let view = app.view(&model);
    assert_eq!(view.events.len(), 4);
    assert_eq!(view.filters.active_filter_count, 0);
    assert!(view.filters.categories[0].selected);
}

#[test]
fn test_show_on_map_flag_round_trip() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::ShowOnMapRequested, &mut model);
    assert!(app.view(&model).filters.should_navigate_to_map);

    app.update(Event::MapNavigationHandled, &mut model);
    assert!(!app.view(&model).filters.should_navigate_to_map);
}

#[test]
fn test_nearby_filter_requests_location() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    start_session(&app, &mut model);

    let update = app.update(Event::MapFilterToggled(true), &mut model);
    assert_eq!(model.location_permission, PermissionState::Requesting);
    // Nearby filter with no location matches nothing.
    assert!(app.view(&model).events.is_empty());

    let mut permission = update
        .effects
        .into_iter()
        .find_map(|e| match e {
            Effect::Location(request) => Some(request),
            _ => None,
        })
        .expect("permission request");
    assert_eq!(permission.operation, LocationOperation::RequestPermission);

    let update = app
        .resolve(&mut permission, LocationOutput::Permission(true))
        .expect("permission resolves");
    let mut position = None;
    for event in update.events {
        let update = app.update(event, &mut model);
        position = update.effects.into_iter().find_map(|e| match e {
            Effect::Location(request) => Some(request),
            _ => None,
        });
    }
    assert_eq!(model.location_permission, PermissionState::Granted);

    let mut position = position.expect("position request");
    assert_eq!(position.operation, LocationOperation::CurrentPosition);
    let update = app
        .resolve(
            &mut position,
            LocationOutput::Position(Some(LatLon::new(38.72, -9.14))),
        )
        .expect("position resolves");

    let mut reverse = None;
    for event in update.events {
        let update = app.update(event, &mut model);
        reverse = update.effects.into_iter().find_map(|e| match e {
            Effect::Geocode(request) => Some(request),
            _ => None,
        });
    }

    let view = app.view(&model);
    let ids: Vec<&str> = view.events.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["lx1", "lx22"]);
    assert!(view.events[0].distance_text.is_some());
    assert_eq!(view.map.center, Some(LatLon::new(38.72, -9.14)));

    let mut reverse = reverse.expect("reverse geocode request");
    assert!(matches!(reverse.operation, GeocodeOperation::Reverse { .. }));
    let update = app
        .resolve(&mut reverse, GeocodeOutput::Address(Some("Baixa, Lisboa".into())))
        .expect("reverse resolves");
    for event in update.events {
        app.update(event, &mut model);
    }
    assert_eq!(
        app.view(&model).filters.location_label.as_deref(),
        Some("Baixa, Lisboa")
    );
}

#[test]
fn test_denied_location_keeps_empty_nearby_list() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    start_session(&app, &mut model);

    app.update(Event::LocationPermissionResult { granted: false }, &mut model);
    assert!(model.location_permission.is_denied());
    assert!(model.active_error.is_none());

    let update = app.update(Event::MapFilterToggled(true), &mut model);
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Location(_))));
    assert!(app.view(&model).events.is_empty());
    assert_eq!(
        model.active_error.as_ref().map(|e| e.kind),
        Some(ErrorKind::LocationPermissionDenied)
    );

    app.update(Event::MapFilterToggled(false), &mut model);
    assert_eq!(app.view(&model).events.len(), 4);
}

#[test]
fn test_failed_fetch_reports_error() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::RefreshEvents, &mut model);
    assert!(model.events_loading);
    let mut fetch = backend_requests(update.effects).pop().unwrap();

    let update = app
        .resolve(
            &mut fetch,
            Err(culture_core::capabilities::BackendError::network("offline")),
        )
        .expect("fetch resolves");
    for event in update.events {
        app.update(event, &mut model);
    }

    assert!(!model.events_loading);
    let view = app.view(&model);
    assert!(view.error.as_ref().is_some_and(|e| e.is_retryable));

    app.update(Event::ErrorDismissed, &mut model);
    assert!(app.view(&model).error.is_none());
}

#[test]
fn test_denying_location_for_nearby_filter_reports_error() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    start_session(&app, &mut model);

    app.update(Event::MapFilterToggled(true), &mut model);
    assert_eq!(model.location_permission, PermissionState::Requesting);

    app.update(Event::LocationPermissionResult { granted: false }, &mut model);
    let error = app.view(&model).error.expect("permission error");
    assert_eq!(error.error_code, "LOCATION_PERMISSION_DENIED");
}
