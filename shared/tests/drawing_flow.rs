use crux_core::testing::AppTester;

use culture_core::drawing::{DrawingState, GestureKind, TouchInput};
use culture_core::geometry::LatLon;
use culture_core::model::{CulturalEvent, EventId};
use culture_core::{App, Effect, Event, Model};

fn at(id: &str, lat: f64, lon: f64) -> CulturalEvent {
    CulturalEvent {
        id: EventId::new(id),
        coordinates: Some(LatLon::new(lat, lon)),
        ..CulturalEvent::default()
    }
}

fn loaded_model(app: &AppTester<App, Effect>) -> Model {
    let mut model = Model::default();
    app.update(
        Event::EventsLoaded(Ok(vec![
            at("inside", 38.70, -9.15),
            at("outside", 41.15, -8.61),
            at("nowhere", 0.0, 0.0),
        ])),
        &mut model,
    );
    model
}

fn touch(app: &AppTester<App, Effect>, model: &mut Model, input: TouchInput) {
    app.update(Event::MapTouch(input), model);
}

fn drag(app: &AppTester<App, Effect>, model: &mut Model, points: &[LatLon], start_ms: u64) {
    touch(
        app,
        model,
        TouchInput::Start {
            pointer_count: 1,
            timestamp_ms: start_ms,
        },
    );
    for (i, point) in points.iter().enumerate() {
        touch(
            app,
            model,
            TouchInput::Move {
                pointer_count: 1,
                coordinate: *point,
                timestamp_ms: start_ms + 250 * (i as u64 + 1),
            },
        );
    }
    touch(
        app,
        model,
        TouchInput::End {
            remaining_pointers: 0,
            timestamp_ms: start_ms + 250 * (points.len() as u64 + 1),
        },
    );
}

fn lisbon_square() -> Vec<LatLon> {
    vec![
        LatLon::new(38.6, -9.3),
        LatLon::new(38.6, -9.0),
        LatLon::new(38.8, -9.0),
        LatLon::new(38.8, -9.3),
    ]
}

#[test]
fn test_drag_then_cancel_leaves_no_area() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);

    app.update(Event::DrawingStarted, &mut model);
    assert_eq!(app.view(&model).drawing.state, DrawingState::Drawing);
    assert!(!app.view(&model).map.camera_gestures_enabled);

    drag(&app, &mut model, &lisbon_square()[..3], 0);
    let view = app.view(&model);
    assert_eq!(view.drawing.point_count, 3);
    assert!(view.drawing.can_apply);

    app.update(Event::DrawingCancelled, &mut model);
    let view = app.view(&model);
    assert_eq!(view.drawing.state, DrawingState::Idle);
    assert_eq!(view.drawing.point_count, 0);
    assert!(view.map.camera_gestures_enabled);
    assert_eq!(view.events.len(), 3);
}

#[test]
fn test_applied_area_restricts_events() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);

    app.update(Event::DrawingStarted, &mut model);
    drag(&app, &mut model, &lisbon_square(), 0);
    app.update(Event::DrawnAreaApplied, &mut model);

    let view = app.view(&model);
    assert_eq!(view.drawing.state, DrawingState::Applied);
    assert!(view.filters.map_filter_enabled);
    assert_eq!(view.events.len(), 1);
    assert_eq!(view.events[0].id, "inside");
    assert!(view.map.drawn_area_geojson.is_some());
    assert_eq!(view.map.pins.len(), 1);
}

#[test]
fn test_cancel_restores_applied_area() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);

    app.update(Event::DrawingStarted, &mut model);
    drag(&app, &mut model, &lisbon_square(), 0);
    app.update(Event::DrawnAreaApplied, &mut model);

    app.update(Event::DrawingStarted, &mut model);
    drag(
        &app,
        &mut model,
        &[
            LatLon::new(41.0, -8.7),
            LatLon::new(41.0, -8.5),
            LatLon::new(41.3, -8.5),
        ],
        5_000,
    );
    app.update(Event::DrawingCancelled, &mut model);

    let view = app.view(&model);
    assert_eq!(view.drawing.polygon, lisbon_square());
    assert_eq!(view.drawing.state, DrawingState::Applied);
    assert_eq!(view.events[0].id, "inside");
}

#[test]
fn test_clear_all_filters_forgets_area_saved_by_drawing() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);

    app.update(Event::DrawingStarted, &mut model);
    drag(&app, &mut model, &lisbon_square(), 0);
    app.update(Event::DrawnAreaApplied, &mut model);

    app.update(Event::DrawingStarted, &mut model);
    app.update(Event::ClearAllFilters, &mut model);
    app.update(Event::DrawingCancelled, &mut model);

    let view = app.view(&model);
    assert!(view.drawing.polygon.is_empty());
    assert_eq!(view.drawing.state, DrawingState::Idle);

    app.update(Event::MapFilterToggled(true), &mut model);
    let view = app.view(&model);
    assert!(view.drawing.polygon.is_empty());
    assert!(view.map.drawn_area_geojson.is_none());
}

#[test]
fn test_second_finger_discards_provisional_points() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);
    app.update(Event::DrawingStarted, &mut model);

    touch(
        &app,
        &mut model,
        TouchInput::Start {
            pointer_count: 1,
            timestamp_ms: 0,
        },
    );
    touch(
        &app,
        &mut model,
        TouchInput::Move {
            pointer_count: 1,
            coordinate: LatLon::new(38.7, -9.1),
            timestamp_ms: 50,
        },
    );
    touch(
        &app,
        &mut model,
        TouchInput::Start {
            pointer_count: 2,
            timestamp_ms: 100,
        },
    );
    let view = app.view(&model);
    assert_eq!(view.drawing.gesture, GestureKind::MultiFinger);
    assert!(view.map.camera_gestures_enabled);

    touch(
        &app,
        &mut model,
        TouchInput::Move {
            pointer_count: 2,
            coordinate: LatLon::new(38.8, -9.2),
            timestamp_ms: 400,
        },
    );
    touch(
        &app,
        &mut model,
        TouchInput::End {
            remaining_pointers: 0,
            timestamp_ms: 500,
        },
    );

    let view = app.view(&model);
    assert_eq!(view.drawing.point_count, 0);
    assert_eq!(view.drawing.gesture, GestureKind::None);
    assert!(!view.map.camera_gestures_enabled);
}

#[test]
fn test_tick_confirms_held_point() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);
    app.update(Event::DrawingStarted, &mut model);

    touch(
        &app,
        &mut model,
        TouchInput::Start {
            pointer_count: 1,
            timestamp_ms: 1_000,
        },
    );
    touch(
        &app,
        &mut model,
        TouchInput::Move {
            pointer_count: 1,
            coordinate: LatLon::new(38.7, -9.1),
            timestamp_ms: 1_020,
        },
    );
    assert_eq!(app.view(&model).drawing.point_count, 0);

    let update = app.update(Event::Tick { timestamp_ms: 1_100 }, &mut model);
    assert!(update.effects.is_empty());

    let update = app.update(Event::Tick { timestamp_ms: 1_250 }, &mut model);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
    assert_eq!(app.view(&model).drawing.point_count, 1);
}

#[test]
fn test_apply_needs_three_points() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);

    app.update(Event::DrawnAreaApplied, &mut model);
    assert!(app.view(&model).error.is_some());
    app.update(Event::ErrorDismissed, &mut model);

    app.update(Event::DrawingStarted, &mut model);
    drag(&app, &mut model, &lisbon_square()[..2], 0);
    app.update(Event::DrawnAreaApplied, &mut model);

    let view = app.view(&model);
    assert!(view.error.is_some());
    assert_eq!(view.drawing.state, DrawingState::Drawing);
    assert!(!view.filters.map_filter_enabled);

    app.update(Event::DrawingCleared, &mut model);
    assert_eq!(app.view(&model).drawing.point_count, 0);
}

#[test]
fn test_touches_ignored_outside_drawing_mode() {
    let app = AppTester::<App, Effect>::default();
    let mut model = loaded_model(&app);

    drag(&app, &mut model, &lisbon_square(), 0);
    let view = app.view(&model);
    assert_eq!(view.drawing.point_count, 0);
    assert_eq!(view.drawing.state, DrawingState::Idle);
}
