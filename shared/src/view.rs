use geojson::{FeatureCollection, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::app::{Model, ToastKind, ToastMessage};
use crate::capabilities::{PermissionState, PlaceSuggestion};
use crate::drawing::{DrawingState, GestureKind};
use crate::error::{AppError, ErrorSeverity};
use crate::favorites::NotificationCategory;
use crate::filter::CategoryChoice;
use crate::geometry::{
    haversine_distance_km, point_feature, polygon_centroid, polygon_to_geojson, LatLon,
};
use crate::model::{CulturalEvent, EventType, ParticipationStatus};
use crate::participation::ParticipationRecord;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(t: &ToastMessage) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventCard {
    pub id: String,
    pub title: String,
    pub event_type: EventType,
    pub type_label: String,
    pub schedule_label: String,
    pub is_tba: bool,
    pub city: String,
    pub country: String,
    pub ticket_label: String,
    pub image: Option<String>,
    pub accessibility: Vec<String>,
    pub distance_text: Option<String>,
    pub is_favorite: bool,
    pub can_edit: bool,
    pub participation: Option<ParticipationStatus>,
}

impl EventCard {
    fn build(model: &Model, event: &CulturalEvent) -> Self {
        let distance_text = match (model.device_location, event.coordinates) {
            (Some(here), Some(there)) => Some(format_distance(haversine_distance_km(here, there))),
            _ => None,
        };
        Self {
            id: event.id.to_string(),
            title: event.title.clone(),
            event_type: event.event_type,
            type_label: event.event_type.display_name().to_string(),
            schedule_label: event.schedule_label(),
            is_tba: event.is_tba(),
            city: event.city.clone(),
            country: event.country.clone(),
            ticket_label: event.ticket.label(),
            image: event.images.first().cloned(),
            accessibility: event
                .accessibility
                .iter()
                .map(|f| f.display_name().to_string())
                .collect(),
            distance_text,
            is_favorite: model.favorites.is_event_favorited(&event.id),
            can_edit: model
                .user
                .as_ref()
                .is_some_and(|u| event.is_organized_by(&u.id)),
            participation: model.participation.status_for(&event.id),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryChipView {
    pub choice: CategoryChoice,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FilterPanelView {
    pub categories: Vec<CategoryChipView>,
    pub available_countries: Vec<String>,
    pub available_cities: Vec<String>,
    pub selected_country: Option<String>,
    pub selected_city: Option<String>,
    pub map_filter_enabled: bool,
    pub upcoming_only: bool,
    pub nearby_radius_text: String,
    pub location_label: Option<String>,
    pub location_permission: PermissionState,
    pub active_filter_count: usize,
    pub should_navigate_to_map: bool,
}

impl FilterPanelView {
    fn build(model: &Model) -> Self {
        let state = model.filters.state();
        let categories = std::iter::once(CategoryChoice::All)
            .chain(EventType::ALL.into_iter().map(CategoryChoice::Type))
            .map(|choice| CategoryChipView {
                label: match choice {
                    CategoryChoice::All => "All".to_string(),
                    CategoryChoice::Type(t) => t.display_name().to_string(),
                },
                selected: state.categories().is_selected(choice),
                choice,
            })
            .collect();

        Self {
            categories,
            available_countries: model.catalog.available_countries().to_vec(),
            available_cities: model.catalog.available_cities().to_vec(),
            selected_country: state.country().as_option().map(str::to_string),
            selected_city: state.city().as_option().map(str::to_string),
            map_filter_enabled: state.map_filter_enabled(),
            upcoming_only: state.upcoming_only(),
            nearby_radius_text: format_distance(model.config.nearby_radius_km),
            location_label: model.location_label.clone(),
            location_permission: model.location_permission,
            active_filter_count: state.active_filter_count(),
            should_navigate_to_map: state.should_navigate_to_map(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MapPin {
    pub id: String,
    pub title: String,
    pub event_type: EventType,
    pub coordinate: LatLon,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MapView {
    pub center: Option<LatLon>,
    pub device_location: Option<LatLon>,
    pub pins: Vec<MapPin>,
    /// `FeatureCollection` of the pins, ready for a map layer.
    pub pins_geojson: String,
    /// Closed polygon of the drawn area, when it has enough vertices.
    pub drawn_area_geojson: Option<String>,
    pub camera_gestures_enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrawingView {
    pub state: DrawingState,
    pub gesture: GestureKind,
    pub point_count: usize,
    pub can_apply: bool,
    pub polygon: Vec<LatLon>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NotificationToggleView {
    pub category: NotificationCategory,
    pub label: String,
    pub enabled: bool,
    pub awaiting_registration: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FavoritesView {
    pub event_ids: Vec<String>,
    pub person_ids: Vec<String>,
    pub notifications: Vec<NotificationToggleView>,
    pub registration_in_flight: bool,
    pub pending_writes: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParticipationView {
    pub pending_count: usize,
    pub records: Vec<ParticipationRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchView {
    pub query: Option<String>,
    pub suggestions: Vec<PlaceSuggestion>,
    pub is_loading: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub events: Vec<EventCard>,
    pub total_event_count: usize,
    pub events_loading: bool,
    pub filters: FilterPanelView,
    pub map: MapView,
    pub drawing: DrawingView,
    pub favorites: FavoritesView,
    pub participation: ParticipationView,
    pub search: SearchView,
    pub error: Option<UserFacingError>,
    pub toast: Option<ToastView>,
    pub is_authenticated: bool,
    pub user_id: Option<String>,
    pub display_name: Option<String>,
}

impl ViewModel {
    #[must_use]
    pub fn build(model: &Model) -> Self {
        let visible = model.filtered_events();
        let state = model.filters.state();

        let pins: Vec<MapPin> = visible
            .iter()
            .filter_map(|event| {
                event.coordinates.map(|coordinate| MapPin {
                    id: event.id.to_string(),
                    title: event.title.clone(),
                    event_type: event.event_type,
                    coordinate,
                })
            })
            .collect();

        let map = MapView {
            center: model
                .map_center
                .or_else(|| polygon_centroid(state.polygon()))
                .or(model.device_location),
            device_location: model.device_location,
            pins_geojson: pins_geojson(&pins),
            drawn_area_geojson: polygon_to_geojson(state.polygon())
                .and_then(|g| serde_json::to_string(&g).ok()),
            camera_gestures_enabled: model.drawing.camera_gestures_enabled(state),
            pins,
        };

        let drawing_state = model.drawing.state(state);
        let drawing = DrawingView {
            state: drawing_state,
            gesture: model.drawing.gesture(),
            point_count: state.polygon().len(),
            can_apply: drawing_state == DrawingState::PolygonReady,
            polygon: state.polygon().to_vec(),
        };

        let favorites = &model.favorites;
        let favorites_view = FavoritesView {
            event_ids: favorites
                .state()
                .favorite_events
                .iter()
                .map(ToString::to_string)
                .collect(),
            person_ids: favorites
                .state()
                .favorite_people
                .iter()
                .map(ToString::to_string)
                .collect(),
            notifications: NotificationCategory::ALL
                .into_iter()
                .map(|category| NotificationToggleView {
                    category,
                    label: category.display_name().to_string(),
                    enabled: favorites.is_global_notification_enabled(category),
                    awaiting_registration: favorites.is_awaiting_registration(category),
                })
                .collect(),
            registration_in_flight: favorites.registration_in_flight(),
            pending_writes: favorites.pending_writes(),
        };

        Self {
            events: visible
                .iter()
                .map(|event| EventCard::build(model, event))
                .collect(),
            total_event_count: model.events.len(),
            events_loading: model.events_loading,
            filters: FilterPanelView::build(model),
            map,
            drawing,
            favorites: favorites_view,
            participation: ParticipationView {
                pending_count: model.participation.pending_count(),
                records: model.participation.records().collect(),
            },
            search: SearchView {
                query: model.search.current_query().map(str::to_string),
                suggestions: model.search.suggestions().to_vec(),
                is_loading: model.search.is_loading(),
            },
            error: model.active_error.as_ref().map(UserFacingError::from),
            toast: model.active_toast.as_ref().map(ToastView::from),
            is_authenticated: model.is_authenticated(),
            user_id: model.user.as_ref().map(|u| u.id.to_string()),
            display_name: model
                .user
                .as_ref()
                .map(|u| u.display_name.clone())
                .filter(|n| !n.is_empty()),
        }
    }
}

fn pins_geojson(pins: &[MapPin]) -> String {
    let features = pins
        .iter()
        .map(|pin| {
            let mut properties = JsonObject::new();
            properties.insert("title".into(), JsonValue::from(pin.title.clone()));
            properties.insert("type".into(), JsonValue::from(pin.event_type.as_str()));
            point_feature(&pin.id, pin.coordinate, properties)
        })
        .collect();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    serde_json::to_string(&collection).unwrap_or_default()
}

#[must_use]
pub fn format_distance(km: f64) -> String {
    if !km.is_finite() || km < 0.0 {
        return "Unknown".to_string();
    }

    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else if km < 10.0 {
        format!("{km:.1} km")
    } else {
        format!("{:.0} km", km.round())
    }
}
