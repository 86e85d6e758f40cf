use serde::{Deserialize, Serialize};

use crate::authoring::EventDraft;
use crate::capabilities::{BackendError, PlaceSuggestion, PushResult};
use crate::config::CoreConfig;
use crate::drawing::TouchInput;
use crate::favorites::{FavoriteState, FavoriteTarget, NotificationCategory};
use crate::filter::CategoryChoice;
use crate::geometry::LatLon;
use crate::model::{CulturalEvent, CurrentUser, EventId, ParticipationStatus, UserId};
use crate::participation::ParticipationRecord;

// Variants marked `serde(skip)` are capability completions; the shell
// never sends them. User-scoped completions carry the user they were
// requested for.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Session
    Configure(CoreConfig),
    SessionStarted {
        user: CurrentUser,
    },
    SessionEnded,
    Tick {
        timestamp_ms: u64,
    },

    // Event collection
    RefreshEvents,
    #[serde(skip)]
    EventsLoaded(Result<Vec<CulturalEvent>, BackendError>),

    // Filters
    CategoryToggled(CategoryChoice),
    CategoriesSelected(Vec<CategoryChoice>),
    CountrySelected(String),
    CitySelected(String),
    MapFilterToggled(bool),
    UpcomingOnlyToggled(bool),
    ClearAllFilters,
    ShowOnMapRequested,
    MapNavigationHandled,

    // Drawing
    DrawingStarted,
    DrawingCancelled,
    DrawingCleared,
    DrawnAreaApplied,
    MapTouch(TouchInput),
    MapMoved {
        center: LatLon,
    },

    // Device location
    LocationRequested,
    #[serde(skip)]
    LocationPermissionResult {
        granted: bool,
    },
    #[serde(skip)]
    LocationReceived(Option<LatLon>),
    #[serde(skip)]
    LocationLabelResolved(Option<String>),

    // Place search
    AddressSearchRequested {
        query: String,
    },
    #[serde(skip)]
    AddressSuggestionsReceived {
        query: String,
        suggestions: Vec<PlaceSuggestion>,
    },
    SuggestionSelected {
        index: usize,
    },
    SearchCleared,

    // Favorites & notifications
    FavoriteSet {
        target: FavoriteTarget,
        favorite: bool,
    },
    #[serde(skip)]
    FavoritesLoaded {
        user_id: UserId,
        result: Result<(FavoriteState, Option<String>), BackendError>,
    },
    #[serde(skip)]
    FavoriteWriteCompleted {
        target: FavoriteTarget,
        mutation_id: String,
        result: Result<(), BackendError>,
    },
    NotificationSettingChanged {
        category: NotificationCategory,
        enabled: bool,
    },
    #[serde(skip)]
    NotificationWriteCompleted {
        category: NotificationCategory,
        mutation_id: String,
        result: Result<(), BackendError>,
    },
    #[serde(skip)]
    PushRegistrationCompleted {
        user_id: UserId,
        result: PushResult,
    },
    #[serde(skip)]
    PushTokenSaved(Result<(), BackendError>),

    // Participation
    #[serde(skip)]
    ParticipationsLoaded {
        user_id: UserId,
        result: Result<Vec<ParticipationRecord>, BackendError>,
    },
    TagResponded {
        event_id: EventId,
        status: ParticipationStatus,
    },
    #[serde(skip)]
    TagResponseCompleted {
        event_id: EventId,
        mutation_id: String,
        result: Result<(), BackendError>,
    },

    // Authoring
    CreateEventRequested(Box<EventDraft>),
    UpdateEventRequested {
        id: EventId,
        draft: Box<EventDraft>,
    },
    DeleteEventRequested {
        id: EventId,
    },
    #[serde(skip)]
    EventSaved(Result<CulturalEvent, BackendError>),
    #[serde(skip)]
    EventDeleted(Result<EventId, BackendError>),

    // UI
    ErrorDismissed,
    ToastDismissed,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::SessionStarted { .. } => "session_started",
            Self::SessionEnded => "session_ended",
            Self::Tick { .. } => "tick",
            Self::RefreshEvents => "refresh_events",
            Self::EventsLoaded(_) => "events_loaded",
            Self::CategoryToggled(_) => "category_toggled",
            Self::CategoriesSelected(_) => "categories_selected",
            Self::CountrySelected(_) => "country_selected",
            Self::CitySelected(_) => "city_selected",
            Self::MapFilterToggled(_) => "map_filter_toggled",
            Self::UpcomingOnlyToggled(_) => "upcoming_only_toggled",
            Self::ClearAllFilters => "clear_all_filters",
            Self::ShowOnMapRequested => "show_on_map_requested",
            Self::MapNavigationHandled => "map_navigation_handled",
            Self::DrawingStarted => "drawing_started",
            Self::DrawingCancelled => "drawing_cancelled",
            Self::DrawingCleared => "drawing_cleared",
            Self::DrawnAreaApplied => "drawn_area_applied",
            Self::MapTouch(_) => "map_touch",
            Self::MapMoved { .. } => "map_moved",
            Self::LocationRequested => "location_requested",
            Self::LocationPermissionResult { .. } => "location_permission_result",
            Self::LocationReceived(_) => "location_received",
            Self::LocationLabelResolved(_) => "location_label_resolved",
            Self::AddressSearchRequested { .. } => "address_search_requested",
            Self::AddressSuggestionsReceived { .. } => "address_suggestions_received",
            Self::SuggestionSelected { .. } => "suggestion_selected",
            Self::SearchCleared => "search_cleared",
            Self::FavoriteSet { .. } => "favorite_set",
            Self::FavoritesLoaded { .. } => "favorites_loaded",
            Self::FavoriteWriteCompleted { .. } => "favorite_write_completed",
            Self::NotificationSettingChanged { .. } => "notification_setting_changed",
            Self::NotificationWriteCompleted { .. } => "notification_write_completed",
            Self::PushRegistrationCompleted { .. } => "push_registration_completed",
            Self::PushTokenSaved(_) => "push_token_saved",
            Self::ParticipationsLoaded { .. } => "participations_loaded",
            Self::TagResponded { .. } => "tag_responded",
            Self::TagResponseCompleted { .. } => "tag_response_completed",
            Self::CreateEventRequested(_) => "create_event_requested",
            Self::UpdateEventRequested { .. } => "update_event_requested",
            Self::DeleteEventRequested { .. } => "delete_event_requested",
            Self::EventSaved(_) => "event_saved",
            Self::EventDeleted(_) => "event_deleted",
            Self::ErrorDismissed => "error_dismissed",
            Self::ToastDismissed => "toast_dismissed",
        }
    }

    /// High-frequency inputs that should not be logged per event.
    #[must_use]
    pub const fn is_high_frequency(&self) -> bool {
        matches!(self, Self::MapTouch(_) | Self::Tick { .. } | Self::MapMoved { .. })
    }
}
