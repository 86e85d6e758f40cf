use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::authoring::{ensure_organizer, EventDraft};
use crate::capabilities::{
    unexpected, BackendError, BackendOperation, BackendOutput, Capabilities, PermissionState,
    PushResult,
};
use crate::catalog::DerivedCatalog;
use crate::config::CoreConfig;
use crate::drawing::PolygonDrawing;
use crate::error::{AppError, ErrorKind};
use crate::event::Event;
use crate::favorites::{
    FavoriteTarget, FavoritesStore, NotificationCategory, NotificationChange, WriteTarget,
};
use crate::filter::{FilterContext, FilterStore, PlaceSelection};
use crate::geometry::LatLon;
use crate::model::{CulturalEvent, CurrentUser, EventId, ParticipationStatus, UserId};
use crate::participation::ParticipationStore;
use crate::search::{PlaceSearch, SearchStep};
use crate::view::ViewModel;
use crate::get_current_time_ms;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub created_at_ms: u64,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind, now_ms: u64) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at_ms: now_ms,
            duration_ms: kind.default_duration_ms(),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

pub struct Model {
    pub config: CoreConfig,
    pub user: Option<CurrentUser>,
    pub events: Vec<CulturalEvent>,
    pub events_loading: bool,
    pub filters: FilterStore,
    pub catalog: DerivedCatalog,
    pub drawing: PolygonDrawing,
    pub favorites: FavoritesStore,
    pub participation: ParticipationStore,
    pub search: PlaceSearch,
    pub device_location: Option<LatLon>,
    pub location_label: Option<String>,
    pub location_permission: PermissionState,
    pub map_center: Option<LatLon>,
    pub active_error: Option<AppError>,
    pub active_toast: Option<ToastMessage>,
    pub view_timestamp_ms: u64,
}

impl Default for Model {
    fn default() -> Self {
        let config = CoreConfig::default();
        Self {
            drawing: PolygonDrawing::from_config(&config),
            search: PlaceSearch::new(config.geocode_cache_capacity, config.min_geocode_query_len),
            config,
            user: None,
            events: Vec::new(),
            events_loading: false,
            filters: FilterStore::new(),
            catalog: DerivedCatalog::default(),
            favorites: FavoritesStore::new(),
            participation: ParticipationStore::new(),
            device_location: None,
            location_label: None,
            location_permission: PermissionState::Unknown,
            map_center: None,
            active_error: None,
            active_toast: None,
            view_timestamp_ms: get_current_time_ms(),
        }
    }
}

impl Model {
    pub fn update_timestamp(&mut self) {
        self.view_timestamp_ms = get_current_time_ms();
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        i64::try_from(self.view_timestamp_ms)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now)
    }

    #[must_use]
    pub fn filter_context(&self) -> FilterContext {
        FilterContext {
            reference: self.device_location,
            radius_km: self.config.nearby_radius_km,
            now: self.now(),
        }
    }

    #[must_use]
    pub fn filtered_events(&self) -> Vec<&CulturalEvent> {
        self.filters
            .filtered_events(&self.events, &self.filter_context())
    }

    #[must_use]
    pub fn find_event(&self, id: &EventId) -> Option<&CulturalEvent> {
        self.events.iter().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Rebuilds the catalog and drops a city the new catalog no longer has.
    pub fn rebuild_catalog(&mut self) {
        self.catalog = DerivedCatalog::build(&self.events, self.filters.state().country());
        self.filters.reconcile_city(&self.catalog);
    }

    pub fn apply_config(&mut self, config: CoreConfig) {
        self.drawing.reconfigure(&config);
        self.search
            .resize(config.geocode_cache_capacity, config.min_geocode_query_len);
        self.config = config;
    }

    pub fn upsert_event(&mut self, event: CulturalEvent) {
        if let Some(index) = self.events.iter().position(|e| e.id == event.id) {
            self.events[index] = event;
        } else {
            self.events.push(event);
        }
        self.rebuild_catalog();
    }

    pub fn remove_event(&mut self, id: &EventId) -> bool {
        let before = self.events.len();
        self.events.retain(|e| &e.id != id);
        let removed = self.events.len() != before;
        if removed {
            self.rebuild_catalog();
        }
        removed
    }

    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind, self.view_timestamp_ms));
    }

    /// Surfaces a failure as the active error plus an error toast.
    pub fn report(&mut self, error: AppError) {
        warn!(code = error.code(), error = %error, "operation failed");
        self.show_toast(error.user_facing_message(), ToastKind::Error);
        self.active_error = Some(error);
    }

    /// Resets everything tied to the signed-in user. Loaded events stay.
    pub fn end_session(&mut self) {
        self.user = None;
        self.favorites.clear();
        self.participation.clear();
        self.filters = FilterStore::new();
        self.drawing.reset();
        self.search.clear();
        self.active_error = None;
        self.rebuild_catalog();
    }
}

#[derive(Default)]
pub struct App;

impl App {
    fn signed_in_user(model: &mut Model) -> Option<CurrentUser> {
        let user = model.user.clone();
        if user.is_none() {
            model.report(AppError::new(
                ErrorKind::Authentication,
                "sign in required for this action",
            ));
        }
        user
    }

    fn is_current_user(model: &Model, user_id: &UserId, event: &'static str) -> bool {
        let current = model.user.as_ref().is_some_and(|user| &user.id == user_id);
        if !current {
            debug!(%user_id, event, "dropping completion from an ended session");
        }
        current
    }

    fn request_location(model: &mut Model, caps: &Capabilities) {
        if model.location_permission.is_granted() {
            caps.location.current_position(Event::LocationReceived);
        } else {
            model.location_permission = PermissionState::Requesting;
            caps.location
                .request_permission(|granted| Event::LocationPermissionResult { granted });
        }
    }

    fn report_location_denied(model: &mut Model) {
        model.report(AppError::new(
            ErrorKind::LocationPermissionDenied,
            "location permission denied",
        ));
    }

    fn request_events(model: &mut Model, caps: &Capabilities) {
        model.events_loading = true;
        caps.backend.fetch_events(Event::EventsLoaded);
    }

    fn set_favorite(
        model: &mut Model,
        caps: &Capabilities,
        target: FavoriteTarget,
        favorite: bool,
    ) {
        let Some(user) = Self::signed_in_user(model) else {
            return;
        };
        if !model.favorites.set_favorite(&target, favorite) {
            return;
        }
        let mutation_id = model
            .favorites
            .record_write(WriteTarget::Favorite(target.clone()));
        debug!(?target, favorite, %mutation_id, "favorite changed locally");

        let op = BackendOperation::SetFavorite {
            user_id: user.id,
            target: target.clone(),
            favorite,
            mutation_id: mutation_id.clone(),
        };
        caps.backend.write(op, move |result| Event::FavoriteWriteCompleted {
            target,
            mutation_id,
            result,
        });
    }

    fn persist_notification_setting(
        model: &mut Model,
        caps: &Capabilities,
        user: &CurrentUser,
        category: NotificationCategory,
        enabled: bool,
    ) {
        let mutation_id = model
            .favorites
            .record_write(WriteTarget::Notification(category));
        let op = BackendOperation::SetNotificationSetting {
            user_id: user.id.clone(),
            category,
            enabled,
            mutation_id: mutation_id.clone(),
        };
        caps.backend.write(op, move |result| Event::NotificationWriteCompleted {
            category,
            mutation_id,
            result,
        });
    }

    fn change_notification_setting(
        model: &mut Model,
        caps: &Capabilities,
        category: NotificationCategory,
        enabled: bool,
    ) {
        let Some(user) = Self::signed_in_user(model) else {
            return;
        };
        match model
            .favorites
            .update_global_notification_setting(category, enabled)
        {
            NotificationChange::Unchanged | NotificationChange::AwaitingRegistration => {}
            NotificationChange::Applied { enabled } => {
                Self::persist_notification_setting(model, caps, &user, category, enabled);
            }
            NotificationChange::NeedsRegistration => {
                info!(?category, "requesting push registration");
                let user_id = user.id.clone();
                caps.push.register(user.id, move |result| {
                    Event::PushRegistrationCompleted { user_id, result }
                });
            }
        }
    }

    fn push_registration_completed(model: &mut Model, caps: &Capabilities, result: PushResult) {
        match result {
            Ok(Some(token)) => {
                let enabled = model.favorites.registration_succeeded(token.clone());
                if let Some(user) = model.user.clone() {
                    caps.backend.write(
                        BackendOperation::SavePushToken {
                            user_id: user.id.clone(),
                            token,
                        },
                        Event::PushTokenSaved,
                    );
                    for category in enabled {
                        Self::persist_notification_setting(model, caps, &user, category, true);
                    }
                }
                model.show_toast("Notifications enabled", ToastKind::Success);
            }
            Ok(None) => {
                let dropped = model.favorites.registration_failed();
                info!(categories = dropped.len(), "push permission declined");
                model.show_toast(
                    "Notifications stay off until you allow them in Settings",
                    ToastKind::Warning,
                );
            }
            Err(e) => {
                model.favorites.registration_failed();
                model.report(e.into());
            }
        }
    }

    fn respond_to_tag(
        model: &mut Model,
        caps: &Capabilities,
        event_id: EventId,
        status: ParticipationStatus,
    ) {
        let Some(user) = Self::signed_in_user(model) else {
            return;
        };
        match model.participation.respond(&event_id, status) {
            Ok(Some(mutation_id)) => {
                let op = BackendOperation::RespondToTag {
                    user_id: user.id,
                    event_id: event_id.clone(),
                    status,
                    mutation_id: mutation_id.clone(),
                };
                caps.backend.write(op, move |result| Event::TagResponseCompleted {
                    event_id,
                    mutation_id,
                    result,
                });
            }
            Ok(None) => {}
            Err(e) => model.report(e.into()),
        }
    }

    fn create_event(model: &mut Model, caps: &Capabilities, draft: EventDraft) {
        let Some(user) = Self::signed_in_user(model) else {
            return;
        };
        if let Err(e) = draft.validate() {
            model.report(e.into());
            return;
        }
        let event = draft.into_event(EventId::generate(), &user);
        info!(event_id = %event.id, "creating event");
        caps.backend
            .request(BackendOperation::CreateEvent { event }, Self::saved_event);
    }

    fn update_event(model: &mut Model, caps: &Capabilities, id: &EventId, draft: EventDraft) {
        let Some(user) = Self::signed_in_user(model) else {
            return;
        };
        let Some(existing) = model.find_event(id).cloned() else {
            model.report(
                AppError::new(ErrorKind::NotFound, "event not found")
                    .with_context("event_id", id.as_str()),
            );
            return;
        };
        if let Err(e) = ensure_organizer(&existing, &user) {
            model.report(e);
            return;
        }
        if let Err(e) = draft.validate() {
            model.report(e.into());
            return;
        }
        let event = draft.apply_to(&existing);
        caps.backend
            .request(BackendOperation::UpdateEvent { event }, Self::saved_event);
    }

    fn delete_event(model: &mut Model, caps: &Capabilities, id: EventId) {
        let Some(user) = Self::signed_in_user(model) else {
            return;
        };
        match model
            .find_event(&id)
            .map(|existing| ensure_organizer(existing, &user))
        {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                model.report(e);
                return;
            }
            None => {
                model.report(
                    AppError::new(ErrorKind::NotFound, "event not found")
                        .with_context("event_id", id.as_str()),
                );
                return;
            }
        }
        caps.backend
            .request(BackendOperation::DeleteEvent { id }, |result| {
                Event::EventDeleted(result.and_then(|output| match output {
                    BackendOutput::Deleted(id) => Ok(id),
                    other => Err(unexpected("delete_event", &other)),
                }))
            });
    }

    fn saved_event(result: Result<BackendOutput, BackendError>) -> Event {
        Event::EventSaved(result.and_then(|output| match output {
            BackendOutput::Event(event) => Ok(event),
            other => Err(unexpected("save_event", &other)),
        }))
    }

    /// Stale failures are dropped; the latest one is surfaced. Optimistic
    /// state is not rolled back.
    fn write_completed(model: &mut Model, latest: bool, result: Result<(), BackendError>) {
        match result {
            Ok(()) => {}
            Err(e) if latest => model.report(e.into()),
            Err(e) => debug!(error = %e, "ignoring failure of superseded write"),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        model.update_timestamp();

        if event.is_high_frequency() {
            trace!(event = event.name(), "update");
        } else {
            debug!(event = event.name(), "update");
        }

        match event {
            Event::Configure(config) => match config.validate() {
                Ok(()) => {
                    info!(?config, "configuration applied");
                    model.apply_config(config);
                }
                Err(e) => model.report(e.into()),
            },

            Event::SessionStarted { user } => {
                info!(user_id = %user.id, "session started");
                model.favorites.clear();
                model.participation.clear();
                let user_id = user.id.clone();
                caps.backend.load_favorites(user.id.clone(), move |result| {
                    Event::FavoritesLoaded { user_id, result }
                });
                let user_id = user.id.clone();
                caps.backend.load_participations(user.id.clone(), move |result| {
                    Event::ParticipationsLoaded { user_id, result }
                });
                model.user = Some(user);
                Self::request_events(model, caps);
            }

            Event::SessionEnded => {
                info!("session ended");
                model.end_session();
            }

            Event::Tick { timestamp_ms } => {
                let added = model.drawing.tick(&mut model.filters, timestamp_ms);
                let toast_expired = model
                    .active_toast
                    .as_ref()
                    .is_some_and(|t| t.is_expired(model.view_timestamp_ms));
                if toast_expired {
                    model.active_toast = None;
                }
                if added == 0 && !toast_expired {
                    return;
                }
            }

            Event::RefreshEvents => Self::request_events(model, caps),

            Event::EventsLoaded(result) => {
                model.events_loading = false;
                match result {
                    Ok(events) => {
                        info!(count = events.len(), "events loaded");
                        model.events = events;
                        model.rebuild_catalog();
                    }
                    Err(e) => model.report(e.into()),
                }
            }

            Event::CategoryToggled(choice) => model.filters.toggle_type(choice),

            Event::CategoriesSelected(choices) => model.filters.set_selected_types(&choices),

            Event::CountrySelected(raw) => {
                if model
                    .filters
                    .set_selected_country(PlaceSelection::from_input(&raw))
                {
                    model.rebuild_catalog();
                }
            }

            Event::CitySelected(raw) => {
                model
                    .filters
                    .set_selected_city(PlaceSelection::from_input(&raw));
            }

            Event::MapFilterToggled(enabled) => {
                model.filters.set_map_filter_enabled(enabled);
                let needs_location = enabled
                    && model.device_location.is_none()
                    && !model.filters.state().has_polygon();
                if needs_location {
                    if model.location_permission.is_denied() {
                        Self::report_location_denied(model);
                    } else {
                        Self::request_location(model, caps);
                    }
                }
            }

            Event::UpcomingOnlyToggled(upcoming) => model.filters.set_upcoming_only(upcoming),

            Event::ClearAllFilters => {
                model.filters.clear_all_filters();
                model.drawing.reset();
                model.rebuild_catalog();
            }

            Event::ShowOnMapRequested => model.filters.set_should_navigate_to_map(true),

            Event::MapNavigationHandled => model.filters.set_should_navigate_to_map(false),

            Event::DrawingStarted => model.drawing.begin(&mut model.filters),

            Event::DrawingCancelled => model.drawing.cancel(&mut model.filters),

            Event::DrawingCleared => {
                if let Err(e) = model.drawing.clear(&mut model.filters) {
                    model.report(e.into());
                }
            }

            Event::DrawnAreaApplied => match model.drawing.apply(&mut model.filters) {
                Ok(_) => model.show_toast("Showing events in the drawn area", ToastKind::Success),
                Err(e) => model.report(e.into()),
            },

            Event::MapTouch(input) => {
                let gesture_before = model.drawing.gesture();
                let added = model.drawing.handle_touch(&mut model.filters, &input);
                if added == 0 && model.drawing.gesture() == gesture_before {
                    return;
                }
            }

            Event::MapMoved { center } => match center.validate() {
                Ok(center) => model.map_center = Some(center),
                Err(e) => {
                    debug!(error = %e, "ignoring invalid map center");
                    return;
                }
            },

            Event::LocationRequested => Self::request_location(model, caps),

            Event::LocationPermissionResult { granted } => {
                model.location_permission = if granted {
                    PermissionState::Granted
                } else {
                    PermissionState::Denied
                };
                info!(granted, "location permission");
                if granted {
                    caps.location.current_position(Event::LocationReceived);
                } else if model.filters.state().map_filter_enabled()
                    && !model.filters.state().has_polygon()
                {
                    Self::report_location_denied(model);
                }
            }

            Event::LocationReceived(position) => match position {
                Some(position) => {
                    model.device_location = Some(position);
                    model.map_center.get_or_insert(position);
                    caps.geocode.reverse(position, Event::LocationLabelResolved);
                }
                None => model.report(AppError::new(
                    ErrorKind::Location,
                    "no position fix from the device",
                )),
            },

            Event::LocationLabelResolved(label) => model.location_label = label,

            Event::AddressSearchRequested { query } => {
                if let SearchStep::Lookup(query) = model.search.search(&query) {
                    let lookup = query.clone();
                    caps.geocode.search(lookup, move |suggestions| {
                        Event::AddressSuggestionsReceived { query, suggestions }
                    });
                }
            }

            Event::AddressSuggestionsReceived { query, suggestions } => {
                model.search.receive(&query, suggestions);
            }

            Event::SuggestionSelected { index } => {
                if let Some(place) = model.search.select(index) {
                    debug!(label = %place.label, "place selected");
                    model.map_center = Some(place.coordinate);
                }
            }

            Event::SearchCleared => model.search.clear(),

            Event::FavoriteSet { target, favorite } => {
                Self::set_favorite(model, caps, target, favorite);
            }

            Event::FavoritesLoaded { user_id, result } => {
                if !Self::is_current_user(model, &user_id, "favorites_loaded") {
                    return;
                }
                match result {
                    Ok((state, push_token)) => model.favorites.hydrate(state, push_token),
                    Err(e) => model.report(e.into()),
                }
            }

            Event::FavoriteWriteCompleted {
                target,
                mutation_id,
                result,
            } => {
                let latest = model
                    .favorites
                    .complete_write(&WriteTarget::Favorite(target), &mutation_id);
                Self::write_completed(model, latest, result);
            }

            Event::NotificationSettingChanged { category, enabled } => {
                Self::change_notification_setting(model, caps, category, enabled);
            }

            Event::NotificationWriteCompleted {
                category,
                mutation_id,
                result,
            } => {
                let latest = model
                    .favorites
                    .complete_write(&WriteTarget::Notification(category), &mutation_id);
                Self::write_completed(model, latest, result);
            }

            Event::PushRegistrationCompleted { user_id, result } => {
                if !Self::is_current_user(model, &user_id, "push_registration_completed") {
                    return;
                }
                Self::push_registration_completed(model, caps, result);
            }

            Event::PushTokenSaved(result) => {
                if let Err(e) = result {
                    model.report(e.into());
                }
            }

            Event::ParticipationsLoaded { user_id, result } => {
                if !Self::is_current_user(model, &user_id, "participations_loaded") {
                    return;
                }
                match result {
                    Ok(records) => model.participation.hydrate(records),
                    Err(e) => model.report(e.into()),
                }
            }

            Event::TagResponded { event_id, status } => {
                Self::respond_to_tag(model, caps, event_id, status);
            }

            Event::TagResponseCompleted {
                event_id,
                mutation_id,
                result,
            } => {
                let latest = model.participation.complete_write(&event_id, &mutation_id);
                Self::write_completed(model, latest, result);
            }

            Event::CreateEventRequested(draft) => Self::create_event(model, caps, *draft),

            Event::UpdateEventRequested { id, draft } => {
                Self::update_event(model, caps, &id, *draft);
            }

            Event::DeleteEventRequested { id } => Self::delete_event(model, caps, id),

            Event::EventSaved(result) => match result {
                Ok(event) => {
                    info!(event_id = %event.id, "event saved");
                    model.upsert_event(event);
                    model.show_toast("Event saved", ToastKind::Success);
                }
                Err(e) => model.report(e.into()),
            },

            Event::EventDeleted(result) => match result {
                Ok(id) => {
                    info!(event_id = %id, "event deleted");
                    model.remove_event(&id);
                    model.show_toast("Event cancelled", ToastKind::Info);
                }
                Err(e) => model.report(e.into()),
            },

            Event::ErrorDismissed => model.active_error = None,

            Event::ToastDismissed => model.active_toast = None,
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model)
    }
}
