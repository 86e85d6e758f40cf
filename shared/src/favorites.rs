use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{EventId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    NewEvents,
    EventReminders,
    EventUpdates,
    FavoritePeople,
    ParticipationRequests,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 5] = [
        Self::NewEvents,
        Self::EventReminders,
        Self::EventUpdates,
        Self::FavoritePeople,
        Self::ParticipationRequests,
    ];

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::NewEvents => "New events near you",
            Self::EventReminders => "Event reminders",
            Self::EventUpdates => "Changes to events you follow",
            Self::FavoritePeople => "Activity from people you follow",
            Self::ParticipationRequests => "Participation requests",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoriteState {
    pub favorite_events: BTreeSet<EventId>,
    pub favorite_people: BTreeSet<UserId>,
    pub notification_settings: BTreeMap<NotificationCategory, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FavoriteTarget {
    Event(EventId),
    Person(UserId),
}

/// Keys the latest in-flight write per remote record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WriteTarget {
    Favorite(FavoriteTarget),
    Notification(NotificationCategory),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationChange {
    Unchanged,
    /// Applied locally; persist it.
    Applied { enabled: bool },
    /// No push token yet; start registration.
    NeedsRegistration,
    /// A registration is already running; the category joins it.
    AwaitingRegistration,
}

/// Sole owner of [`FavoriteState`] for the signed-in user.
///
/// Mutations apply locally first. Remote writes are tagged with a mutation
/// id so a completion that arrives after a newer write for the same record
/// can be recognised as stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesStore {
    state: FavoriteState,
    push_token: Option<String>,
    hydrated: bool,
    // Unfavorites made before hydration, applied over the remote copy.
    removed_events: BTreeSet<EventId>,
    removed_people: BTreeSet<UserId>,
    registration_in_flight: bool,
    awaiting_registration: BTreeSet<NotificationCategory>,
    latest_writes: HashMap<WriteTarget, String>,
}

impl FavoritesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &FavoriteState {
        &self.state
    }

    #[must_use]
    pub fn push_token(&self) -> Option<&str> {
        self.push_token.as_deref()
    }

    #[must_use]
    pub const fn registration_in_flight(&self) -> bool {
        self.registration_in_flight
    }

    /// Replaces local state with the remote copy. Local edits made before
    /// hydration completed, removals included, are kept on top.
    pub fn hydrate(&mut self, remote: FavoriteState, push_token: Option<String>) {
        let local = std::mem::take(&mut self.state);
        self.state = remote;
        self.state.favorite_events.extend(local.favorite_events);
        self.state.favorite_people.extend(local.favorite_people);
        self.state
            .notification_settings
            .extend(local.notification_settings);
        for id in std::mem::take(&mut self.removed_events) {
            self.state.favorite_events.remove(&id);
        }
        for id in std::mem::take(&mut self.removed_people) {
            self.state.favorite_people.remove(&id);
        }
        if self.push_token.is_none() {
            self.push_token = push_token.filter(|t| !t.is_empty());
        }
        self.hydrated = true;
        info!(
            events = self.state.favorite_events.len(),
            people = self.state.favorite_people.len(),
            has_token = self.push_token.is_some(),
            "favorites hydrated"
        );
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn favorite_event(&mut self, id: EventId) -> bool {
        self.removed_events.remove(&id);
        self.state.favorite_events.insert(id)
    }

    pub fn unfavorite_event(&mut self, id: &EventId) -> bool {
        if !self.hydrated {
            self.removed_events.insert(id.clone());
        }
        self.state.favorite_events.remove(id)
    }

    #[must_use]
    pub fn is_event_favorited(&self, id: &EventId) -> bool {
        self.state.favorite_events.contains(id)
    }

    pub fn favorite_person(&mut self, id: UserId) -> bool {
        self.removed_people.remove(&id);
        self.state.favorite_people.insert(id)
    }

    pub fn unfavorite_person(&mut self, id: &UserId) -> bool {
        if !self.hydrated {
            self.removed_people.insert(id.clone());
        }
        self.state.favorite_people.remove(id)
    }

    #[must_use]
    pub fn is_person_favorited(&self, id: &UserId) -> bool {
        self.state.favorite_people.contains(id)
    }

    pub fn favorite_events(&self) -> impl Iterator<Item = &EventId> {
        self.state.favorite_events.iter()
    }

    /// Sets or clears a favorite; returns whether anything changed.
    pub fn set_favorite(&mut self, target: &FavoriteTarget, favorite: bool) -> bool {
        match (target, favorite) {
            (FavoriteTarget::Event(id), true) => self.favorite_event(id.clone()),
            (FavoriteTarget::Event(id), false) => self.unfavorite_event(id),
            (FavoriteTarget::Person(id), true) => self.favorite_person(id.clone()),
            (FavoriteTarget::Person(id), false) => self.unfavorite_person(id),
        }
    }

    #[must_use]
    pub fn is_favorite(&self, target: &FavoriteTarget) -> bool {
        match target {
            FavoriteTarget::Event(id) => self.is_event_favorited(id),
            FavoriteTarget::Person(id) => self.is_person_favorited(id),
        }
    }

    /// Missing entries read as disabled.
    #[must_use]
    pub fn is_global_notification_enabled(&self, category: NotificationCategory) -> bool {
        self.state
            .notification_settings
            .get(&category)
            .copied()
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_awaiting_registration(&self, category: NotificationCategory) -> bool {
        self.awaiting_registration.contains(&category)
    }

    pub fn update_global_notification_setting(
        &mut self,
        category: NotificationCategory,
        enabled: bool,
    ) -> NotificationChange {
        if !enabled {
            self.awaiting_registration.remove(&category);
            if !self.is_global_notification_enabled(category) {
                return NotificationChange::Unchanged;
            }
            self.state.notification_settings.insert(category, false);
            return NotificationChange::Applied { enabled: false };
        }

        if self.is_global_notification_enabled(category) {
            return NotificationChange::Unchanged;
        }

        if self.push_token.is_none() {
            self.awaiting_registration.insert(category);
            if self.registration_in_flight {
                return NotificationChange::AwaitingRegistration;
            }
            self.registration_in_flight = true;
            debug!(?category, "no push token, starting registration");
            return NotificationChange::NeedsRegistration;
        }

        self.state.notification_settings.insert(category, true);
        NotificationChange::Applied { enabled: true }
    }

    /// Stores the token and enables every category that was waiting on it.
    pub fn registration_succeeded(&mut self, token: String) -> Vec<NotificationCategory> {
        self.registration_in_flight = false;
        self.push_token = Some(token);
        let enabled: Vec<_> = std::mem::take(&mut self.awaiting_registration)
            .into_iter()
            .collect();
        for category in &enabled {
            self.state.notification_settings.insert(*category, true);
        }
        info!(categories = enabled.len(), "push registration succeeded");
        enabled
    }

    /// Categories that were waiting stay disabled and are returned.
    pub fn registration_failed(&mut self) -> Vec<NotificationCategory> {
        self.registration_in_flight = false;
        let dropped: Vec<_> = std::mem::take(&mut self.awaiting_registration)
            .into_iter()
            .collect();
        warn!(categories = dropped.len(), "push registration failed");
        dropped
    }

    /// Starts tracking a remote write and returns its mutation id.
    pub fn record_write(&mut self, target: WriteTarget) -> String {
        let mutation_id = Uuid::new_v4().to_string();
        self.latest_writes.insert(target, mutation_id.clone());
        mutation_id
    }

    /// Returns whether `mutation_id` was still the latest write for
    /// `target`. Stale completions return `false` and change nothing.
    pub fn complete_write(&mut self, target: &WriteTarget, mutation_id: &str) -> bool {
        let latest = self
            .latest_writes
            .get(target)
            .is_some_and(|current| current == mutation_id);
        if latest {
            self.latest_writes.remove(target);
        } else {
            debug!(?target, mutation_id, "ignoring stale write completion");
        }
        latest
    }

    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.latest_writes.len()
    }
}
