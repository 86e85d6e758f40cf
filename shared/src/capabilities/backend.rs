use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::favorites::{FavoriteState, FavoriteTarget, NotificationCategory};
use crate::model::{CulturalEvent, EventId, ParticipationStatus, UserId};
use crate::participation::ParticipationRecord;

/// Requests to the remote data service. Authorization is enforced there;
/// the core only checks organizer ownership before asking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "data")]
pub enum BackendOperation {
    FetchEvents,
    CreateEvent {
        event: CulturalEvent,
    },
    UpdateEvent {
        event: CulturalEvent,
    },
    DeleteEvent {
        id: EventId,
    },
    LoadFavorites {
        user_id: UserId,
    },
    SetFavorite {
        user_id: UserId,
        target: FavoriteTarget,
        favorite: bool,
        mutation_id: String,
    },
    SetNotificationSetting {
        user_id: UserId,
        category: NotificationCategory,
        enabled: bool,
        mutation_id: String,
    },
    SavePushToken {
        user_id: UserId,
        token: String,
    },
    LoadParticipations {
        user_id: UserId,
    },
    RespondToTag {
        user_id: UserId,
        event_id: EventId,
        status: ParticipationStatus,
        mutation_id: String,
    },
}

impl BackendOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FetchEvents => "fetch_events",
            Self::CreateEvent { .. } => "create_event",
            Self::UpdateEvent { .. } => "update_event",
            Self::DeleteEvent { .. } => "delete_event",
            Self::LoadFavorites { .. } => "load_favorites",
            Self::SetFavorite { .. } => "set_favorite",
            Self::SetNotificationSetting { .. } => "set_notification_setting",
            Self::SavePushToken { .. } => "save_push_token",
            Self::LoadParticipations { .. } => "load_participations",
            Self::RespondToTag { .. } => "respond_to_tag",
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackendError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("not signed in")]
    Unauthenticated,

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl BackendError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout | Self::Storage { .. }
        )
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum BackendOutput {
    Events(Vec<CulturalEvent>),
    Event(CulturalEvent),
    Deleted(EventId),
    Favorites {
        state: FavoriteState,
        #[serde(default)]
        push_token: Option<String>,
    },
    Participations(Vec<ParticipationRecord>),
    Saved,
}

pub type BackendResult = Result<BackendOutput, BackendError>;

/// Output variant did not match the request.
pub(crate) fn unexpected(op: &str, output: &BackendOutput) -> BackendError {
    BackendError::Unknown {
        message: format!("unexpected {op} response: {output:?}"),
    }
}

impl Operation for BackendOperation {
    type Output = BackendResult;
}

pub struct Backend<Ev> {
    context: CapabilityContext<BackendOperation, Ev>,
}

impl<Ev> Capability<Ev> for Backend<Ev> {
    type Operation = BackendOperation;
    type MappedSelf<MappedEv> = Backend<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Backend::new(self.context.map_event(f))
    }
}

impl<Ev> Backend<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<BackendOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn request<F>(&self, operation: BackendOperation, make_event: F)
    where
        F: FnOnce(BackendResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(make_event(result));
        });
    }

    pub fn fetch_events<F>(&self, make_event: F)
    where
        F: FnOnce(Result<Vec<CulturalEvent>, BackendError>) -> Ev + Send + 'static,
    {
        self.request(BackendOperation::FetchEvents, move |result| {
            make_event(result.and_then(|output| match output {
                BackendOutput::Events(events) => Ok(events),
                other => Err(unexpected("fetch_events", &other)),
            }))
        });
    }

    pub fn load_favorites<F>(&self, user_id: UserId, make_event: F)
    where
        F: FnOnce(Result<(FavoriteState, Option<String>), BackendError>) -> Ev + Send + 'static,
    {
        self.request(BackendOperation::LoadFavorites { user_id }, move |result| {
            make_event(result.and_then(|output| match output {
                BackendOutput::Favorites { state, push_token } => Ok((state, push_token)),
                other => Err(unexpected("load_favorites", &other)),
            }))
        });
    }

    pub fn load_participations<F>(&self, user_id: UserId, make_event: F)
    where
        F: FnOnce(Result<Vec<ParticipationRecord>, BackendError>) -> Ev + Send + 'static,
    {
        self.request(BackendOperation::LoadParticipations { user_id }, move |result| {
            make_event(result.and_then(|output| match output {
                BackendOutput::Participations(records) => Ok(records),
                other => Err(unexpected("load_participations", &other)),
            }))
        });
    }

    /// For writes whose only interesting outcome is success or failure.
    pub fn write<F>(&self, operation: BackendOperation, make_event: F)
    where
        F: FnOnce(Result<(), BackendError>) -> Ev + Send + 'static,
    {
        self.request(operation, move |result| make_event(result.map(|_| ())));
    }
}
