use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::authoring::EventValidationError;
use crate::capabilities::{BackendError, PushError};
use crate::config::ConfigError;
use crate::drawing::DrawingError;
use crate::geometry::CoordinateError;
use crate::participation::ParticipationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Storage,
    PushRegistration,
    PushPermissionDenied,
    Location,
    LocationPermissionDenied,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Storage => "STORAGE_ERROR",
            Self::PushRegistration => "PUSH_REGISTRATION_ERROR",
            Self::PushPermissionDenied => "PUSH_PERMISSION_DENIED",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Storage | Self::Location => {
                ErrorSeverity::Transient
            }

            Self::InvalidState | Self::Internal => ErrorSeverity::Fatal,

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::PushRegistration
            | Self::PushPermissionDenied
            | Self::LocationPermissionDenied
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::Storage | Self::Location | Self::PushRegistration
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => "Please sign in to continue.".into(),
            ErrorKind::Authorization => {
                "Only the organizer can change this event.".into()
            }
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Storage => "Unable to save your changes. Please try again.".into(),
            ErrorKind::PushRegistration => {
                "Notifications could not be enabled. Please try again later.".into()
            }
            ErrorKind::PushPermissionDenied => {
                "Notifications are blocked. Please enable them in Settings.".into()
            }
            ErrorKind::Location => {
                "Unable to determine your location. Please check your GPS settings.".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Location access is required for nearby events. Please enable it in Settings."
                    .into()
            }
            ErrorKind::InvalidState => {
                "The app is in an invalid state. Please restart the app.".into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<DrawingError> for AppError {
    fn from(e: DrawingError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<EventValidationError> for AppError {
    fn from(e: EventValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<ParticipationError> for AppError {
    fn from(e: ParticipationError) -> Self {
        AppError::new(ErrorKind::InvalidState, e.to_string())
            .with_severity(ErrorSeverity::Permanent)
    }
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        let kind = match &e {
            BackendError::Network { .. } => ErrorKind::Network,
            BackendError::Timeout => ErrorKind::Timeout,
            BackendError::Unauthenticated => ErrorKind::Authentication,
            BackendError::PermissionDenied { .. } => ErrorKind::Authorization,
            BackendError::NotFound { .. } => ErrorKind::NotFound,
            BackendError::Storage { .. } => ErrorKind::Storage,
            BackendError::Unknown { .. } => {
                return AppError::new(ErrorKind::Unknown, "unexpected response from the server")
                    .with_internal(e.to_string());
            }
        };
        AppError::new(kind, e.to_string())
    }
}

impl From<PushError> for AppError {
    fn from(e: PushError) -> Self {
        let kind = match &e {
            PushError::PermissionDenied => ErrorKind::PushPermissionDenied,
            PushError::Network { .. } => ErrorKind::Network,
            PushError::Timeout => ErrorKind::Timeout,
            PushError::NotAvailable
            | PushError::RegistrationFailed { .. }
            | PushError::Unknown { .. } => ErrorKind::PushRegistration,
        };
        AppError::new(kind, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorKind::Network, "offline");
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.severity, ErrorSeverity::Transient);
        assert_eq!(err.code(), "NETWORK_ERROR");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_app_error_display_includes_internal() {
        let err = AppError::new(ErrorKind::Storage, "write failed").with_internal("quota");
        assert_eq!(err.to_string(), "[STORAGE_ERROR] write failed (internal: quota)");
    }

    #[test]
    fn test_fatal_severity_blocks_retry() {
        let err = AppError::new(ErrorKind::Network, "x").with_severity(ErrorSeverity::Fatal);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = AppError::new(ErrorKind::Validation, "Title is required");
        assert_eq!(err.user_facing_message(), "Title is required");
    }

    #[test]
    fn test_backend_error_mapping() {
        let err = AppError::from(BackendError::PermissionDenied {
            message: "rules".into(),
        });
        assert_eq!(err.kind, ErrorKind::Authorization);

        let err = AppError::from(BackendError::Network {
            message: "reset".into(),
        });
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.is_retryable());

        let err = AppError::from(BackendError::Unknown {
            message: "unexpected save response: Saved".into(),
        });
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "unexpected response from the server");
        assert_eq!(
            err.internal_message.as_deref(),
            Some("unknown error: unexpected save response: Saved")
        );
    }

    #[test]
    fn test_push_error_mapping() {
        assert_eq!(
            AppError::from(PushError::PermissionDenied).kind,
            ErrorKind::PushPermissionDenied
        );
        assert_eq!(
            AppError::from(PushError::registration_failed("apns")).kind,
            ErrorKind::PushRegistration
        );
    }

    #[test]
    fn test_context_is_recorded() {
        let err = AppError::new(ErrorKind::NotFound, "missing").with_context("event_id", "42");
        assert_eq!(err.context.get("event_id").map(String::as_str), Some("42"));
    }
}
