use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::UserId;

/// One-shot registration. The shell prompts for permission if needed and
/// returns the device token, or `None` when the user declined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum PushOperation {
    Register { user_id: UserId },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum PushError {
    #[error("push notifications not available on this platform")]
    NotAvailable,

    #[error("permission denied by user")]
    PermissionDenied,

    #[error("registration failed: {reason}")]
    RegistrationFailed {
        reason: String,
        #[serde(default)]
        platform_code: Option<String>,
        #[serde(default)]
        is_retryable: bool,
    },

    #[error("network error: {message}")]
    Network {
        message: String,
        #[serde(default)]
        is_retryable: bool,
    },

    #[error("operation timed out")]
    Timeout,

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl PushError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network { is_retryable, .. } | Self::RegistrationFailed { is_retryable, .. } => {
                *is_retryable
            }
            Self::Timeout => true,
            Self::NotAvailable | Self::PermissionDenied | Self::Unknown { .. } => false,
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            is_retryable: true,
        }
    }

    #[must_use]
    pub fn registration_failed(reason: impl Into<String>) -> Self {
        Self::RegistrationFailed {
            reason: reason.into(),
            platform_code: None,
            is_retryable: false,
        }
    }
}

pub type PushResult = Result<Option<String>, PushError>;

impl Operation for PushOperation {
    type Output = PushResult;
}

pub struct Push<Ev> {
    context: CapabilityContext<PushOperation, Ev>,
}

impl<Ev> Capability<Ev> for Push<Ev> {
    type Operation = PushOperation;
    type MappedSelf<MappedEv> = Push<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Push::new(self.context.map_event(f))
    }
}

impl<Ev> Push<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<PushOperation, Ev>) -> Self {
        Self { context }
    }

    /// An empty token is reported as `None`.
    pub fn register<F>(&self, user_id: UserId, make_event: F)
    where
        F: FnOnce(PushResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(PushOperation::Register { user_id })
                .await
                .map(|token| token.filter(|t| !t.is_empty()));
            ctx.update_app(make_event(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_error_is_retryable() {
        assert!(PushError::network("test").is_retryable());
        assert!(PushError::Timeout.is_retryable());
        assert!(!PushError::PermissionDenied.is_retryable());
        assert!(!PushError::NotAvailable.is_retryable());
        assert!(!PushError::registration_failed("test").is_retryable());
    }

    #[test]
    fn test_register_operation_json() {
        let op = PushOperation::Register {
            user_id: UserId::new("u1"),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "Register");
        assert_eq!(json["data"]["user_id"], "u1");
    }
}
