use thiserror::Error;
use uuid::Uuid;

use crate::timer::RunState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("cannot {operation} while timer is {}", .state.as_str())]
    InvalidTransition {
        operation: &'static str,
        state: RunState,
    },

    #[error("invalid timer configuration: {0}")]
    ConfigurationInvalid(String),
}

/// Failure talking to the study backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification target unavailable: {0}")]
    Unavailable(String),

    #[error("notification failed: {0}")]
    Failed(String),
}

/// Returned by the session logger when a record could not be delivered
/// right away. `queued` is false when the record will not be retried: either
/// the retry budget is a single attempt or local storage failed as well.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("session {key} not delivered ({reason}); queued for retry: {queued}")]
pub struct QueueFallback {
    pub key: Uuid,
    pub reason: String,
    pub queued: bool,
}
