//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Emission failure taxonomy and operator notifications."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use meterlink_metrics::SubmissionOutcome;
use meterlink_net::SubmitError;
use serde::Serialize;

/// No credential is held; the operator must log in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no session credential available; log in to resume emission")]
pub struct NoSessionError;

/// Everything a tick can fail with. Caught at the scheduler boundary and
/// turned into a [`Notification`]; never propagated as a fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmissionError {
    #[error(transparent)]
    NoSession(#[from] NoSessionError),
    #[error("collector rejected the session credential: {message}")]
    AuthRejected { message: String },
    #[error("transport failure: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
}

impl From<SubmitError> for EmissionError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::AuthRejected { message } => EmissionError::AuthRejected { message },
            SubmitError::Transport { status, message } => {
                EmissionError::Transport { status, message }
            }
        }
    }
}

impl EmissionError {
    pub fn kind(&self) -> NotificationKind {
        match self {
            EmissionError::NoSession(_) => NotificationKind::NoSession,
            EmissionError::AuthRejected { .. } => NotificationKind::AuthRejected,
            EmissionError::Transport { .. } => NotificationKind::Transport,
        }
    }

    /// Whether this failure ends the emission session.
    pub fn is_session_ending(&self) -> bool {
        !matches!(self, EmissionError::Transport { .. })
    }

    pub(crate) fn outcome(&self) -> SubmissionOutcome {
        match self {
            EmissionError::NoSession(_) => SubmissionOutcome::NoSession,
            EmissionError::AuthRejected { .. } => SubmissionOutcome::AuthRejected,
            EmissionError::Transport { .. } => SubmissionOutcome::TransportError,
        }
    }

    pub fn to_notification(&self) -> Notification {
        Notification {
            kind: self.kind(),
            status: match self {
                EmissionError::Transport { status, .. } => *status,
                _ => None,
            },
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NoSession,
    AuthRejected,
    Transport,
}

/// Structured failure notice handed to the presentation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_errors_convert_preserving_details() {
        let err: EmissionError = SubmitError::Transport {
            status: Some(503),
            message: "Service Unavailable".into(),
        }
        .into();
        assert_eq!(err.kind(), NotificationKind::Transport);
        assert!(!err.is_session_ending());
        let notice = err.to_notification();
        assert_eq!(notice.status, Some(503));
        assert!(notice.message.contains("Service Unavailable"));

        let err: EmissionError = SubmitError::AuthRejected {
            message: "expired".into(),
        }
        .into();
        assert_eq!(err.kind(), NotificationKind::AuthRejected);
        assert!(err.is_session_ending());
    }

    #[test]
    fn no_session_is_session_ending() {
        let err = EmissionError::from(NoSessionError);
        assert_eq!(err.kind(), NotificationKind::NoSession);
        assert!(err.is_session_ending());
    }

    #[test]
    fn notification_serializes_kind_in_snake_case() {
        let notice = EmissionError::from(NoSessionError).to_notification();
        let value = serde_json::to_value(&notice).unwrap();
        assert_eq!(value["kind"], "no_session");
        assert!(value.get("status").is_none());
    }
}
