//! Typed failures for control and AR session misuse.

use thiserror::Error;

/// Errors raised by [`crate::control::Control`] implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("{control} control has no input element attached")]
    NotReady { control: &'static str },

    #[error("{control} control was destroyed")]
    Destroyed { control: &'static str },
}

/// Failures reported by an [`crate::xr::XrPlatform`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrError {
    #[error("immersive AR is not supported on this device")]
    Unsupported,

    #[error("AR session request was rejected: {0}")]
    SessionRejected(String),

    #[error("hit-test source unavailable: {0}")]
    HitTestUnavailable(String),

    #[error("failed to hand off to external viewer: {0}")]
    Launch(String),
}

/// Errors surfaced by AR sessions and the AR manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("AR is not available: {0}")]
    NotSupported(String),

    #[error("an AR session is already active")]
    AlreadyActive,

    #[error(transparent)]
    Platform(#[from] XrError),

    #[error(transparent)]
    Control(#[from] ControlError),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_part() {
        let err = ControlError::NotReady { control: "auto" };
        assert_eq!(err.to_string(), "auto control has no input element attached");

        let err = SessionError::from(XrError::Unsupported);
        assert_eq!(err.to_string(), "immersive AR is not supported on this device");
        assert_eq!(
            SessionError::NotSupported("no model loaded".into()).to_string(),
            "AR is not available: no model loaded"
        );
    }
}
