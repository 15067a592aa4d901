use std::time::Duration;

use steambind_sys::ApiCallHandle;

/// Failure of a blocking wait on an asynchronous call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Binding(#[from] steambind_sys::Error),

    #[error("asynchronous call could not be started")]
    NotStarted,

    #[error("asynchronous call {handle} did not complete within {waited:?}")]
    TimedOut { handle: ApiCallHandle, waited: Duration },

    #[error("asynchronous call {handle} completed with an io failure")]
    IoFailure { handle: ApiCallHandle },
}
