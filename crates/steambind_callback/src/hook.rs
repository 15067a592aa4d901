//! Warning message hook
//!
//! The native library reports free-text diagnostics through a plain C function
//! pointer with no user context, so the destination is a process-wide sink
//! that can be installed once.

use std::ffi::{CStr, c_char, c_int};

use once_cell::sync::OnceCell;
use tracing::{debug, error, warn};

/// Signature of the hook passed to `SetWarningMessageHook`.
pub type WarningHookFn = unsafe extern "C" fn(severity: c_int, text: *const c_char);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Debug,
    Warning,
}

impl MessageSeverity {
    pub fn from_raw(severity: i32) -> Option<Self> {
        match severity {
            0 => Some(Self::Debug),
            1 => Some(Self::Warning),
            _ => None,
        }
    }
}

/// The native side reported a severity this binding does not know about.
#[derive(Debug, thiserror::Error)]
#[error("unexpected message level {severity}: {message}")]
pub struct ProtocolViolation {
    pub severity: i32,
    pub message: String,
}

type MessageSink = Box<dyn Fn(MessageSeverity, &str) + Send + Sync>;

static MESSAGE_SINK: OnceCell<MessageSink> = OnceCell::new();

/// Route native diagnostics to `sink` instead of `tracing`. Only the first
/// installation takes effect; returns `false` when a sink was already set.
pub fn install_message_sink<F>(sink: F) -> bool
where
    F: Fn(MessageSeverity, &str) + Send + Sync + 'static,
{
    MESSAGE_SINK.set(Box::new(sink)).is_ok()
}

/// Deliver one diagnostic to the installed sink, or to `tracing` when none is.
pub fn route_message(severity: i32, message: &str) -> Result<MessageSeverity, ProtocolViolation> {
    let Some(level) = MessageSeverity::from_raw(severity) else {
        return Err(ProtocolViolation {
            severity,
            message: message.to_string(),
        });
    };

    match MESSAGE_SINK.get() {
        Some(sink) => sink(level, message),
        None => match level {
            MessageSeverity::Debug => debug!(target: "steambind::native", "{message}"),
            MessageSeverity::Warning => warn!(target: "steambind::native", "{message}"),
        },
    }
    Ok(level)
}

/// Hook handed to `SteamAPI_ISteamUtils_SetWarningMessageHook`.
///
/// An unknown severity means the library's contract changed underneath this
/// binding; the process is aborted after logging it.
///
/// # Safety
/// `text` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn steambind_warning_message_hook(severity: c_int, text: *const c_char) {
    let message = if text.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    };

    if let Err(violation) = route_message(severity, &message) {
        error!(error = %violation, "native message hook protocol violation");
        std::process::abort();
    }
}
