//! Callback registry and the native entry points that feed it.
//!
//! The native side calls back into this process through exactly two symbols:
//! [`steambind_on_callback`] for registered callbacks and
//! [`steambind_warning_message_hook`] for free-text diagnostics.

pub mod entry;
pub mod hook;
pub mod registry;

pub use entry::{CallbackEntryFn, EntryPointGuard, steambind_on_callback};
pub use hook::{
    MessageSeverity, ProtocolViolation, WarningHookFn, install_message_sink, route_message,
    steambind_warning_message_hook,
};
pub use registry::{CallbackData, CallbackHandler, CallbackRegistry, RegistrationHandle};
