//! Manual callback dispatch.
//!
//! [`ManualDispatch`] owns the dispatch pipe and performs single,
//! non-blocking polls: either correlating one asynchronous call handle with its
//! result, or pumping every ready message into a
//! [`CallbackRegistry`](steambind_callback::CallbackRegistry). Blocking waits
//! ([`CallPoller`]) and the periodic worker thread ([`CallbackPump`]) are built
//! on top of those polls.

pub mod error;
pub mod manual;
pub mod message;
pub mod poll;
pub mod pump;

pub use error::CallError;
pub use manual::ManualDispatch;
pub use message::{CallbackMessage, CompletionNotice, ResultBuffer};
pub use poll::CallPoller;
pub use pump::CallbackPump;
