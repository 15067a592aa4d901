//! Foreign call gateway for the Steamworks flat API.
//!
//! Everything above this crate talks to the native library through
//! [`NativeCall`]: a symbol name, a list of native-word arguments and a single
//! native-word return value. [`DynamicGateway`] is the `libloading` backed
//! implementation; the `mock` feature adds a scripted one for tests.

pub mod error;
pub mod gateway;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod process;
pub mod symbols;
pub mod types;
pub mod word;

pub use error::{Error, Result};
pub use gateway::{DynamicGateway, NativeCall, c_string};
pub use process::ThreadScope;
pub use types::{
    API_CALL_COMPLETED, ApiCallCompleted, ApiCallHandle, AppId, CallbackId, CallbackMsg,
    CallbackPayload, EResult, InputHandle, PipeHandle, SteamId,
};
pub use word::NativeWord;
