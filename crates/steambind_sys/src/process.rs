//! Process lifecycle calls that sit outside any interface accessor.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::gateway::NativeCall;
use crate::symbols;
use crate::types::AppId;

/// Returns `true` when Steam relaunches the game and this process should exit.
pub fn restart_app_if_necessary(native: &dyn NativeCall, app: AppId) -> Result<bool> {
    let restart = native
        .call(symbols::RESTART_APP_IF_NECESSARY, &[app.0 as usize])?
        .as_bool();
    if restart {
        info!(app_id = app.0, "steam requested a relaunch through the client");
    }
    Ok(restart)
}

/// `SteamAPI_Init`; a `false` return (Steam not running, no app id) is an error.
pub fn init(native: &dyn NativeCall) -> Result<()> {
    if native.call(symbols::INIT, &[])?.as_bool() {
        Ok(())
    } else {
        Err(Error::InitFailed(symbols::INIT))
    }
}

pub fn shutdown(native: &dyn NativeCall) -> Result<()> {
    native.call(symbols::SHUTDOWN, &[])?;
    Ok(())
}

/// Let the native library dispatch registered callbacks itself.
pub fn run_callbacks(native: &dyn NativeCall) -> Result<()> {
    native.call(symbols::RUN_CALLBACKS, &[])?;
    Ok(())
}

pub fn release_current_thread_memory(native: &dyn NativeCall) -> Result<()> {
    native.call(symbols::RELEASE_CURRENT_THREAD_MEMORY, &[])?;
    Ok(())
}

/// Releases the native library's thread-local memory when dropped.
///
/// Create one at the top of any long-lived thread that talks to the library.
pub struct ThreadScope {
    native: Arc<dyn NativeCall>,
}

impl ThreadScope {
    pub fn new(native: Arc<dyn NativeCall>) -> Self {
        Self { native }
    }
}

impl Drop for ThreadScope {
    fn drop(&mut self) {
        if let Err(err) = release_current_thread_memory(&*self.native) {
            warn!(error = %err, "failed to release native thread memory");
        }
    }
}
