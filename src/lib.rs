//! Steamworks flat API bindings.
//!
//! [`Client`] wires the pieces together once per process: the `libloading`
//! gateway, the callback registry with its native entry point, and manual
//! dispatch over the process pipe. The component crates are re-exported for
//! callers that need finer control.

use std::io;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use steambind_callback as callback;
pub use steambind_capabilities as capabilities;
pub use steambind_config as config;
pub use steambind_dispatch as dispatch;
pub use steambind_sys as sys;

use steambind_callback::{CallbackRegistry, EntryPointGuard, RegistrationHandle};
use steambind_capabilities::{
    SteamApps, SteamInput, SteamMatchmaking, SteamNetworkingMessages, SteamRemoteStorage,
    SteamUser, SteamUserStats, SteamUtils,
};
use steambind_config::BindingConfig;
use steambind_dispatch::{CallPoller, CallbackPump, ManualDispatch};
use steambind_sys::{ApiCallHandle, AppId, CallbackPayload, DynamicGateway, NativeCall, process};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Binding(#[from] steambind_sys::Error),

    /// Steam is relaunching the game through the client; exit now.
    #[error("steam is relaunching app {0}")]
    Relaunching(u32),
}

/// The initialized Steam API for this process.
pub struct Client {
    config: BindingConfig,
    native: Arc<dyn NativeCall>,
    registry: Arc<CallbackRegistry>,
    dispatch: Arc<ManualDispatch>,
    entry: Option<EntryPointGuard>,
    active: bool,
}

impl Client {
    /// Load the libraries named by `config` and initialize the Steam API.
    pub fn init(config: BindingConfig) -> Result<Self, ClientError> {
        let native: Arc<dyn NativeCall> = Arc::new(DynamicGateway::open(&config.library)?);

        if let Some(app_id) = config.app_id
            && process::restart_app_if_necessary(&*native, AppId(app_id))?
        {
            return Err(ClientError::Relaunching(app_id));
        }
        process::init(&*native)?;
        info!(library = %config.library.resolved_path().display(), "steam api initialized");

        Ok(Self::with_native(native, config)?)
    }

    /// Build a client on an already initialized `native`.
    ///
    /// The callback entry point is only installed when a shim library is
    /// configured, since the plain Steam API library does not export
    /// `SetCallbackDispatcher`.
    pub fn with_native(native: Arc<dyn NativeCall>, config: BindingConfig) -> steambind_sys::Result<Self> {
        let registry = Arc::new(CallbackRegistry::new(Arc::clone(&native)));
        let entry = match config.library.shim_path {
            Some(_) => Some(registry.install()?),
            None => None,
        };
        let dispatch = Arc::new(ManualDispatch::init(Arc::clone(&native))?);

        Ok(Self {
            config,
            native,
            registry,
            dispatch,
            entry,
            active: true,
        })
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    pub fn native(&self) -> &Arc<dyn NativeCall> {
        &self.native
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn dispatch(&self) -> &Arc<ManualDispatch> {
        &self.dispatch
    }

    pub fn poller(&self) -> CallPoller {
        CallPoller::new(Arc::clone(&self.dispatch), &self.config.dispatch)
    }

    /// Run `handler` for every `T` callback delivered by the pump.
    pub fn on_callback<T, F>(&self, handler: F) -> steambind_sys::Result<RegistrationHandle>
    where
        T: CallbackPayload + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.registry.register(
            move |data| match T::read_from(data.payload) {
                Some(value) => handler(value),
                None => warn!(
                    callback = T::CALLBACK_ID,
                    len = data.payload.len(),
                    "callback payload too short"
                ),
            },
            size_of::<T>(),
            T::CALLBACK_ID,
            ApiCallHandle::INVALID,
            false,
        )
    }

    /// Pump callbacks once on the calling thread.
    pub fn run_callbacks(&self) -> steambind_sys::Result<usize> {
        self.dispatch.pump(&self.registry)
    }

    /// Pump callbacks on a background thread every configured tick.
    pub fn spawn_pump(&self) -> io::Result<CallbackPump> {
        CallbackPump::spawn(
            Arc::clone(&self.native),
            Arc::clone(&self.dispatch),
            Arc::clone(&self.registry),
            self.config.dispatch.tick_interval(),
        )
    }

    pub fn apps(&self) -> steambind_sys::Result<SteamApps> {
        SteamApps::new(Arc::clone(&self.native))
    }

    pub fn input(&self) -> steambind_sys::Result<SteamInput> {
        SteamInput::new(Arc::clone(&self.native))
    }

    pub fn remote_storage(&self) -> steambind_sys::Result<SteamRemoteStorage> {
        SteamRemoteStorage::new(Arc::clone(&self.native))
    }

    pub fn user(&self) -> steambind_sys::Result<SteamUser> {
        SteamUser::new(Arc::clone(&self.native))
    }

    pub fn user_stats(&self) -> steambind_sys::Result<SteamUserStats> {
        SteamUserStats::new(Arc::clone(&self.native))
    }

    pub fn utils(&self) -> steambind_sys::Result<SteamUtils> {
        SteamUtils::new(Arc::clone(&self.native))
    }

    pub fn matchmaking(&self) -> steambind_sys::Result<SteamMatchmaking> {
        SteamMatchmaking::new(Arc::clone(&self.native), self.poller())
    }

    pub fn networking_messages(&self) -> steambind_sys::Result<SteamNetworkingMessages> {
        SteamNetworkingMessages::new(Arc::clone(&self.native))
    }

    /// Detach the callback entry point and shut the Steam API down.
    pub fn shutdown(mut self) -> steambind_sys::Result<()> {
        self.shutdown_native()
    }

    fn shutdown_native(&mut self) -> steambind_sys::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        drop(self.entry.take());
        process::shutdown(&*self.native)?;
        debug!("steam api shut down");
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown_native() {
            warn!(error = %err, "steam api shutdown failed");
        }
    }
}
