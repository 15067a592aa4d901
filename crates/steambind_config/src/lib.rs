//! Binding configuration
//!
//! Centralized configuration for library loading and the dispatch core.
//! Values come from defaults, an optional TOML file and `STEAMBIND_*`
//! environment variables, in that order of precedence (lowest first).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_LIBRARY: &str = "STEAMBIND_LIBRARY";
pub const ENV_SHIM: &str = "STEAMBIND_SHIM";
pub const ENV_TICK_MS: &str = "STEAMBIND_TICK_MS";
pub const ENV_POLL_MS: &str = "STEAMBIND_POLL_MS";
pub const ENV_CALL_TIMEOUT_MS: &str = "STEAMBIND_CALL_TIMEOUT_MS";
pub const ENV_APP_ID: &str = "STEAMBIND_APP_ID";

/// Variable the Steam client itself exports when it launches a game.
pub const ENV_STEAM_APP_ID: &str = "SteamAppId";

/// Complete binding configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BindingConfig {
    /// Native library locations
    pub library: LibraryConfig,

    /// Manual dispatch timing
    pub dispatch: DispatchConfig,

    /// App id checked by `SteamAPI_RestartAppIfNecessary`
    pub app_id: Option<u32>,
}

impl BindingConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            library: LibraryConfig::from_env(),
            dispatch: DispatchConfig::from_env(),
            app_id: app_id_from_env(),
        }
    }

    /// Load configuration from TOML file
    #[cfg(feature = "toml-config")]
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BindingConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn from_file(_path: &Path) -> anyhow::Result<Self> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Save configuration to TOML file
    #[cfg(feature = "toml-config")]
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn save_to_file(&self, _path: &Path) -> anyhow::Result<()> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Merge with environment variables (env vars take precedence).
    /// Values that do not parse leave the current setting alone.
    pub fn merge_with_env(mut self) -> Self {
        let env_config = LibraryConfig::from_env();

        if env_config.path.is_some() {
            self.library.path = env_config.path;
        }
        if env_config.shim_path.is_some() {
            self.library.shim_path = env_config.shim_path;
        }

        if let Some(ms) = env_millis(ENV_TICK_MS) {
            self.dispatch.tick_interval_ms = ms.max(1);
        }
        if let Some(ms) = env_millis(ENV_POLL_MS) {
            self.dispatch.poll_interval_ms = ms.max(1);
        }
        if let Some(ms) = env_millis(ENV_CALL_TIMEOUT_MS) {
            self.dispatch.call_timeout_ms = ms;
        }

        if let Some(app_id) = app_id_from_env() {
            self.app_id = Some(app_id);
        }

        self
    }

    /// Load from `path` when given, otherwise from defaults, then apply env vars.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.merge_with_env())
    }
}

fn env_millis(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

fn app_id_from_env() -> Option<u32> {
    [ENV_APP_ID, ENV_STEAM_APP_ID]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find_map(|val| val.trim().parse().ok())
}

/// Native library locations
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Steam API library; the platform default name is used when unset
    pub path: Option<PathBuf>,

    /// Callback shim exporting `Register_Callback`, `Unregister_Callback`
    /// and `SetCallbackDispatcher`
    pub shim_path: Option<PathBuf>,
}

impl LibraryConfig {
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os(ENV_LIBRARY).map(PathBuf::from),
            shim_path: std::env::var_os(ENV_SHIM).map(PathBuf::from),
        }
    }

    /// Path handed to the dynamic loader for the Steam API library.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_library_name()))
    }
}

/// File name of the redistributable Steam API library on this target.
pub const fn default_library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        if cfg!(target_pointer_width = "32") {
            "steam_api.dll"
        } else {
            "steam_api64.dll"
        }
    } else if cfg!(target_os = "macos") {
        "libsteam_api.dylib"
    } else {
        "libsteam_api.so"
    }
}

/// Manual dispatch timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Interval between callback pump ticks in milliseconds
    pub tick_interval_ms: u64,

    /// Delay between polls while waiting on an asynchronous call
    pub poll_interval_ms: u64,

    /// How long a blocking wait on an asynchronous call may take
    pub call_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1,
            poll_interval_ms: 5,
            call_timeout_ms: 10_000,
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = env_millis(ENV_TICK_MS) {
            config.tick_interval_ms = ms.max(1);
        }
        if let Some(ms) = env_millis(ENV_POLL_MS) {
            config.poll_interval_ms = ms.max(1);
        }
        if let Some(ms) = env_millis(ENV_CALL_TIMEOUT_MS) {
            config.call_timeout_ms = ms;
        }

        config
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
