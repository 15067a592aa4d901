use std::sync::Arc;

use crate::interface::acquire;
use steambind_sys::symbols;
use steambind_sys::{AppId, NativeCall, Result};

const INSTALL_DIR_CAPACITY: usize = 4096;

pub struct SteamApps {
    native: Arc<dyn NativeCall>,
    this: usize,
}

impl SteamApps {
    pub fn new(native: Arc<dyn NativeCall>) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_APPS)?;
        Ok(Self { native, this })
    }

    /// Install folder of `app`, or `None` when it is not installed.
    pub fn app_install_dir(&self, app: AppId) -> Result<Option<String>> {
        let mut path = vec![0u8; INSTALL_DIR_CAPACITY];
        let written = self
            .native
            .call(
                symbols::APPS_GET_APP_INSTALL_DIR,
                &[self.this, app.0 as usize, path.as_mut_ptr() as usize, path.len()],
            )?
            .as_u32() as usize;
        if written == 0 {
            return Ok(None);
        }

        // The count includes the terminating NUL.
        path.truncate((written - 1).min(INSTALL_DIR_CAPACITY));
        Ok(Some(String::from_utf8_lossy(&path).into_owned()))
    }

    /// Language the user picked for this game, e.g. `english`.
    pub fn current_game_language(&self) -> Result<String> {
        let text = self
            .native
            .call(symbols::APPS_GET_CURRENT_GAME_LANGUAGE, &[self.this])?;
        // SAFETY: the library returns a NUL-terminated string it owns for the
        // lifetime of the process.
        Ok(unsafe { text.to_string_lossy() }.unwrap_or_default())
    }
}
