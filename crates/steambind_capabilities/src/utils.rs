use std::sync::Arc;

use tracing::debug;

use crate::interface::acquire;
use steambind_callback::{WarningHookFn, steambind_warning_message_hook};
use steambind_sys::symbols;
use steambind_sys::{NativeCall, Result};

pub struct SteamUtils {
    native: Arc<dyn NativeCall>,
    this: usize,
}

impl SteamUtils {
    pub fn new(native: Arc<dyn NativeCall>) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_UTILS)?;
        Ok(Self { native, this })
    }

    pub fn is_running_on_steam_deck(&self) -> Result<bool> {
        Ok(self
            .native
            .call(symbols::UTILS_IS_STEAM_RUNNING_ON_STEAM_DECK, &[self.this])?
            .as_bool())
    }

    /// Route the library's warning and debug text through
    /// [`route_message`](steambind_callback::route_message).
    pub fn set_warning_message_hook(&self) -> Result<()> {
        let hook = steambind_warning_message_hook as WarningHookFn;
        self.native
            .call(symbols::UTILS_SET_WARNING_MESSAGE_HOOK, &[self.this, hook as usize])?;
        debug!("warning message hook installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::testing::{INTERFACE, native_with};

    #[test]
    fn test_hook_points_at_exported_entry() {
        let mock = native_with(symbols::STEAM_UTILS);
        let utils = SteamUtils::new(mock.clone()).unwrap();
        utils.set_warning_message_hook().unwrap();

        let call = mock
            .calls()
            .into_iter()
            .find(|call| call.name == symbols::UTILS_SET_WARNING_MESSAGE_HOOK)
            .unwrap();
        assert_eq!(call.args[0], INTERFACE);
        assert_eq!(call.args[1], steambind_warning_message_hook as WarningHookFn as usize);
    }

    #[test]
    fn test_steam_deck_flag_reads_low_byte() {
        let mock = native_with(symbols::STEAM_UTILS);
        mock.respond(symbols::UTILS_IS_STEAM_RUNNING_ON_STEAM_DECK, |_| 0xff00);
        let utils = SteamUtils::new(mock).unwrap();
        assert!(!utils.is_running_on_steam_deck().unwrap());
    }
}
