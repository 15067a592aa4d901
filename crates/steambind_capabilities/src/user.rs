use std::sync::Arc;

use crate::interface::{acquire, require_wide_words};
use steambind_sys::symbols;
use steambind_sys::{NativeCall, Result, SteamId};

pub struct SteamUser {
    native: Arc<dyn NativeCall>,
    this: usize,
}

impl SteamUser {
    pub fn new(native: Arc<dyn NativeCall>) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_USER)?;
        Ok(Self { native, this })
    }

    /// Steam ID of the logged-on user.
    pub fn steam_id(&self) -> Result<SteamId> {
        require_wide_words(symbols::USER_GET_STEAM_ID)?;
        let id = self.native.call(symbols::USER_GET_STEAM_ID, &[self.this])?;
        Ok(SteamId(id.as_u64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::testing::native_with;

    #[test]
    fn test_steam_id() {
        let mock = native_with(symbols::STEAM_USER);
        mock.respond(symbols::USER_GET_STEAM_ID, |_| 76_561_197_960_287_930);
        let user = SteamUser::new(mock).unwrap();
        assert_eq!(user.steam_id().unwrap(), SteamId(76_561_197_960_287_930));
    }
}
