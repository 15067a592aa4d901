use std::sync::Arc;

use tracing::debug;

use crate::interface::acquire;
use steambind_sys::symbols;
use steambind_sys::{CallbackPayload, EResult, NativeCall, Result, SteamId, c_string};

/// `UserStatsReceived_t`, posted once [`SteamUserStats::request_current_stats`]
/// has fetched the user's stats.
#[cfg_attr(not(windows), repr(C, packed(4)))]
#[cfg_attr(windows, repr(C))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStatsReceived {
    pub game_id: u64,
    pub result: EResult,
    pub user: SteamId,
}

impl UserStatsReceived {
    pub const fn result(&self) -> EResult {
        self.result
    }
}

// SAFETY: plain integers, every bit pattern is valid.
unsafe impl CallbackPayload for UserStatsReceived {
    const CALLBACK_ID: i32 = 1101;
}

/// Achievements and stats of the current user.
///
/// Values are only available after [`request_current_stats`] has completed;
/// changes are local until [`store_stats`] uploads them.
///
/// [`request_current_stats`]: Self::request_current_stats
/// [`store_stats`]: Self::store_stats
pub struct SteamUserStats {
    native: Arc<dyn NativeCall>,
    this: usize,
}

impl SteamUserStats {
    pub fn new(native: Arc<dyn NativeCall>) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_USER_STATS)?;
        Ok(Self { native, this })
    }

    pub fn request_current_stats(&self) -> Result<bool> {
        Ok(self
            .native
            .call(symbols::USER_STATS_REQUEST_CURRENT_STATS, &[self.this])?
            .as_bool())
    }

    /// Whether `name` is unlocked, or `None` when the achievement is unknown
    /// or stats have not been received yet.
    pub fn achievement(&self, name: &str) -> Result<Option<bool>> {
        let cname = c_string(name)?;
        let mut achieved = false;
        let found = self
            .native
            .call(
                symbols::USER_STATS_GET_ACHIEVEMENT,
                &[self.this, cname.as_ptr() as usize, (&raw mut achieved) as usize],
            )?
            .as_bool();
        Ok(found.then_some(achieved))
    }

    pub fn set_achievement(&self, name: &str) -> Result<bool> {
        let cname = c_string(name)?;
        let set = self
            .native
            .call(symbols::USER_STATS_SET_ACHIEVEMENT, &[self.this, cname.as_ptr() as usize])?
            .as_bool();
        debug!(achievement = name, set, "set achievement");
        Ok(set)
    }

    pub fn clear_achievement(&self, name: &str) -> Result<bool> {
        let cname = c_string(name)?;
        let cleared = self
            .native
            .call(symbols::USER_STATS_CLEAR_ACHIEVEMENT, &[self.this, cname.as_ptr() as usize])?
            .as_bool();
        debug!(achievement = name, cleared, "cleared achievement");
        Ok(cleared)
    }

    pub fn store_stats(&self) -> Result<bool> {
        Ok(self
            .native
            .call(symbols::USER_STATS_STORE_STATS, &[self.this])?
            .as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::testing::native_with;

    #[test]
    fn test_get_achievement_uses_getter() {
        let mock = native_with(symbols::STEAM_USER_STATS);
        mock.respond(symbols::USER_STATS_GET_ACHIEVEMENT, |args| {
            // SAFETY: args[2] is the wrapper's `achieved` flag.
            unsafe { (args[2] as *mut bool).write(true) };
            1
        });

        let stats = SteamUserStats::new(mock.clone()).unwrap();
        assert_eq!(stats.achievement("ACH_WIN_ONE_GAME").unwrap(), Some(true));
        assert_eq!(mock.count(symbols::USER_STATS_GET_ACHIEVEMENT), 1);
        assert_eq!(mock.count(symbols::USER_STATS_SET_ACHIEVEMENT), 0);
    }

    #[test]
    fn test_stats_received_layout() {
        let expected = if cfg!(windows) { 24 } else { 20 };
        assert_eq!(size_of::<UserStatsReceived>(), expected);
    }

    #[test]
    fn test_unknown_achievement() {
        let mock = native_with(symbols::STEAM_USER_STATS);
        let stats = SteamUserStats::new(mock).unwrap();
        assert_eq!(stats.achievement("ACH_NOPE").unwrap(), None);
    }

    #[test]
    fn test_set_clear_store() {
        let mock = native_with(symbols::STEAM_USER_STATS);
        mock.respond(symbols::USER_STATS_SET_ACHIEVEMENT, |_| 1);
        mock.respond(symbols::USER_STATS_CLEAR_ACHIEVEMENT, |_| 1);
        mock.respond(symbols::USER_STATS_STORE_STATS, |_| 1);
        mock.respond(symbols::USER_STATS_REQUEST_CURRENT_STATS, |_| 1);

        let stats = SteamUserStats::new(mock).unwrap();
        assert!(stats.request_current_stats().unwrap());
        assert!(stats.set_achievement("ACH_TRAVEL_FAR").unwrap());
        assert!(stats.clear_achievement("ACH_TRAVEL_FAR").unwrap());
        assert!(stats.store_stats().unwrap());
    }
}
