use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::interface::{acquire, require_wide_words};
use steambind_dispatch::{CallError, CallPoller};
use steambind_sys::symbols;
use steambind_sys::{ApiCallHandle, CallbackPayload, EResult, NativeCall, Result, SteamId};

/// `ELobbyType`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LobbyType {
    Private = 0,
    FriendsOnly = 1,
    #[default]
    Public = 2,
    Invisible = 3,
    PrivateUnique = 4,
}

impl LobbyType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::FriendsOnly => "friends-only",
            Self::Public => "public",
            Self::Invisible => "invisible",
            Self::PrivateUnique => "private-unique",
        }
    }
}

impl fmt::Display for LobbyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LobbyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "friends-only" => Ok(Self::FriendsOnly),
            "public" => Ok(Self::Public),
            "invisible" => Ok(Self::Invisible),
            "private-unique" => Ok(Self::PrivateUnique),
            other => Err(format!("unknown lobby type '{other}'")),
        }
    }
}

/// `LobbyCreated_t`. The SDK packs callback structures to 4 bytes except on
/// Windows.
#[cfg_attr(not(windows), repr(C, packed(4)))]
#[cfg_attr(windows, repr(C))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyCreated {
    pub result: EResult,
    pub lobby: SteamId,
}

impl LobbyCreated {
    pub const fn result(&self) -> EResult {
        self.result
    }

    /// Zero when creation failed.
    pub const fn lobby(&self) -> SteamId {
        self.lobby
    }
}

// SAFETY: plain integers, every bit pattern is valid.
unsafe impl CallbackPayload for LobbyCreated {
    const CALLBACK_ID: i32 = 513;
}

/// `LobbyMatchList_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyMatchList {
    pub lobbies_matching: u32,
}

// SAFETY: a single integer.
unsafe impl CallbackPayload for LobbyMatchList {
    const CALLBACK_ID: i32 = 510;
}

pub struct SteamMatchmaking {
    native: Arc<dyn NativeCall>,
    this: usize,
    poller: CallPoller,
}

impl SteamMatchmaking {
    pub fn new(native: Arc<dyn NativeCall>, poller: CallPoller) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_MATCHMAKING)?;
        Ok(Self {
            native,
            this,
            poller,
        })
    }

    /// Start creating a lobby; the result arrives as [`LobbyCreated`].
    pub fn create_lobby_async(&self, kind: LobbyType, max_members: i32) -> Result<ApiCallHandle> {
        require_wide_words(symbols::MATCHMAKING_CREATE_LOBBY)?;
        let call = self.native.call(
            symbols::MATCHMAKING_CREATE_LOBBY,
            &[self.this, kind as i32 as usize, max_members as usize],
        )?;
        let handle = ApiCallHandle(call.as_u64());
        debug!(call = %handle, %kind, max_members, "create lobby started");
        Ok(handle)
    }

    /// Create a lobby and wait for the outcome.
    pub fn create_lobby(&self, kind: LobbyType, max_members: i32) -> std::result::Result<LobbyCreated, CallError> {
        let handle = self.create_lobby_async(kind, max_members)?;
        let created = self.poller.wait_for::<LobbyCreated>(handle)?;
        info!(result = %created.result(), lobby = %created.lobby(), "lobby created");
        Ok(created)
    }

    /// Start a lobby search; the result arrives as [`LobbyMatchList`].
    pub fn request_lobby_list_async(&self) -> Result<ApiCallHandle> {
        require_wide_words(symbols::MATCHMAKING_REQUEST_LOBBY_LIST)?;
        let call = self
            .native
            .call(symbols::MATCHMAKING_REQUEST_LOBBY_LIST, &[self.this])?;
        Ok(ApiCallHandle(call.as_u64()))
    }

    pub fn request_lobby_list(&self) -> std::result::Result<LobbyMatchList, CallError> {
        let handle = self.request_lobby_list_async()?;
        self.poller.wait_for::<LobbyMatchList>(handle)
    }

    /// Lobby at `index` of the last search; only valid after
    /// [`request_lobby_list`](Self::request_lobby_list) completed.
    pub fn lobby_by_index(&self, index: i32) -> Result<SteamId> {
        require_wide_words(symbols::MATCHMAKING_GET_LOBBY_BY_INDEX)?;
        let lobby = self.native.call(
            symbols::MATCHMAKING_GET_LOBBY_BY_INDEX,
            &[self.this, index as usize],
        )?;
        Ok(SteamId(lobby.as_u64()))
    }

    pub fn leave_lobby(&self, lobby: SteamId) -> Result<()> {
        require_wide_words(symbols::MATCHMAKING_LEAVE_LOBBY)?;
        self.native
            .call(symbols::MATCHMAKING_LEAVE_LOBBY, &[self.this, lobby.0 as usize])?;
        Ok(())
    }
}
