//! Thin wrappers over the versioned flat-API interfaces.
//!
//! Each wrapper fetches its interface pointer once through the accessor
//! (`SteamAPI_SteamApps_v008` and friends) and then packs arguments into
//! native words for [`NativeCall`](steambind_sys::NativeCall). Asynchronous
//! matchmaking calls complete through
//! [`CallPoller`](steambind_dispatch::CallPoller).

pub mod apps;
pub mod input;
mod interface;
pub mod matchmaking;
pub mod networking_messages;
pub mod remote_storage;
pub mod user;
pub mod user_stats;
pub mod utils;

pub use apps::SteamApps;
pub use input::{InputType, SteamInput};
pub use matchmaking::{LobbyCreated, LobbyMatchList, LobbyType, SteamMatchmaking};
pub use networking_messages::{
    ConnectionState, NetworkingIdentity, ReceivedMessage, SendFlags, SessionInfo,
    SteamNetworkingMessages, release_messages,
};
pub use remote_storage::SteamRemoteStorage;
pub use user::SteamUser;
pub use user_stats::{SteamUserStats, UserStatsReceived};
pub use utils::SteamUtils;
