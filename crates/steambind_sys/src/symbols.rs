//! Exported names of the flat API and the callback shim.

pub const RESTART_APP_IF_NECESSARY: &str = "SteamAPI_RestartAppIfNecessary";
pub const INIT: &str = "SteamAPI_Init";
pub const SHUTDOWN: &str = "SteamAPI_Shutdown";
pub const RUN_CALLBACKS: &str = "SteamAPI_RunCallbacks";
pub const RELEASE_CURRENT_THREAD_MEMORY: &str = "SteamAPI_ReleaseCurrentThreadMemory";

pub const GET_HSTEAM_PIPE: &str = "SteamAPI_GetHSteamPipe";
pub const MANUAL_DISPATCH_INIT: &str = "SteamAPI_ManualDispatch_Init";
pub const MANUAL_DISPATCH_RUN_FRAME: &str = "SteamAPI_ManualDispatch_RunFrame";
pub const MANUAL_DISPATCH_GET_NEXT_CALLBACK: &str = "SteamAPI_ManualDispatch_GetNextCallback";
pub const MANUAL_DISPATCH_FREE_LAST_CALLBACK: &str = "SteamAPI_ManualDispatch_FreeLastCallback";
pub const MANUAL_DISPATCH_GET_API_CALL_RESULT: &str = "SteamAPI_ManualDispatch_GetAPICallResult";

// Callback shim
pub const REGISTER_CALLBACK: &str = "Register_Callback";
pub const UNREGISTER_CALLBACK: &str = "Unregister_Callback";
pub const SET_CALLBACK_DISPATCHER: &str = "SetCallbackDispatcher";

pub const STEAM_APPS: &str = "SteamAPI_SteamApps_v008";
pub const APPS_GET_APP_INSTALL_DIR: &str = "SteamAPI_ISteamApps_GetAppInstallDir";
pub const APPS_GET_CURRENT_GAME_LANGUAGE: &str = "SteamAPI_ISteamApps_GetCurrentGameLanguage";

pub const STEAM_INPUT: &str = "SteamAPI_SteamInput_v006";
pub const INPUT_GET_CONNECTED_CONTROLLERS: &str = "SteamAPI_ISteamInput_GetConnectedControllers";
pub const INPUT_GET_INPUT_TYPE_FOR_HANDLE: &str = "SteamAPI_ISteamInput_GetInputTypeForHandle";
pub const INPUT_INIT: &str = "SteamAPI_ISteamInput_Init";
pub const INPUT_RUN_FRAME: &str = "SteamAPI_ISteamInput_RunFrame";

pub const STEAM_REMOTE_STORAGE: &str = "SteamAPI_SteamRemoteStorage_v016";
pub const REMOTE_STORAGE_FILE_WRITE: &str = "SteamAPI_ISteamRemoteStorage_FileWrite";
pub const REMOTE_STORAGE_FILE_READ: &str = "SteamAPI_ISteamRemoteStorage_FileRead";
pub const REMOTE_STORAGE_FILE_DELETE: &str = "SteamAPI_ISteamRemoteStorage_FileDelete";
pub const REMOTE_STORAGE_GET_FILE_SIZE: &str = "SteamAPI_ISteamRemoteStorage_GetFileSize";

pub const STEAM_USER: &str = "SteamAPI_SteamUser_v021";
pub const USER_GET_STEAM_ID: &str = "SteamAPI_ISteamUser_GetSteamID";

pub const STEAM_USER_STATS: &str = "SteamAPI_SteamUserStats_v012";
pub const USER_STATS_REQUEST_CURRENT_STATS: &str = "SteamAPI_ISteamUserStats_RequestCurrentStats";
pub const USER_STATS_GET_ACHIEVEMENT: &str = "SteamAPI_ISteamUserStats_GetAchievement";
pub const USER_STATS_SET_ACHIEVEMENT: &str = "SteamAPI_ISteamUserStats_SetAchievement";
pub const USER_STATS_CLEAR_ACHIEVEMENT: &str = "SteamAPI_ISteamUserStats_ClearAchievement";
pub const USER_STATS_STORE_STATS: &str = "SteamAPI_ISteamUserStats_StoreStats";

pub const STEAM_UTILS: &str = "SteamAPI_SteamUtils_v010";
pub const UTILS_IS_STEAM_RUNNING_ON_STEAM_DECK: &str =
    "SteamAPI_ISteamUtils_IsSteamRunningOnSteamDeck";
pub const UTILS_SET_WARNING_MESSAGE_HOOK: &str = "SteamAPI_ISteamUtils_SetWarningMessageHook";

pub const STEAM_MATCHMAKING: &str = "SteamAPI_SteamMatchmaking_v009";
pub const MATCHMAKING_REQUEST_LOBBY_LIST: &str = "SteamAPI_ISteamMatchmaking_RequestLobbyList";
pub const MATCHMAKING_GET_LOBBY_BY_INDEX: &str = "SteamAPI_ISteamMatchmaking_GetLobbyByIndex";
pub const MATCHMAKING_CREATE_LOBBY: &str = "SteamAPI_ISteamMatchmaking_CreateLobby";
pub const MATCHMAKING_LEAVE_LOBBY: &str = "SteamAPI_ISteamMatchmaking_LeaveLobby";

pub const STEAM_NETWORKING_MESSAGES: &str = "SteamAPI_SteamNetworkingMessages_SteamAPI_v002";
pub const NETWORKING_MESSAGES_SEND_MESSAGE_TO_USER: &str =
    "SteamAPI_ISteamNetworkingMessages_SendMessageToUser";
pub const NETWORKING_MESSAGES_RECEIVE_MESSAGES_ON_CHANNEL: &str =
    "SteamAPI_ISteamNetworkingMessages_ReceiveMessagesOnChannel";
pub const NETWORKING_MESSAGES_ACCEPT_SESSION_WITH_USER: &str =
    "SteamAPI_ISteamNetworkingMessages_AcceptSessionWithUser";
pub const NETWORKING_MESSAGES_CLOSE_SESSION_WITH_USER: &str =
    "SteamAPI_ISteamNetworkingMessages_CloseSessionWithUser";
pub const NETWORKING_MESSAGES_CLOSE_CHANNEL_WITH_USER: &str =
    "SteamAPI_ISteamNetworkingMessages_CloseChannelWithUser";
pub const NETWORKING_MESSAGES_GET_SESSION_CONNECTION_INFO: &str =
    "SteamAPI_ISteamNetworkingMessages_GetSessionConnectionInfo";
pub const NETWORKING_MESSAGE_RELEASE: &str = "SteamAPI_SteamNetworkingMessage_t_Release";
