use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::interface::{acquire, length_arg};
use steambind_sys::symbols;
use steambind_sys::{EResult, Error, NativeCall, Result, SteamId};

/// `ESteamNetworkingIdentityType`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IdentityType(pub i32);

impl IdentityType {
    pub const INVALID: Self = Self(0);
    pub const IP_ADDRESS: Self = Self(1);
    pub const GENERIC_STRING: Self = Self(2);
    pub const GENERIC_BYTES: Self = Self(3);
    pub const STEAM_ID: Self = Self(16);
}

const IDENTITY_DATA_LEN: usize = 128;
const GENERIC_STRING_MAX: usize = 32;

/// `SteamNetworkingIdentity`. Byte-packed in the SDK, so the layout is the
/// same on every platform. The wrappers pass it to the library by address.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NetworkingIdentity {
    kind: IdentityType,
    size: i32,
    data: [u8; IDENTITY_DATA_LEN],
}

impl Default for NetworkingIdentity {
    fn default() -> Self {
        Self {
            kind: IdentityType::INVALID,
            size: 0,
            data: [0; IDENTITY_DATA_LEN],
        }
    }
}

impl NetworkingIdentity {
    pub fn from_steam_id(id: SteamId) -> Self {
        let mut identity = Self {
            kind: IdentityType::STEAM_ID,
            size: size_of::<u64>() as i32,
            ..Self::default()
        };
        identity.data[..8].copy_from_slice(&id.0.to_ne_bytes());
        identity
    }

    /// A free-form identity; at most 31 bytes plus the terminating NUL.
    pub fn from_generic_string(name: &str) -> Result<Self> {
        let bytes = steambind_sys::c_string(name)?.into_bytes_with_nul();
        if bytes.len() > GENERIC_STRING_MAX {
            return Err(Error::ArgumentRange {
                what: "generic identity string",
                value: bytes.len(),
            });
        }
        let mut identity = Self {
            kind: IdentityType::GENERIC_STRING,
            size: bytes.len() as i32,
            ..Self::default()
        };
        identity.data[..bytes.len()].copy_from_slice(&bytes);
        Ok(identity)
    }

    pub fn kind(&self) -> IdentityType {
        self.kind
    }

    pub fn steam_id(&self) -> Option<SteamId> {
        if self.kind != IdentityType::STEAM_ID {
            return None;
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.data[..8]);
        Some(SteamId(u64::from_ne_bytes(word)))
    }

    pub fn generic_string(&self) -> Option<String> {
        (self.kind == IdentityType::GENERIC_STRING).then(|| nul_terminated(&self.data))
    }

    fn as_arg(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }
}

impl fmt::Debug for NetworkingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.steam_id(), self.generic_string()) {
            (Some(id), _) => write!(f, "steamid:{id}"),
            (_, Some(name)) => write!(f, "str:{name}"),
            _ => write!(f, "identity(kind {})", self.kind.0),
        }
    }
}

/// `k_nSteamNetworkingSend_*` flags.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SendFlags(pub i32);

impl SendFlags {
    pub const UNRELIABLE: Self = Self(0);
    pub const NO_NAGLE: Self = Self(1);
    pub const NO_DELAY: Self = Self(4);
    pub const RELIABLE: Self = Self(8);
    pub const USE_CURRENT_THREAD: Self = Self(16);
    pub const AUTO_RESTART_BROKEN_SESSION: Self = Self(32);
}

impl BitOr for SendFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// `ESteamNetworkingConnectionState`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionState(pub i32);

impl ConnectionState {
    pub const NONE: Self = Self(0);
    pub const CONNECTING: Self = Self(1);
    pub const FINDING_ROUTE: Self = Self(2);
    pub const CONNECTED: Self = Self(3);
    pub const CLOSED_BY_PEER: Self = Self(4);
    pub const PROBLEM_DETECTED_LOCALLY: Self = Self(5);
    pub const FIN_WAIT: Self = Self(-1);
    pub const LINGER: Self = Self(-2);
    pub const DEAD: Self = Self(-3);

    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "None",
            1 => "Connecting",
            2 => "FindingRoute",
            3 => "Connected",
            4 => "ClosedByPeer",
            5 => "ProblemDetectedLocally",
            -1 => "FinWait",
            -2 => "Linger",
            -3 => "Dead",
            _ => return None,
        })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "ConnectionState({})", self.0),
        }
    }
}

/// `SteamNetworkingIPAddr`: IPv6, or IPv4 mapped into IPv6, and a port.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkingAddr {
    pub ipv6: [u8; 16],
    pub port: u16,
}

/// `SteamNetConnectionInfo_t`
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ConnectionInfo {
    pub remote: NetworkingIdentity,
    pub user_data: i64,
    pub listen_socket: u32,
    pub remote_addr: NetworkingAddr,
    _pad: u16,
    pub pop_remote: u32,
    pub pop_relay: u32,
    pub state: ConnectionState,
    pub end_reason: i32,
    end_debug: [u8; 128],
    description: [u8; 128],
    pub flags: i32,
    _reserved: [u32; 63],
}

impl ConnectionInfo {
    pub fn end_debug(&self) -> String {
        nul_terminated(&self.end_debug)
    }

    pub fn description(&self) -> String {
        nul_terminated(&self.description)
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        // SAFETY: integers and byte arrays only; all zeroes is a valid value.
        unsafe { std::mem::zeroed() }
    }
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("remote", &self.remote)
            .field("state", &self.state)
            .field("end_reason", &self.end_reason)
            .field("description", &self.description())
            .finish_non_exhaustive()
    }
}

/// `SteamNetConnectionRealTimeStatus_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RealTimeStatus {
    pub state: ConnectionState,
    pub ping_ms: i32,
    pub quality_local: f32,
    pub quality_remote: f32,
    pub out_packets_per_sec: f32,
    pub out_bytes_per_sec: f32,
    pub in_packets_per_sec: f32,
    pub in_bytes_per_sec: f32,
    pub send_rate_bytes_per_sec: i32,
    pub pending_unreliable: i32,
    pub pending_reliable: i32,
    pub sent_unacked_reliable: i32,
    pub queue_time_us: i64,
    _reserved: [u32; 16],
}

/// Everything `GetSessionConnectionInfo` reports about one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo {
    pub state: ConnectionState,
    pub info: ConnectionInfo,
    pub status: RealTimeStatus,
}

/// `SteamNetworkingMessage_t`, as far as the wrappers read it.
#[cfg_attr(not(windows), repr(C, packed(4)))]
#[cfg_attr(windows, repr(C))]
#[derive(Clone, Copy)]
struct RawMessage {
    data: usize,
    size: i32,
    _connection: u32,
    peer: NetworkingIdentity,
    _connection_user_data: i64,
    time_received: i64,
    message_number: i64,
    _free_data: usize,
    _release: usize,
    channel: i32,
    flags: i32,
    _user_data: i64,
    _lane: u16,
    _pad: u16,
}

/// A message owned by the library until it is released. Dropping it
/// releases it; [`release`](Self::release) does the same and reports errors.
pub struct ReceivedMessage {
    native: Arc<dyn NativeCall>,
    ptr: usize,
    data: usize,
    len: usize,
    peer: NetworkingIdentity,
    channel: i32,
    flags: i32,
    message_number: i64,
    time_received: i64,
}

impl ReceivedMessage {
    /// Copy the header out of the native message at `ptr`.
    ///
    /// # Safety
    /// `ptr` must point at a live `SteamNetworkingMessage_t` that stays valid
    /// until released through `native`.
    unsafe fn from_raw(native: Arc<dyn NativeCall>, ptr: usize) -> Self {
        // SAFETY: guaranteed by the caller; the native struct may be less
        // aligned than the Rust one.
        let raw = unsafe { (ptr as *const RawMessage).read_unaligned() };
        Self {
            native,
            ptr,
            data: raw.data,
            len: usize::try_from(raw.size).unwrap_or(0),
            peer: raw.peer,
            channel: raw.channel,
            flags: raw.flags,
            message_number: raw.message_number,
            time_received: raw.time_received,
        }
    }

    pub fn data(&self) -> &[u8] {
        if self.data == 0 || self.len == 0 {
            return &[];
        }
        // SAFETY: the library keeps `len` bytes at `data` alive until this
        // message is released, which needs `self` by value or on drop.
        unsafe { std::slice::from_raw_parts(self.data as *const u8, self.len) }
    }

    pub fn peer(&self) -> &NetworkingIdentity {
        &self.peer
    }

    pub fn channel(&self) -> i32 {
        self.channel
    }

    pub fn flags(&self) -> SendFlags {
        SendFlags(self.flags)
    }

    pub fn message_number(&self) -> i64 {
        self.message_number
    }

    /// Local receive time in microseconds.
    pub fn time_received(&self) -> i64 {
        self.time_received
    }

    pub fn release(mut self) -> Result<()> {
        self.release_native()
    }

    fn release_native(&mut self) -> Result<()> {
        let ptr = std::mem::take(&mut self.ptr);
        if ptr == 0 {
            return Ok(());
        }
        self.native.call(symbols::NETWORKING_MESSAGE_RELEASE, &[ptr])?;
        trace!(message = self.message_number, "released networking message");
        Ok(())
    }
}

impl Drop for ReceivedMessage {
    fn drop(&mut self) {
        if let Err(err) = self.release_native() {
            warn!(error = %err, "failed to release networking message");
        }
    }
}

impl fmt::Debug for ReceivedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivedMessage")
            .field("peer", &self.peer)
            .field("channel", &self.channel)
            .field("message_number", &self.message_number)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Release every message, even after a failure; returns the first error.
pub fn release_messages(messages: impl IntoIterator<Item = ReceivedMessage>) -> Result<()> {
    let mut first = None;
    for message in messages {
        if let Err(err) = message.release() {
            first.get_or_insert(err);
        }
    }
    first.map_or(Ok(()), Err)
}

/// Connectionless messaging with other users over Steam's relay network.
pub struct SteamNetworkingMessages {
    native: Arc<dyn NativeCall>,
    this: usize,
}

impl SteamNetworkingMessages {
    pub fn new(native: Arc<dyn NativeCall>) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_NETWORKING_MESSAGES)?;
        Ok(Self { native, this })
    }

    pub fn send_message_to_user(
        &self,
        remote: &NetworkingIdentity,
        data: &[u8],
        flags: SendFlags,
        channel: i32,
    ) -> Result<EResult> {
        let len = length_arg("message", data.len())?;
        let result = EResult(
            self.native
                .call(
                    symbols::NETWORKING_MESSAGES_SEND_MESSAGE_TO_USER,
                    &[
                        self.this,
                        remote.as_arg(),
                        data.as_ptr() as usize,
                        len,
                        flags.0 as usize,
                        channel as usize,
                    ],
                )?
                .as_i32(),
        );
        debug!(peer = ?remote, len, channel, %result, "sent message");
        Ok(result)
    }

    /// Take up to `max_messages` waiting messages on `channel`.
    pub fn receive_messages_on_channel(
        &self,
        channel: i32,
        max_messages: usize,
    ) -> Result<Vec<ReceivedMessage>> {
        if max_messages == 0 {
            return Ok(Vec::new());
        }
        let max = length_arg("max messages", max_messages)?;
        let mut out = vec![0usize; max_messages];
        let count = self
            .native
            .call(
                symbols::NETWORKING_MESSAGES_RECEIVE_MESSAGES_ON_CHANNEL,
                &[self.this, channel as usize, out.as_mut_ptr() as usize, max],
            )?
            .as_i32();
        let count = usize::try_from(count).unwrap_or(0).min(max_messages);

        let messages: Vec<_> = out[..count]
            .iter()
            .filter(|ptr| **ptr != 0)
            // SAFETY: the library filled `count` entries with messages that
            // are ours until released.
            .map(|&ptr| unsafe { ReceivedMessage::from_raw(Arc::clone(&self.native), ptr) })
            .collect();
        if messages.len() != count {
            warn!(channel, count, "library returned null message pointers");
        }
        trace!(channel, count = messages.len(), "received messages");
        Ok(messages)
    }

    pub fn accept_session_with_user(&self, remote: &NetworkingIdentity) -> Result<bool> {
        Ok(self
            .native
            .call(
                symbols::NETWORKING_MESSAGES_ACCEPT_SESSION_WITH_USER,
                &[self.this, remote.as_arg()],
            )?
            .as_bool())
    }

    pub fn close_session_with_user(&self, remote: &NetworkingIdentity) -> Result<bool> {
        Ok(self
            .native
            .call(
                symbols::NETWORKING_MESSAGES_CLOSE_SESSION_WITH_USER,
                &[self.this, remote.as_arg()],
            )?
            .as_bool())
    }

    pub fn close_channel_with_user(&self, remote: &NetworkingIdentity, channel: i32) -> Result<bool> {
        Ok(self
            .native
            .call(
                symbols::NETWORKING_MESSAGES_CLOSE_CHANNEL_WITH_USER,
                &[self.this, remote.as_arg(), channel as usize],
            )?
            .as_bool())
    }

    pub fn session_connection_info(&self, remote: &NetworkingIdentity) -> Result<SessionInfo> {
        let mut info = ConnectionInfo::default();
        let mut status = RealTimeStatus::default();
        let state = self
            .native
            .call(
                symbols::NETWORKING_MESSAGES_GET_SESSION_CONNECTION_INFO,
                &[
                    self.this,
                    remote.as_arg(),
                    (&raw mut info) as usize,
                    (&raw mut status) as usize,
                ],
            )?
            .as_i32();
        Ok(SessionInfo {
            state: ConnectionState(state),
            info,
            status,
        })
    }
}

fn nul_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
