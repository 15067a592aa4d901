//! Handle types and the few native structures the dispatch core reads.

use std::fmt;

/// Callback type of the notice that an asynchronous call has finished
/// (`k_iSteamUtilsCallbacks + 3`).
pub const API_CALL_COMPLETED: i32 = 703;

/// Maximum number of controllers `GetConnectedControllers` reports.
pub const STEAM_INPUT_MAX_COUNT: usize = 16;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AppId(pub u32);

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SteamId(pub u64);

impl SteamId {
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputHandle(pub u64);

/// Token for one in-flight asynchronous native operation.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ApiCallHandle(pub u64);

impl ApiCallHandle {
    /// `k_uAPICallInvalid`, returned when a call could not be started.
    pub const INVALID: Self = Self(0);

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ApiCallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Connection used for manual callback dispatch.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipeHandle(pub i32);

/// Native callback slot allocated by the callback shim.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub i32);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `EResult` as reported inside call results.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EResult(pub i32);

impl EResult {
    pub const NONE: Self = Self(0);
    pub const OK: Self = Self(1);
    pub const FAIL: Self = Self(2);
    pub const NO_CONNECTION: Self = Self(3);
    pub const INVALID_PARAM: Self = Self(8);
    pub const FILE_NOT_FOUND: Self = Self(9);
    pub const BUSY: Self = Self(10);
    pub const INVALID_STATE: Self = Self(11);
    pub const ACCESS_DENIED: Self = Self(15);
    pub const TIMEOUT: Self = Self(16);
    pub const NOT_LOGGED_ON: Self = Self(21);
    pub const PENDING: Self = Self(22);
    pub const LIMIT_EXCEEDED: Self = Self(25);
    pub const IO_FAILURE: Self = Self(37);
    pub const NO_MATCH: Self = Self(42);
    pub const SERVICE_READ_ONLY: Self = Self(44);
    pub const RATE_LIMIT_EXCEEDED: Self = Self(84);

    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }

    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "None",
            1 => "OK",
            2 => "Fail",
            3 => "NoConnection",
            8 => "InvalidParam",
            9 => "FileNotFound",
            10 => "Busy",
            11 => "InvalidState",
            15 => "AccessDenied",
            16 => "Timeout",
            21 => "NotLoggedOn",
            22 => "Pending",
            25 => "LimitExceeded",
            37 => "IOFailure",
            42 => "NoMatch",
            44 => "ServiceReadOnly",
            84 => "RateLimitExceeded",
            _ => return None,
        })
    }
}

impl fmt::Display for EResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "EResult({})", self.0),
        }
    }
}

/// `CallbackMsg_t`, filled in by `SteamAPI_ManualDispatch_GetNextCallback`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CallbackMsg {
    pub user: i32,
    pub callback: i32,
    pub param: *mut u8,
    pub param_len: i32,
}

impl Default for CallbackMsg {
    fn default() -> Self {
        Self {
            user: 0,
            callback: 0,
            param: std::ptr::null_mut(),
            param_len: 0,
        }
    }
}

/// `SteamAPICallCompleted_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApiCallCompleted {
    pub async_call: u64,
    pub callback: i32,
    pub param_len: u32,
}

/// Plain-data structure the native side delivers as a callback payload or an
/// asynchronous call result.
///
/// # Safety
/// Implementors must be `#[repr(C)]` with the exact layout the native library
/// writes, and every bit pattern of that size must be a valid value.
pub unsafe trait CallbackPayload: Copy {
    const CALLBACK_ID: i32;

    /// Reinterpret the start of `bytes`, or `None` when too short.
    fn read_from(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < size_of::<Self>() {
            return None;
        }
        // SAFETY: length checked above; the trait contract makes any bit
        // pattern valid, and `read_unaligned` tolerates the byte alignment.
        Some(unsafe { bytes.as_ptr().cast::<Self>().read_unaligned() })
    }
}

unsafe impl CallbackPayload for ApiCallCompleted {
    const CALLBACK_ID: i32 = API_CALL_COMPLETED;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_layout() {
        assert_eq!(size_of::<ApiCallCompleted>(), 16);
        assert_eq!(std::mem::offset_of!(ApiCallCompleted, callback), 8);
        assert_eq!(std::mem::offset_of!(ApiCallCompleted, param_len), 12);
    }

    #[test]
    fn test_read_from_rejects_short_buffers() {
        assert!(ApiCallCompleted::read_from(&[0u8; 15]).is_none());

        let mut bytes = vec![0u8; 17];
        bytes[..8].copy_from_slice(&42u64.to_ne_bytes());
        bytes[8..12].copy_from_slice(&513i32.to_ne_bytes());
        bytes[12..16].copy_from_slice(&12u32.to_ne_bytes());
        let notice = ApiCallCompleted::read_from(&bytes).unwrap();
        assert_eq!(notice.async_call, 42);
        assert_eq!(notice.callback, 513);
        assert_eq!(notice.param_len, 12);
    }

    #[test]
    fn test_eresult_display() {
        assert_eq!(EResult::OK.to_string(), "OK");
        assert_eq!(EResult(9999).to_string(), "EResult(9999)");
        assert!(EResult::OK.is_ok());
        assert!(!EResult::FAIL.is_ok());
    }
}
