use std::ffi::{CStr, c_char};

/// Raw return value of a native call.
///
/// The flat API returns everything in one register; how those bits are read
/// depends on the declared C return type of the function that was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct NativeWord(pub usize);

impl NativeWord {
    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    /// C `bool` only defines the low byte; the rest of the register is garbage.
    #[inline]
    pub const fn as_bool(self) -> bool {
        self.0 as u8 != 0
    }

    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    #[inline]
    pub const fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Copy a NUL-terminated string out of native memory.
    ///
    /// # Safety
    /// The word must be null or point to a NUL-terminated string that stays
    /// valid for the duration of this call.
    pub unsafe fn to_string_lossy(self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(self.as_ptr::<c_char>()) };
        Some(text.to_string_lossy().into_owned())
    }
}

impl From<usize> for NativeWord {
    fn from(value: usize) -> Self {
        Self(value)
    }
}
