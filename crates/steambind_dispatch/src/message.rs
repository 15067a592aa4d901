use steambind_sys::{
    API_CALL_COMPLETED, ApiCallCompleted, ApiCallHandle, CallbackMsg, CallbackPayload, Error,
    Result,
};

/// A callback message borrowed from the native queue. Only valid until the
/// message is released, which the drain loop does right after the visitor
/// returns.
#[derive(Debug, Clone, Copy)]
pub struct CallbackMessage<'a> {
    pub user: i32,
    pub callback_type: i32,
    pub payload: &'a [u8],
}

impl<'a> CallbackMessage<'a> {
    /// # Safety
    /// `raw.param` must be valid for `raw.param_len` bytes for `'a`.
    pub(crate) unsafe fn from_raw(raw: &'a CallbackMsg) -> Self {
        let payload: &'a [u8] = match usize::try_from(raw.param_len) {
            Ok(len) if len > 0 && !raw.param.is_null() => unsafe {
                std::slice::from_raw_parts(raw.param.cast_const(), len)
            },
            _ => &[][..],
        };
        Self {
            user: raw.user,
            callback_type: raw.callback,
            payload,
        }
    }

    /// The completion notice carried by this message, if it is one.
    pub fn completion(&self) -> Option<CompletionNotice> {
        if self.callback_type != API_CALL_COMPLETED {
            return None;
        }
        let notice = ApiCallCompleted::read_from(self.payload)?;
        Some(CompletionNotice {
            handle: ApiCallHandle(notice.async_call),
            callback_type: notice.callback,
            result_len: notice.param_len as usize,
        })
    }
}

/// An asynchronous call finished; its result is waiting on the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionNotice {
    pub handle: ApiCallHandle,
    pub callback_type: i32,
    pub result_len: usize,
}

/// Owned copy of an asynchronous call's result structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBuffer {
    data: Vec<u8>,
    callback_type: i32,
    io_failure: bool,
}

impl ResultBuffer {
    pub fn new(data: Vec<u8>, callback_type: i32, io_failure: bool) -> Self {
        Self {
            data,
            callback_type,
            io_failure,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn callback_type(&self) -> i32 {
        self.callback_type
    }

    pub fn io_failure(&self) -> bool {
        self.io_failure
    }

    /// Reinterpret the bytes as the result structure `T`.
    pub fn decode<T: CallbackPayload>(&self) -> Result<T> {
        if self.callback_type != T::CALLBACK_ID {
            return Err(Error::CallbackMismatch {
                expected: T::CALLBACK_ID,
                actual: self.callback_type,
            });
        }
        T::read_from(&self.data).ok_or(Error::ResultSize {
            expected: size_of::<T>(),
            actual: self.data.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct MatchCount {
        lobbies: u32,
    }

    unsafe impl CallbackPayload for MatchCount {
        const CALLBACK_ID: i32 = 510;
    }

    #[test]
    fn test_decode_checks_type_and_size() {
        let ok = ResultBuffer::new(3u32.to_ne_bytes().to_vec(), 510, false);
        assert_eq!(ok.decode::<MatchCount>().unwrap(), MatchCount { lobbies: 3 });

        let wrong_type = ResultBuffer::new(3u32.to_ne_bytes().to_vec(), 513, false);
        assert!(matches!(
            wrong_type.decode::<MatchCount>(),
            Err(Error::CallbackMismatch { expected: 510, actual: 513 })
        ));

        let short = ResultBuffer::new(vec![1, 2], 510, false);
        assert!(matches!(
            short.decode::<MatchCount>(),
            Err(Error::ResultSize { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_non_completion_has_no_notice() {
        let payload = [0u8; 16];
        let raw = CallbackMsg {
            user: 1,
            callback: 304,
            param: payload.as_ptr().cast_mut(),
            param_len: 16,
        };
        let message = unsafe { CallbackMessage::from_raw(&raw) };
        assert_eq!(message.payload.len(), 16);
        assert!(message.completion().is_none());
    }

    #[test]
    fn test_truncated_completion_is_ignored() {
        let payload = [0u8; 8];
        let raw = CallbackMsg {
            user: 1,
            callback: API_CALL_COMPLETED,
            param: payload.as_ptr().cast_mut(),
            param_len: 8,
        };
        let message = unsafe { CallbackMessage::from_raw(&raw) };
        assert!(message.completion().is_none());
    }
}
