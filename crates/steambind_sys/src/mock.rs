//! Scripted in-memory native library.
//!
//! `MockNative` records every call and implements the manual dispatch symbols
//! and the callback shim against queues the test fills in. Any other symbol
//! returns 0 unless a responder is installed with [`MockNative::respond`] or
//! it is marked missing with [`MockNative::remove_symbol`].

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::gateway::NativeCall;
use crate::symbols;
use crate::types::{API_CALL_COMPLETED, ApiCallCompleted, CallbackMsg};
use crate::word::NativeWord;

pub const MOCK_PIPE: i32 = 7;

type Responder = Arc<dyn Fn(&[usize]) -> usize + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub name: String,
    pub args: Vec<usize>,
}

struct QueuedResult {
    data: Vec<u8>,
    io_failure: bool,
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    responders: AHashMap<String, Responder>,
    missing: AHashSet<String>,
    queue: VecDeque<(i32, Vec<u8>)>,
    current: Option<Box<[u8]>>,
    results: AHashMap<u64, QueuedResult>,
    next_callback_id: i32,
    fetched: usize,
    released: usize,
    overlapping_fetches: usize,
    stray_releases: usize,
}

#[derive(Default)]
pub struct MockNative {
    state: Mutex<MockState>,
}

impl MockNative {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `name` with `responder(args)`.
    pub fn respond<F>(&self, name: &str, responder: F)
    where
        F: Fn(&[usize]) -> usize + Send + Sync + 'static,
    {
        self.state
            .lock()
            .responders
            .insert(name.to_string(), Arc::new(responder));
    }

    /// Make `name` fail resolution like a symbol absent from the library.
    pub fn remove_symbol(&self, name: &str) {
        self.state.lock().missing.insert(name.to_string());
    }

    /// Queue a callback message for `GetNextCallback`.
    pub fn push_message(&self, callback: i32, payload: Vec<u8>) {
        self.state.lock().queue.push_back((callback, payload));
    }

    /// Queue a completion notice for `handle` and store `result` for
    /// `GetAPICallResult`.
    pub fn push_completion(&self, handle: u64, callback: i32, result: Vec<u8>) {
        self.push_completion_with(handle, callback, result, false);
    }

    pub fn push_completion_with(&self, handle: u64, callback: i32, result: Vec<u8>, io_failure: bool) {
        let notice = ApiCallCompleted {
            async_call: handle,
            callback,
            param_len: result.len() as u32,
        };
        let mut state = self.state.lock();
        state.queue.push_back((API_CALL_COMPLETED, notice_bytes(&notice)));
        state.results.insert(
            handle,
            QueuedResult {
                data: result,
                io_failure,
            },
        );
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.name == name)
            .count()
    }

    /// Messages handed out by `GetNextCallback`.
    pub fn fetched(&self) -> usize {
        self.state.lock().fetched
    }

    /// `FreeLastCallback` calls that released a message.
    pub fn released(&self) -> usize {
        self.state.lock().released
    }

    /// Fetches made while the previous message was still unreleased.
    pub fn overlapping_fetches(&self) -> usize {
        self.state.lock().overlapping_fetches
    }

    /// `FreeLastCallback` calls with nothing to release.
    pub fn stray_releases(&self) -> usize {
        self.state.lock().stray_releases
    }

    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn builtin(&self, name: &str, args: &[usize]) -> Option<usize> {
        let mut state = self.state.lock();
        let value = match name {
            symbols::GET_HSTEAM_PIPE => MOCK_PIPE as usize,
            symbols::MANUAL_DISPATCH_GET_NEXT_CALLBACK => {
                if state.current.is_some() {
                    state.overlapping_fetches += 1;
                }
                let Some((callback, payload)) = state.queue.pop_front() else {
                    return Some(0);
                };
                let payload = payload.into_boxed_slice();
                let msg = CallbackMsg {
                    user: 1,
                    callback,
                    param: payload.as_ptr().cast_mut(),
                    param_len: payload.len() as i32,
                };
                state.current = Some(payload);
                state.fetched += 1;
                // SAFETY: the caller passes the address of a live CallbackMsg.
                unsafe { (args[1] as *mut CallbackMsg).write(msg) };
                1
            }
            symbols::MANUAL_DISPATCH_FREE_LAST_CALLBACK => {
                if state.current.take().is_some() {
                    state.released += 1;
                } else {
                    state.stray_releases += 1;
                }
                0
            }
            symbols::MANUAL_DISPATCH_GET_API_CALL_RESULT => {
                let Some(result) = state.results.remove(&(args[1] as u64)) else {
                    return Some(0);
                };
                let len = result.data.len().min(args[3]);
                // SAFETY: the caller passes a buffer of `args[3]` bytes and the
                // address of a bool for the failure flag.
                unsafe {
                    std::ptr::copy_nonoverlapping(result.data.as_ptr(), args[2] as *mut u8, len);
                    (args[5] as *mut bool).write(result.io_failure);
                }
                1
            }
            symbols::REGISTER_CALLBACK => {
                state.next_callback_id += 1;
                state.next_callback_id as usize
            }
            _ => return None,
        };
        Some(value)
    }
}

impl NativeCall for MockNative {
    fn call(&self, name: &str, args: &[usize]) -> Result<NativeWord> {
        let responder = {
            let mut state = self.state.lock();
            if state.missing.contains(name) {
                return Err(Error::MissingSymbol {
                    name: name.to_string(),
                    reason: "removed from mock".to_string(),
                });
            }
            state.calls.push(RecordedCall {
                name: name.to_string(),
                args: args.to_vec(),
            });
            state.responders.get(name).cloned()
        };

        if let Some(responder) = responder {
            return Ok(NativeWord(responder(args)));
        }
        Ok(NativeWord(self.builtin(name, args).unwrap_or(0)))
    }
}

fn notice_bytes(notice: &ApiCallCompleted) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(size_of::<ApiCallCompleted>());
    bytes.extend_from_slice(&notice.async_call.to_ne_bytes());
    bytes.extend_from_slice(&notice.callback.to_ne_bytes());
    bytes.extend_from_slice(&notice.param_len.to_ne_bytes());
    bytes
}
