use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::message::{CallbackMessage, CompletionNotice, ResultBuffer};
use steambind_callback::CallbackRegistry;
use steambind_sys::symbols;
use steambind_sys::{ApiCallHandle, CallbackMsg, NativeCall, PipeHandle, Result};

/// Ordinary callbacks held back for `pump` before the oldest are dropped.
pub const MAX_DEFERRED: usize = 1024;

/// Owned copy of a message, delivered to handlers after the drain finishes.
enum Delivery {
    Typed { callback_type: i32, payload: Vec<u8> },
    CallResult { handle: ApiCallHandle, result: ResultBuffer },
}

/// Poll-driven access to the native callback queue.
///
/// Construct exactly one per process, after `SteamAPI_Init`. Each fetched
/// message is released before the next one is requested, on every path.
/// Completion notices for handles nobody is waiting on yet are kept in a
/// pending map, so a later `await_result` for them still succeeds even when
/// another poll consumed the notice first. Ordinary callbacks drained while
/// waiting on a call are copied into a deferred queue that the next `pump`
/// delivers ahead of anything it fetches itself.
pub struct ManualDispatch {
    native: Arc<dyn NativeCall>,
    pipe: PipeHandle,
    pending: Mutex<AHashMap<ApiCallHandle, CompletionNotice>>,
    deferred: Mutex<VecDeque<(i32, Vec<u8>)>>,
    // Serializes fetch/free sequences across threads.
    drain: Mutex<()>,
}

impl ManualDispatch {
    /// Switch the library to manual dispatch and fetch the dispatch pipe.
    pub fn init(native: Arc<dyn NativeCall>) -> Result<Self> {
        native.call(symbols::MANUAL_DISPATCH_INIT, &[])?;
        let pipe = PipeHandle(native.call(symbols::GET_HSTEAM_PIPE, &[])?.as_i32());
        debug!(pipe = pipe.0, "manual dispatch initialized");

        Ok(Self {
            native,
            pipe,
            pending: Mutex::new(AHashMap::new()),
            deferred: Mutex::new(VecDeque::new()),
            drain: Mutex::new(()),
        })
    }

    pub fn pipe(&self) -> PipeHandle {
        self.pipe
    }

    /// Completion notices seen but not yet claimed by `await_result`.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Ordinary callbacks drained by a wait and not yet pumped.
    pub fn deferred_len(&self) -> usize {
        self.deferred.lock().len()
    }

    /// One non-blocking attempt to retrieve the result of `handle`.
    ///
    /// Returns `Ok(None)` when the call has not completed yet; the caller
    /// decides when to poll again.
    pub fn await_result(&self, handle: ApiCallHandle) -> Result<Option<ResultBuffer>> {
        let _drain = self.drain.lock();
        self.run_frame()?;

        let parked = self.pending.lock().remove(&handle);
        if let Some(notice) = parked {
            match self.fetch_result(&notice)? {
                Some(result) => return Ok(Some(result)),
                None => warn!(call = %handle, "native side refused a parked call result"),
            }
        }

        self.drain_messages(|message| {
            let Some(notice) = message.completion() else {
                self.defer(message);
                return Ok(ControlFlow::Continue(()));
            };
            if notice.handle != handle {
                self.park(notice);
                return Ok(ControlFlow::Continue(()));
            }
            match self.fetch_result(&notice)? {
                Some(result) => Ok(ControlFlow::Break(result)),
                None => {
                    debug!(call = %handle, "call result not available");
                    Ok(ControlFlow::Continue(()))
                }
            }
        })
    }

    /// One non-blocking poll for the next message of `callback_type`.
    ///
    /// A deferred message of that type is taken first. Completion notices are
    /// parked and other callbacks deferred, as in
    /// [`await_result`](Self::await_result). The returned message is consumed
    /// here and never reaches the registry.
    pub fn await_callback(&self, callback_type: i32) -> Result<Option<Vec<u8>>> {
        let _drain = self.drain.lock();
        {
            let mut deferred = self.deferred.lock();
            if let Some(index) = deferred.iter().position(|(kind, _)| *kind == callback_type) {
                return Ok(deferred.remove(index).map(|(_, payload)| payload));
            }
        }

        self.run_frame()?;
        self.drain_messages(|message| {
            if let Some(notice) = message.completion() {
                self.park(notice);
            } else if message.callback_type == callback_type {
                return Ok(ControlFlow::Break(message.payload.to_vec()));
            } else {
                self.defer(message);
            }
            Ok(ControlFlow::Continue(()))
        })
    }

    /// One tick: advance the native queue, then deliver every ready message.
    ///
    /// Deferred callbacks are delivered first. Ordinary callbacks go to the
    /// handlers registered for their callback type, results of calls with a
    /// call-result registration go to that registration once, and all other
    /// completions are parked for `await_result`. Handlers run after the
    /// queue is drained, in fetch order, so they may use the gateway and this
    /// dispatcher freely. Returns the number of handler invocations.
    pub fn pump(&self, registry: &CallbackRegistry) -> Result<usize> {
        let mut deliveries = Vec::new();
        {
            let _drain = self.drain.lock();
            self.run_frame()?;
            deliveries.extend(self.deferred.lock().drain(..).map(|(callback_type, payload)| {
                Delivery::Typed {
                    callback_type,
                    payload,
                }
            }));
            self.drain_messages(|message| {
                match message.completion() {
                    Some(notice) if registry.has_call_result(notice.handle) => {
                        match self.fetch_result(&notice)? {
                            Some(result) => deliveries.push(Delivery::CallResult {
                                handle: notice.handle,
                                result,
                            }),
                            None => debug!(
                                call = %notice.handle,
                                "call result not available for its registration"
                            ),
                        }
                    }
                    Some(notice) => self.park(notice),
                    None => deliveries.push(Delivery::Typed {
                        callback_type: message.callback_type,
                        payload: message.payload.to_vec(),
                    }),
                }
                Ok(ControlFlow::<()>::Continue(()))
            })?;
        }

        let mut delivered = 0;
        for delivery in deliveries {
            delivered += match delivery {
                Delivery::Typed {
                    callback_type,
                    payload,
                } => registry.dispatch_type(callback_type, &payload, false, ApiCallHandle::INVALID),
                Delivery::CallResult { handle, result } => {
                    registry.dispatch_call_result(handle, result.bytes(), result.io_failure())
                }
            };
        }
        Ok(delivered)
    }

    /// Fetch messages until the queue is empty or `visit` breaks, releasing
    /// each one exactly once before the next fetch.
    fn drain_messages<T, F>(&self, mut visit: F) -> Result<Option<T>>
    where
        F: FnMut(&CallbackMessage<'_>) -> Result<ControlFlow<T>>,
    {
        loop {
            let Some(msg) = self.next_callback()? else {
                return Ok(None);
            };
            let outcome = {
                // SAFETY: the payload stays valid until `free_last_callback`.
                let message = unsafe { CallbackMessage::from_raw(&msg) };
                trace!(
                    user = message.user,
                    callback = message.callback_type,
                    len = message.payload.len(),
                    "callback message"
                );
                visit(&message)
            };
            self.free_last_callback()?;

            if let ControlFlow::Break(value) = outcome? {
                return Ok(Some(value));
            }
        }
    }

    fn defer(&self, message: &CallbackMessage<'_>) {
        trace!(callback = message.callback_type, "deferring callback for the next pump");
        let mut deferred = self.deferred.lock();
        if deferred.len() == MAX_DEFERRED
            && let Some((dropped, _)) = deferred.pop_front()
        {
            warn!(callback = dropped, "deferred callback queue full, dropping the oldest");
        }
        deferred.push_back((message.callback_type, message.payload.to_vec()));
    }

    fn park(&self, notice: CompletionNotice) {
        trace!(call = %notice.handle, "parking completion notice");
        self.pending.lock().insert(notice.handle, notice);
    }

    fn run_frame(&self) -> Result<()> {
        self.native
            .call(symbols::MANUAL_DISPATCH_RUN_FRAME, &[self.pipe.0 as usize])?;
        Ok(())
    }

    fn next_callback(&self) -> Result<Option<CallbackMsg>> {
        let mut msg = CallbackMsg::default();
        let available = self
            .native
            .call(
                symbols::MANUAL_DISPATCH_GET_NEXT_CALLBACK,
                &[self.pipe.0 as usize, (&raw mut msg) as usize],
            )?
            .as_bool();
        Ok(available.then_some(msg))
    }

    fn free_last_callback(&self) -> Result<()> {
        self.native.call(
            symbols::MANUAL_DISPATCH_FREE_LAST_CALLBACK,
            &[self.pipe.0 as usize],
        )?;
        Ok(())
    }

    /// Copy the result of a completed call out of the native side. `None`
    /// when the library reports it cannot provide it.
    fn fetch_result(&self, notice: &CompletionNotice) -> Result<Option<ResultBuffer>> {
        let mut data = vec![0u8; notice.result_len];
        let mut failed = false;
        let delivered = self
            .native
            .call(
                symbols::MANUAL_DISPATCH_GET_API_CALL_RESULT,
                &[
                    self.pipe.0 as usize,
                    notice.handle.0 as usize,
                    data.as_mut_ptr() as usize,
                    notice.result_len,
                    notice.callback_type as usize,
                    (&raw mut failed) as usize,
                ],
            )?
            .as_bool();

        if !delivered {
            return Ok(None);
        }
        debug!(call = %notice.handle, len = data.len(), io_failure = failed, "retrieved call result");
        Ok(Some(ResultBuffer::new(data, notice.callback_type, failed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steambind_sys::mock::{MOCK_PIPE, MockNative};

    const LOBBY_CREATED: i32 = 513;
    const LOBBY_MATCH_LIST: i32 = 510;

    fn dispatch() -> (Arc<MockNative>, ManualDispatch) {
        let mock = Arc::new(MockNative::new());
        let dispatch = ManualDispatch::init(mock.clone()).unwrap();
        (mock, dispatch)
    }

    fn assert_balanced(mock: &MockNative) {
        assert_eq!(mock.fetched(), mock.released());
        assert_eq!(mock.overlapping_fetches(), 0);
        assert_eq!(mock.stray_releases(), 0);
    }

    #[test]
    fn test_init_fetches_pipe_once() {
        let (mock, dispatch) = dispatch();
        assert_eq!(dispatch.pipe(), PipeHandle(MOCK_PIPE));
        assert_eq!(mock.count(symbols::MANUAL_DISPATCH_INIT), 1);
        assert_eq!(mock.count(symbols::GET_HSTEAM_PIPE), 1);

        dispatch.await_result(ApiCallHandle(1)).unwrap();
        dispatch.await_result(ApiCallHandle(1)).unwrap();
        assert_eq!(mock.count(symbols::GET_HSTEAM_PIPE), 1);
    }

    #[test]
    fn test_not_completed_when_queue_empty() {
        let (mock, dispatch) = dispatch();

        assert_eq!(dispatch.await_result(ApiCallHandle(5)).unwrap(), None);
        assert_eq!(mock.count(symbols::MANUAL_DISPATCH_RUN_FRAME), 1);
        assert_eq!(mock.count(symbols::MANUAL_DISPATCH_GET_API_CALL_RESULT), 0);
        assert_balanced(&mock);
    }

    #[test]
    fn test_skips_other_handle_then_matches() {
        let (mock, dispatch) = dispatch();
        mock.push_completion(0xA, LOBBY_CREATED, vec![1; 12]);
        mock.push_completion(0xB, LOBBY_MATCH_LIST, vec![7, 0, 0, 0]);

        let result = dispatch.await_result(ApiCallHandle(0xB)).unwrap().unwrap();
        assert_eq!(result.bytes(), &[7, 0, 0, 0]);
        assert_eq!(result.callback_type(), LOBBY_MATCH_LIST);
        assert!(!result.io_failure());

        let fetches: Vec<_> = mock
            .calls()
            .into_iter()
            .filter(|call| call.name == symbols::MANUAL_DISPATCH_GET_API_CALL_RESULT)
            .collect();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].args[1], 0xB);
        assert_eq!(fetches[0].args[3], 4);
        assert_eq!(fetches[0].args[4], LOBBY_MATCH_LIST as usize);

        assert_eq!(mock.fetched(), 2);
        assert_balanced(&mock);
    }

    #[test]
    fn test_release_precedes_next_fetch() {
        let (mock, dispatch) = dispatch();
        mock.push_message(304, vec![0; 8]);
        mock.push_completion(0xA, LOBBY_CREATED, vec![2; 12]);
        mock.push_message(331, vec![]);

        dispatch.await_result(ApiCallHandle(0xC)).unwrap();

        let sequence: Vec<_> = mock
            .calls()
            .into_iter()
            .map(|call| call.name)
            .filter(|name| {
                name == symbols::MANUAL_DISPATCH_GET_NEXT_CALLBACK
                    || name == symbols::MANUAL_DISPATCH_FREE_LAST_CALLBACK
            })
            .collect();
        let expected: Vec<_> = [
            symbols::MANUAL_DISPATCH_GET_NEXT_CALLBACK,
            symbols::MANUAL_DISPATCH_FREE_LAST_CALLBACK,
        ]
        .repeat(3)
        .into_iter()
        .chain([symbols::MANUAL_DISPATCH_GET_NEXT_CALLBACK])
        .map(str::to_string)
        .collect();
        assert_eq!(sequence, expected);
        assert_balanced(&mock);
    }

    #[test]
    fn test_parked_completion_is_claimed_later() {
        let (mock, dispatch) = dispatch();
        mock.push_completion(0xA, LOBBY_CREATED, vec![3; 12]);
        mock.push_completion(0xB, LOBBY_MATCH_LIST, vec![1, 0, 0, 0]);

        assert!(dispatch.await_result(ApiCallHandle(0xB)).unwrap().is_some());
        assert_eq!(dispatch.pending_len(), 1);

        let result = dispatch.await_result(ApiCallHandle(0xA)).unwrap().unwrap();
        assert_eq!(result.bytes(), &[3; 12]);
        assert_eq!(dispatch.pending_len(), 0);
        assert_balanced(&mock);
    }

    #[test]
    fn test_refused_result_keeps_draining() {
        let (mock, dispatch) = dispatch();
        let mut notice = 0xBu64.to_ne_bytes().to_vec();
        notice.extend_from_slice(&LOBBY_CREATED.to_ne_bytes());
        notice.extend_from_slice(&12u32.to_ne_bytes());
        mock.push_message(steambind_sys::API_CALL_COMPLETED, notice);
        mock.push_message(304, vec![1]);

        assert_eq!(dispatch.await_result(ApiCallHandle(0xB)).unwrap(), None);
        assert_eq!(mock.count(symbols::MANUAL_DISPATCH_GET_API_CALL_RESULT), 1);
        assert_eq!(mock.queued(), 0);
        assert_balanced(&mock);
    }

    #[test]
    fn test_gateway_failure_after_fetch_still_releases() {
        let (mock, dispatch) = dispatch();
        mock.remove_symbol(symbols::MANUAL_DISPATCH_GET_API_CALL_RESULT);
        mock.push_completion(0xB, LOBBY_MATCH_LIST, vec![1, 0, 0, 0]);

        assert!(dispatch.await_result(ApiCallHandle(0xB)).is_err());
        assert_eq!(mock.fetched(), 1);
        assert_balanced(&mock);
    }

    #[test]
    fn test_run_frame_failure_is_fatal() {
        let (mock, dispatch) = dispatch();
        mock.remove_symbol(symbols::MANUAL_DISPATCH_RUN_FRAME);
        mock.push_completion(0xB, LOBBY_MATCH_LIST, vec![1, 0, 0, 0]);

        assert!(dispatch.await_result(ApiCallHandle(0xB)).is_err());
        assert_eq!(mock.fetched(), 0);
    }

    #[test]
    fn test_io_failure_flag_is_reported() {
        let (mock, dispatch) = dispatch();
        mock.push_completion_with(0xD, LOBBY_CREATED, vec![0; 12], true);
        let result = dispatch.await_result(ApiCallHandle(0xD)).unwrap().unwrap();
        assert!(result.io_failure());
    }

    #[test]
    fn test_await_callback_stops_at_first_match() {
        let (mock, dispatch) = dispatch();
        mock.push_message(304, vec![0; 8]);
        mock.push_completion(0xA, LOBBY_CREATED, vec![5; 12]);
        mock.push_message(1101, vec![1; 20]);
        mock.push_message(1101, vec![2; 20]);

        assert_eq!(dispatch.await_callback(1101).unwrap(), Some(vec![1; 20]));
        assert_eq!(dispatch.pending_len(), 1);
        assert_eq!(dispatch.deferred_len(), 1);
        assert_eq!(mock.queued(), 1);
        assert_balanced(&mock);

        assert_eq!(dispatch.await_callback(1101).unwrap(), Some(vec![2; 20]));
        assert_eq!(dispatch.await_callback(1101).unwrap(), None);
        assert!(dispatch.await_result(ApiCallHandle(0xA)).unwrap().is_some());
    }

    #[test]
    fn test_pump_routes_messages() {
        use parking_lot::Mutex as TestMutex;

        let (mock, dispatch) = dispatch();
        let registry = CallbackRegistry::new(mock.clone());
        let typed = Arc::new(TestMutex::new(Vec::new()));
        let results = Arc::new(TestMutex::new(Vec::new()));

        let sink = Arc::clone(&typed);
        registry
            .register(
                move |data| sink.lock().push(data.payload.to_vec()),
                8,
                304,
                ApiCallHandle::INVALID,
                false,
            )
            .unwrap();
        let sink = Arc::clone(&results);
        registry
            .register(
                move |data| sink.lock().push((data.api_call, data.payload.to_vec())),
                12,
                LOBBY_CREATED,
                ApiCallHandle(0xA),
                false,
            )
            .unwrap();

        mock.push_message(304, vec![1; 8]);
        mock.push_completion(0xA, LOBBY_CREATED, vec![4; 12]);
        mock.push_completion(0xB, LOBBY_MATCH_LIST, vec![2, 0, 0, 0]);
        mock.push_message(304, vec![2; 8]);
        mock.push_message(999, vec![]);

        assert_eq!(dispatch.pump(&registry).unwrap(), 3);
        assert_eq!(typed.lock().as_slice(), &[vec![1; 8], vec![2; 8]]);
        assert_eq!(results.lock().as_slice(), &[(ApiCallHandle(0xA), vec![4; 12])]);
        assert_eq!(dispatch.pending_len(), 1);
        assert_balanced(&mock);

        let claimed = dispatch.await_result(ApiCallHandle(0xB)).unwrap().unwrap();
        assert_eq!(claimed.bytes(), &[2, 0, 0, 0]);
    }

    #[test]
    fn test_callbacks_drained_by_a_wait_reach_the_next_pump() {
        use parking_lot::Mutex as TestMutex;

        let (mock, dispatch) = dispatch();
        let registry = CallbackRegistry::new(mock.clone());
        let seen = Arc::new(TestMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry
            .register(
                move |data| sink.lock().push(data.payload.to_vec()),
                8,
                304,
                ApiCallHandle::INVALID,
                false,
            )
            .unwrap();

        mock.push_message(304, vec![1; 8]);
        mock.push_completion(0xB, LOBBY_MATCH_LIST, vec![3, 0, 0, 0]);
        mock.push_message(304, vec![2; 8]);

        assert!(dispatch.await_result(ApiCallHandle(0xB)).unwrap().is_some());
        assert_eq!(dispatch.deferred_len(), 1);
        assert!(seen.lock().is_empty());

        // The deferred message comes before the one still queued natively.
        assert_eq!(dispatch.pump(&registry).unwrap(), 2);
        assert_eq!(seen.lock().as_slice(), &[vec![1; 8], vec![2; 8]]);
        assert_eq!(dispatch.deferred_len(), 0);
        assert_balanced(&mock);
    }

    #[test]
    fn test_await_callback_takes_deferred_match_first() {
        let (mock, dispatch) = dispatch();
        mock.push_message(1101, vec![4; 20]);
        mock.push_completion(0xB, LOBBY_MATCH_LIST, vec![3, 0, 0, 0]);
        assert!(dispatch.await_result(ApiCallHandle(0xB)).unwrap().is_some());

        let frames = mock.count(symbols::MANUAL_DISPATCH_RUN_FRAME);
        assert_eq!(dispatch.await_callback(1101).unwrap(), Some(vec![4; 20]));
        assert_eq!(mock.count(symbols::MANUAL_DISPATCH_RUN_FRAME), frames);
        assert_eq!(dispatch.deferred_len(), 0);
    }

    #[test]
    fn test_deferred_queue_drops_oldest_when_full() {
        let (mock, dispatch) = dispatch();
        for n in 0..=MAX_DEFERRED {
            mock.push_message(304, (n as u32).to_ne_bytes().to_vec());
        }
        assert_eq!(dispatch.await_result(ApiCallHandle(0xB)).unwrap(), None);
        assert_eq!(dispatch.deferred_len(), MAX_DEFERRED);

        let registry = CallbackRegistry::new(mock.clone());
        let first = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&first);
        registry
            .register(
                move |data| {
                    sink.lock().get_or_insert_with(|| data.payload.to_vec());
                },
                4,
                304,
                ApiCallHandle::INVALID,
                false,
            )
            .unwrap();
        assert_eq!(dispatch.pump(&registry).unwrap(), MAX_DEFERRED);
        assert_eq!(first.lock().as_deref(), Some(&1u32.to_ne_bytes()[..]));
    }

    #[test]
    fn test_refused_call_result_skips_its_registration() {
        let (mock, dispatch) = dispatch();
        let registry = CallbackRegistry::new(mock.clone());
        registry
            .register(
                |_| panic!("refused result must not be delivered"),
                12,
                LOBBY_CREATED,
                ApiCallHandle(0xB),
                false,
            )
            .unwrap();
        let mut notice = 0xBu64.to_ne_bytes().to_vec();
        notice.extend_from_slice(&LOBBY_CREATED.to_ne_bytes());
        notice.extend_from_slice(&12u32.to_ne_bytes());
        mock.push_message(steambind_sys::API_CALL_COMPLETED, notice);

        assert_eq!(dispatch.pump(&registry).unwrap(), 0);
        assert_eq!(mock.count(symbols::MANUAL_DISPATCH_GET_API_CALL_RESULT), 1);
        assert!(registry.has_call_result(ApiCallHandle(0xB)));
        assert_balanced(&mock);
    }

    #[test]
    fn test_pump_releases_call_result_registration() {
        let (mock, dispatch) = dispatch();
        let registry = CallbackRegistry::new(mock.clone());
        let handle = registry
            .register(|_| {}, 12, LOBBY_CREATED, ApiCallHandle(0xA), false)
            .unwrap();
        mock.push_completion(0xA, LOBBY_CREATED, vec![4; 12]);

        assert_eq!(dispatch.pump(&registry).unwrap(), 1);
        assert!(!registry.contains(handle));
        assert!(!registry.has_call_result(ApiCallHandle(0xA)));
        assert_eq!(mock.count(symbols::UNREGISTER_CALLBACK), 1);
    }
}
