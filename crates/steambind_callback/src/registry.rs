use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use steambind_sys::symbols;
use steambind_sys::{ApiCallHandle, CallbackId, NativeCall, Result};

/// What a handler sees for one native callback invocation.
#[derive(Debug, Clone, Copy)]
pub struct CallbackData<'a> {
    pub payload: &'a [u8],
    pub io_failure: bool,
    pub api_call: ApiCallHandle,
}

pub type CallbackHandler = Arc<dyn Fn(CallbackData<'_>) + Send + Sync>;

/// Opaque handle returned by [`CallbackRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(CallbackId);

impl RegistrationHandle {
    pub fn id(self) -> CallbackId {
        self.0
    }
}

struct Registration {
    seq: u64,
    callback_type: i32,
    owning_call: ApiCallHandle,
    handler: CallbackHandler,
}

#[derive(Default)]
struct Entries {
    by_id: AHashMap<CallbackId, Registration>,
    next_seq: u64,
}

/// Table of live callback handlers keyed by native callback id.
///
/// Lookups copy the handler reference out under the lock and run it after the
/// lock is released, so handlers may register or unregister freely. An entry
/// removed by `unregister` is never invoked afterwards.
pub struct CallbackRegistry {
    native: Arc<dyn NativeCall>,
    entries: Mutex<Entries>,
}

impl CallbackRegistry {
    pub fn new(native: Arc<dyn NativeCall>) -> Self {
        Self {
            native,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub(crate) fn native(&self) -> &Arc<dyn NativeCall> {
        &self.native
    }

    /// Allocate a native callback slot for `callback_type` and route it to
    /// `handler`. A valid `owning_call` makes this a one-shot call-result
    /// registration for that asynchronous call: [`dispatch_call_result`]
    /// removes it and releases its native slot after delivery.
    ///
    /// [`dispatch_call_result`]: Self::dispatch_call_result
    pub fn register<F>(
        &self,
        handler: F,
        payload_size: usize,
        callback_type: i32,
        owning_call: ApiCallHandle,
        is_server_scoped: bool,
    ) -> Result<RegistrationHandle>
    where
        F: Fn(CallbackData<'_>) + Send + Sync + 'static,
    {
        let id = CallbackId(
            self.native
                .call(
                    symbols::REGISTER_CALLBACK,
                    &[
                        payload_size,
                        callback_type as usize,
                        owning_call.0 as usize,
                        usize::from(is_server_scoped),
                    ],
                )?
                .as_i32(),
        );

        let mut entries = self.entries.lock();
        let seq = entries.next_seq;
        entries.next_seq += 1;
        let previous = entries.by_id.insert(
            id,
            Registration {
                seq,
                callback_type,
                owning_call,
                handler: Arc::new(handler),
            },
        );
        drop(entries);

        if previous.is_some() {
            warn!(callback = %id, "native side reused a live callback id");
        }
        debug!(callback = %id, callback_type, call = %owning_call, "registered callback");
        Ok(RegistrationHandle(id))
    }

    /// Remove the handler, then release the native slot. Unregistering an
    /// already removed handle does nothing.
    pub fn unregister(&self, handle: RegistrationHandle) -> Result<()> {
        let removed = self.entries.lock().by_id.remove(&handle.0);
        if removed.is_none() {
            trace!(callback = %handle.0, "callback already unregistered");
            return Ok(());
        }

        self.native
            .call(symbols::UNREGISTER_CALLBACK, &[handle.0.0 as usize])?;
        debug!(callback = %handle.0, "unregistered callback");
        Ok(())
    }

    /// Run the handler registered under `id`. Returns whether one ran; an
    /// unknown id is silently dropped.
    pub fn dispatch(
        &self,
        id: CallbackId,
        payload: &[u8],
        io_failure: bool,
        api_call: ApiCallHandle,
    ) -> bool {
        let handler = self
            .entries
            .lock()
            .by_id
            .get(&id)
            .map(|entry| Arc::clone(&entry.handler));

        let Some(handler) = handler else {
            trace!(callback = %id, "dropping callback for unregistered id");
            return false;
        };
        handler(CallbackData {
            payload,
            io_failure,
            api_call,
        });
        true
    }

    /// Run every handler registered for `callback_type`, oldest first.
    /// Call-result registrations only see their own call's result, so they
    /// are skipped here.
    pub fn dispatch_type(
        &self,
        callback_type: i32,
        payload: &[u8],
        io_failure: bool,
        api_call: ApiCallHandle,
    ) -> usize {
        let handlers = self.snapshot(|entry| {
            entry.callback_type == callback_type && !entry.owning_call.is_valid()
        });
        for handler in &handlers {
            handler(CallbackData {
                payload,
                io_failure,
                api_call,
            });
        }
        handlers.len()
    }

    /// Deliver an asynchronous call's result to registrations owning `call`,
    /// then unregister them.
    pub fn dispatch_call_result(&self, call: ApiCallHandle, payload: &[u8], io_failure: bool) -> usize {
        if !call.is_valid() {
            return 0;
        }
        let mut owners: Vec<_> = {
            let mut entries = self.entries.lock();
            let ids: Vec<_> = entries
                .by_id
                .iter()
                .filter(|(_, entry)| entry.owning_call == call)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| entries.by_id.remove(&id).map(|entry| (id, entry)))
                .collect()
        };
        owners.sort_unstable_by_key(|(_, entry)| entry.seq);

        for (_, entry) in &owners {
            (entry.handler)(CallbackData {
                payload,
                io_failure,
                api_call: call,
            });
        }
        for (id, _) in &owners {
            match self.native.call(symbols::UNREGISTER_CALLBACK, &[id.0 as usize]) {
                Ok(_) => debug!(callback = %id, call = %call, "released call-result registration"),
                Err(err) => warn!(callback = %id, error = %err, "failed to release call-result slot"),
            }
        }
        owners.len()
    }

    /// Whether some registration waits on the result of `call`.
    pub fn has_call_result(&self, call: ApiCallHandle) -> bool {
        call.is_valid()
            && self
                .entries
                .lock()
                .by_id
                .values()
                .any(|entry| entry.owning_call == call)
    }

    pub fn contains(&self, handle: RegistrationHandle) -> bool {
        self.entries.lock().by_id.contains_key(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self, filter: impl Fn(&Registration) -> bool) -> Vec<CallbackHandler> {
        let entries = self.entries.lock();
        let mut matched: Vec<_> = entries
            .by_id
            .values()
            .filter(|entry| filter(entry))
            .map(|entry| (entry.seq, Arc::clone(&entry.handler)))
            .collect();
        drop(entries);
        matched.sort_unstable_by_key(|(seq, _)| *seq);
        matched.into_iter().map(|(_, handler)| handler).collect()
    }
}
