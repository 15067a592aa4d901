use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::registry::CallbackRegistry;
use steambind_sys::symbols;
use steambind_sys::{ApiCallHandle, CallbackId, NativeCall, Result};

/// Signature the callback shim invokes for every registered callback.
pub type CallbackEntryFn = unsafe extern "C" fn(
    context: *mut c_void,
    id: i32,
    data: *const u8,
    data_len: usize,
    io_failure: bool,
    api_call: u64,
);

/// Native ingress for registered callbacks.
///
/// `context` is the registry pointer handed over by
/// [`CallbackRegistry::install`]. May be called from any native thread.
///
/// # Safety
/// `context` must be null or the pointer installed by `install` whose guard
/// is still alive, and `data` must be null or valid for `data_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn steambind_on_callback(
    context: *mut c_void,
    id: i32,
    data: *const u8,
    data_len: usize,
    io_failure: bool,
    api_call: u64,
) {
    if context.is_null() {
        return;
    }
    let registry = unsafe { &*context.cast_const().cast::<CallbackRegistry>() };
    let payload = if data.is_null() || data_len == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(data, data_len) }
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        registry.dispatch(CallbackId(id), payload, io_failure, ApiCallHandle(api_call))
    }));
    if outcome.is_err() {
        error!(callback = id, "callback handler panicked");
    }
}

impl CallbackRegistry {
    /// Point the callback shim at [`steambind_on_callback`] with this
    /// registry as its context. The registry stays alive until the returned
    /// guard is dropped, which detaches it again.
    pub fn install(self: &Arc<Self>) -> Result<EntryPointGuard> {
        let native = Arc::clone(self.native());
        let context = Arc::into_raw(Arc::clone(self));
        let entry = steambind_on_callback as CallbackEntryFn;

        if let Err(err) = native.call(
            symbols::SET_CALLBACK_DISPATCHER,
            &[entry as usize, context as usize],
        ) {
            // SAFETY: reclaims the reference leaked just above.
            drop(unsafe { Arc::from_raw(context) });
            return Err(err);
        }
        debug!("callback entry point installed");
        Ok(EntryPointGuard { native, context })
    }
}

/// Keeps the registry reachable from native code. Dropping it clears the
/// dispatcher before releasing the registry reference.
pub struct EntryPointGuard {
    native: Arc<dyn NativeCall>,
    context: *const CallbackRegistry,
}

// SAFETY: `context` is an `Arc<CallbackRegistry>` in raw form, and the
// registry is `Send + Sync`.
unsafe impl Send for EntryPointGuard {}
unsafe impl Sync for EntryPointGuard {}

impl Drop for EntryPointGuard {
    fn drop(&mut self) {
        if let Err(err) = self.native.call(symbols::SET_CALLBACK_DISPATCHER, &[0, 0]) {
            // The shim may still call in with this context; keep it alive.
            warn!(error = %err, "failed to detach callback entry point");
            return;
        }
        // SAFETY: produced by `Arc::into_raw` in `install`, released once.
        drop(unsafe { Arc::from_raw(self.context) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use steambind_sys::mock::MockNative;

    #[test]
    fn test_entry_point_routes_through_context() {
        let mock = Arc::new(MockNative::new());
        let registry = Arc::new(CallbackRegistry::new(mock.clone()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = registry
            .register(
                move |data| sink.lock().push((data.payload.to_vec(), data.io_failure, data.api_call)),
                16,
                304,
                ApiCallHandle::INVALID,
                false,
            )
            .unwrap();

        let guard = registry.install().unwrap();
        let install = mock
            .calls()
            .into_iter()
            .find(|call| call.name == symbols::SET_CALLBACK_DISPATCHER)
            .unwrap();
        let context = install.args[1] as *mut c_void;
        assert_eq!(context, Arc::as_ptr(&registry) as *mut c_void);

        let payload = [0xabu8; 16];
        unsafe {
            steambind_on_callback(context, handle.id().0, payload.as_ptr(), payload.len(), true, 42);
            steambind_on_callback(context, 999, payload.as_ptr(), payload.len(), false, 0);
            steambind_on_callback(std::ptr::null_mut(), handle.id().0, payload.as_ptr(), 16, false, 0);
        }

        assert_eq!(seen.lock().as_slice(), &[(payload.to_vec(), true, ApiCallHandle(42))]);

        assert_eq!(Arc::strong_count(&registry), 2);
        drop(guard);
        assert_eq!(Arc::strong_count(&registry), 1);
        assert_eq!(mock.count(symbols::SET_CALLBACK_DISPATCHER), 2);
    }

    #[test]
    fn test_handler_panic_does_not_cross_boundary() {
        let mock = Arc::new(MockNative::new());
        let registry = Arc::new(CallbackRegistry::new(mock));
        let handle = registry
            .register(|_| panic!("boom"), 0, 304, ApiCallHandle::INVALID, false)
            .unwrap();
        let _guard = registry.install().unwrap();

        let context = Arc::as_ptr(&registry) as *mut c_void;
        unsafe { steambind_on_callback(context, handle.id().0, std::ptr::null(), 0, false, 0) };
    }

    #[test]
    fn test_install_failure_releases_reference() {
        let mock = Arc::new(MockNative::new());
        mock.remove_symbol(symbols::SET_CALLBACK_DISPATCHER);
        let registry = Arc::new(CallbackRegistry::new(mock));
        assert!(registry.install().is_err());
        assert_eq!(Arc::strong_count(&registry), 1);
    }
}
