use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::CallError;
use crate::manual::ManualDispatch;
use crate::message::ResultBuffer;
use steambind_config::DispatchConfig;
use steambind_sys::{ApiCallHandle, CallbackPayload};
use steambind_utils::Stopwatch;

/// Blocks on asynchronous calls by polling [`ManualDispatch::await_result`].
#[derive(Clone)]
pub struct CallPoller {
    dispatch: Arc<ManualDispatch>,
    interval: Duration,
    timeout: Duration,
}

impl CallPoller {
    pub fn new(dispatch: Arc<ManualDispatch>, config: &DispatchConfig) -> Self {
        Self {
            dispatch,
            interval: config.poll_interval(),
            timeout: config.call_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll until `handle` completes, the timeout passes, or the binding fails.
    pub fn wait(&self, handle: ApiCallHandle) -> Result<ResultBuffer, CallError> {
        if !handle.is_valid() {
            return Err(CallError::NotStarted);
        }

        let watch = Stopwatch::start_new();
        loop {
            if let Some(result) = self.dispatch.await_result(handle)? {
                debug!(call = %handle, elapsed = ?watch.elapsed(), "asynchronous call completed");
                if result.io_failure() {
                    return Err(CallError::IoFailure { handle });
                }
                return Ok(result);
            }
            if watch.exceeded(self.timeout) {
                warn!(call = %handle, "asynchronous call timed out");
                return Err(CallError::TimedOut {
                    handle,
                    waited: watch.elapsed(),
                });
            }
            thread::sleep(self.interval);
        }
    }

    /// [`wait`](Self::wait) and decode the result as `T`.
    pub fn wait_for<T: CallbackPayload>(&self, handle: ApiCallHandle) -> Result<T, CallError> {
        Ok(self.wait(handle)?.decode::<T>()?)
    }
}
