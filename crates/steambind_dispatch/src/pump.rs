use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use tracing::{debug, error, info};

use crate::manual::ManualDispatch;
use steambind_callback::CallbackRegistry;
use steambind_sys::{NativeCall, Result, ThreadScope};

/// Background thread that pumps the callback queue every `tick`.
///
/// A failed tick is logged and stops the thread; the error is returned from
/// [`shutdown`](Self::shutdown).
pub struct CallbackPump {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl CallbackPump {
    pub fn spawn(
        native: Arc<dyn NativeCall>,
        dispatch: Arc<ManualDispatch>,
        registry: Arc<CallbackRegistry>,
        tick: Duration,
    ) -> io::Result<Self> {
        let (stop, stopped) = bounded::<()>(1);
        let worker = thread::Builder::new()
            .name("steambind-callbacks".to_string())
            .spawn(move || {
                let _scope = ThreadScope::new(native);
                debug!(?tick, "callback pump started");
                loop {
                    if let Err(err) = dispatch.pump(&registry) {
                        error!(error = %err, "callback pump stopped");
                        return Err(err);
                    }
                    match stopped.recv_timeout(tick) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("callback pump finished");
                Ok(())
            })?;

        info!("callback pump running");
        Ok(Self {
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stop the thread and wait for it. Returns the error that ended it early,
    /// if any.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<()> {
        drop(self.stop.take());
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(outcome)) => outcome,
            Some(Err(_)) => {
                error!("callback pump thread panicked");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for CallbackPump {
    fn drop(&mut self) {
        if let Err(err) = self.stop_and_join() {
            error!(error = %err, "callback pump ended with an error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use steambind_sys::ApiCallHandle;
    use steambind_sys::mock::MockNative;
    use steambind_sys::symbols;
    use steambind_utils::Stopwatch;

    fn setup() -> (Arc<MockNative>, Arc<ManualDispatch>, Arc<CallbackRegistry>) {
        let mock = Arc::new(MockNative::new());
        let dispatch = Arc::new(ManualDispatch::init(mock.clone()).unwrap());
        let registry = Arc::new(CallbackRegistry::new(mock.clone()));
        (mock, dispatch, registry)
    }

    fn wait_until(condition: impl Fn() -> bool) {
        let watch = Stopwatch::start_new();
        while !condition() {
            assert!(!watch.exceeded(Duration::from_secs(5)), "condition not reached");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_pump_delivers_and_releases_thread_memory() {
        let (mock, dispatch, registry) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry
            .register(
                move |data| sink.lock().push(data.payload.to_vec()),
                4,
                304,
                ApiCallHandle::INVALID,
                false,
            )
            .unwrap();

        let pump = CallbackPump::spawn(mock.clone(), dispatch, registry, Duration::from_millis(1)).unwrap();
        mock.push_message(304, vec![9, 9, 9, 9]);
        wait_until(|| !seen.lock().is_empty());
        assert!(pump.is_running());

        pump.shutdown().unwrap();
        assert_eq!(seen.lock().as_slice(), &[vec![9, 9, 9, 9]]);
        assert_eq!(mock.count(symbols::RELEASE_CURRENT_THREAD_MEMORY), 1);
        assert_eq!(mock.fetched(), mock.released());
    }

    #[test]
    fn test_failed_tick_stops_pump() {
        let (mock, dispatch, registry) = setup();
        mock.remove_symbol(symbols::MANUAL_DISPATCH_RUN_FRAME);

        let pump = CallbackPump::spawn(mock.clone(), dispatch, registry, Duration::from_millis(1)).unwrap();
        wait_until(|| !pump.is_running());
        assert!(pump.shutdown().is_err());
        assert_eq!(mock.count(symbols::RELEASE_CURRENT_THREAD_MEMORY), 1);
    }

    #[test]
    fn test_drop_stops_thread() {
        let (mock, dispatch, registry) = setup();
        let pump = CallbackPump::spawn(mock.clone(), dispatch, registry, Duration::from_millis(1)).unwrap();
        drop(pump);
        assert_eq!(mock.count(symbols::RELEASE_CURRENT_THREAD_MEMORY), 1);
    }
}
