//! Generic single-threaded cooperative message handler ("Looper"): one OS
//! thread, one FIFO, no preemption inside a handler body. Every
//! session-owned worker (Sender's SR scheduler, per-Track pullers, the
//! reorder/NACK engine) is one instance of this shape.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::log::log_sink::LogSink;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawns `handle_one` on its own thread, polling `rx` with a bounded
/// timeout so the loop can observe `stop_flag` between messages even when
/// idle. `on_tick` runs once per poll, whether or not a message arrived,
/// so components needing periodic work (SR cadence, reaper, NACK windows)
/// don't need a second thread.
pub struct Looper {
    name: &'static str,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Looper {
    pub fn start<M, F, T>(name: &'static str, rx: Receiver<M>, mut handle_one: F, mut on_tick: T) -> Self
    where
        M: Send + 'static,
        F: FnMut(M) + Send + 'static,
        T: FnMut() + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag_thread = stop_flag.clone();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while !stop_flag_thread.load(Ordering::Acquire) {
                    match rx.recv_timeout(POLL_INTERVAL) {
                        Ok(msg) => handle_one(msg),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                    on_tick();
                }
            })
            .ok();

        Self {
            name,
            stop_flag,
            handle,
        }
    }

    /// Requests the loop to stop and joins the worker thread.
    pub fn stop(&mut self, logger: &Arc<dyn LogSink>) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
        crate::sink_debug!(logger, "looper '{}' stopped", self.name);
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.stop_flag.load(Ordering::Acquire)
    }
}

impl Drop for Looper {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
