//! Global tap key using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`KeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! `rdev::listen` has no shutdown API, so the thread stays blocked in the
//! event loop until the process exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::TapEvent;

/// Handle to a running key listener thread.
pub struct KeyListener {
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

impl KeyListener {
    /// Spawn the listener thread.  Every release of `key` sends
    /// [`TapEvent::Tap`] on `tx` (via `blocking_send`, since the callback is
    /// not async).
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to create the thread.
    pub fn start(key: rdev::Key, tx: mpsc::Sender<TapEvent>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("tap-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    if let rdev::EventType::KeyRelease(k) = event.event_type {
                        if k == key && tx.blocking_send(TapEvent::Tap).is_err() {
                            stop_flag.store(true, Ordering::Relaxed);
                        }
                    }
                });

                if let Err(e) = result {
                    log::error!("tap-listener: rdev::listen exited with error: {:?}", e);
                }
            })?;

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
