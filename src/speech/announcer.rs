//! Ordered speech queue.
//!
//! # Flow
//!
//! ```text
//! add("a"), add("b")          queue = [a, b]
//! speak_all()  ──▶ worker     queue = []       returns Playback
//!                   ├─ speak a
//!                   └─ speak b ──▶ Playback resolves Completed
//! reset()      ──▶ epoch += 1, current utterance dropped,
//!                  pending ones skipped, "Cancelled." spoken
//! ```
//!
//! A single worker task owns the [`SpeechEngine`], so utterances never
//! overlap and are heard in submission order.  Every utterance is stamped
//! with the epoch current at submission; the worker skips stale utterances
//! and abandons the one in progress as soon as the epoch moves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::SpeechEngine;

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// How a submitted batch of utterances ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The last utterance of the batch was spoken.
    Completed,
    /// The batch was cut off by [`Announcer::reset`] / [`Announcer::silence`].
    Interrupted,
}

/// Completion handle for one [`Announcer::speak_all`] call.
#[derive(Debug)]
pub struct Playback {
    done: Option<oneshot::Receiver<()>>,
}

impl Playback {
    fn completed() -> Self {
        Self { done: None }
    }

    /// Wait for the batch to drain.
    pub async fn wait(self) -> PlaybackOutcome {
        match self.done {
            None => PlaybackOutcome::Completed,
            Some(rx) => match rx.await {
                Ok(()) => PlaybackOutcome::Completed,
                Err(_) => PlaybackOutcome::Interrupted,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Announcer
// ---------------------------------------------------------------------------

struct Utterance {
    text: String,
    epoch: u64,
    /// Present on the last utterance of a batch only.
    done: Option<oneshot::Sender<()>>,
}

pub struct Announcer {
    queue: Vec<String>,
    cancelled_phrase: String,
    tx: mpsc::UnboundedSender<Utterance>,
    epoch: watch::Sender<u64>,
    speaking: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl Announcer {
    /// Create the announcer and spawn its speech worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(engine: Arc<dyn SpeechEngine>, cancelled_phrase: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (epoch, epoch_rx) = watch::channel(0u64);
        let speaking = Arc::new(AtomicBool::new(false));

        let worker = tokio::spawn(speech_worker(engine, rx, epoch_rx, Arc::clone(&speaking)));

        Self {
            queue: Vec::new(),
            cancelled_phrase: cancelled_phrase.into(),
            tx,
            epoch,
            speaking,
            worker,
        }
    }

    /// Append `text` to the queue.
    pub fn add(&mut self, text: impl Into<String>) {
        self.queue.push(text.into());
    }

    /// Strings waiting for the next [`speak_all`](Self::speak_all).
    pub fn queued(&self) -> &[String] {
        &self.queue
    }

    /// Submit every queued string in FIFO order and clear the queue.
    pub fn speak_all(&mut self) -> Playback {
        let texts = std::mem::take(&mut self.queue);
        self.submit(texts)
    }

    /// Stop the current utterance, drop everything pending, then speak the
    /// cancelled phrase.
    pub fn reset(&mut self) -> Playback {
        self.silence();
        let phrase = self.cancelled_phrase.clone();
        self.submit(vec![phrase])
    }

    /// Stop the current utterance and drop everything pending.
    pub fn silence(&mut self) {
        self.queue.clear();
        self.epoch.send_modify(|e| *e += 1);
        log::debug!("announcer: silenced (epoch {})", *self.epoch.borrow());
    }

    /// `true` while the engine is in the middle of an utterance.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn submit(&self, texts: Vec<String>) -> Playback {
        if texts.is_empty() {
            return Playback::completed();
        }

        let epoch = *self.epoch.borrow();
        let (done_tx, done_rx) = oneshot::channel();
        let mut done_tx = Some(done_tx);
        let last = texts.len() - 1;

        for (i, text) in texts.into_iter().enumerate() {
            let utterance = Utterance {
                text,
                epoch,
                done: if i == last { done_tx.take() } else { None },
            };
            if self.tx.send(utterance).is_err() {
                log::warn!("announcer: speech worker is gone, dropping utterance");
                break;
            }
        }

        Playback {
            done: Some(done_rx),
        }
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn speech_worker(
    engine: Arc<dyn SpeechEngine>,
    mut rx: mpsc::UnboundedReceiver<Utterance>,
    mut epoch_rx: watch::Receiver<u64>,
    speaking: Arc<AtomicBool>,
) {
    while let Some(utterance) = rx.recv().await {
        let current = *epoch_rx.borrow_and_update();
        if utterance.epoch < current {
            log::debug!("announcer: skipping stale utterance {:?}", utterance.text);
            continue;
        }

        speaking.store(true, Ordering::SeqCst);
        let interrupted = tokio::select! {
            result = engine.speak(&utterance.text) => {
                if let Err(e) = result {
                    log::warn!("announcer: utterance failed: {e}");
                }
                false
            }
            _ = epoch_rx.changed() => true,
        };
        speaking.store(false, Ordering::SeqCst);

        if interrupted {
            log::debug!("announcer: interrupted {:?}", utterance.text);
            continue;
        }
        if let Some(done) = utterance.done {
            let _ = done.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
