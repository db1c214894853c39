//! Recognition batch: one recognizer call per region, one completion.
//!
//! [`RecognitionBatch`] is the completion detector: every region reports
//! exactly once, a shared [`AtomicUsize`] counts the reports, and only the
//! report that moves the counter to the region count receives the results.
//! This holds regardless of the order in which regions finish.
//!
//! [`recognize_all`] runs the recognizer over a batch, at most
//! `max_concurrent` regions at a time, each bounded by a timeout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::detect::Region;
use crate::ocr::Recognizer;

// ---------------------------------------------------------------------------
// RecognitionBatch
// ---------------------------------------------------------------------------

pub struct RecognitionBatch {
    total: usize,
    finished: AtomicUsize,
    /// `None` = still pending; `Some(text)` = reported.
    slots: Mutex<Vec<Option<Option<String>>>>,
}

impl RecognitionBatch {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            finished: AtomicUsize::new(0),
            slots: Mutex::new(vec![None; total]),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }

    /// Record the outcome for region `index`.
    ///
    /// Returns the per-region results, in region order, to the caller whose
    /// report completes the batch and `None` to everyone else.  Repeated or
    /// out-of-range reports are ignored and never count.
    pub fn complete(&self, index: usize, text: Option<String>) -> Option<Vec<Option<String>>> {
        {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get_mut(index) {
                Some(slot) if slot.is_none() => *slot = Some(text),
                Some(_) => {
                    log::warn!("batch: region {index} reported twice");
                    return None;
                }
                None => {
                    log::warn!("batch: region {index} out of range (total {})", self.total);
                    return None;
                }
            }
        }

        let done = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        if done != self.total {
            return None;
        }

        let slots = std::mem::take(&mut *self.slots.lock().unwrap_or_else(PoisonError::into_inner));
        Some(slots.into_iter().map(Option::flatten).collect())
    }
}

// ---------------------------------------------------------------------------
// recognize_all
// ---------------------------------------------------------------------------

/// Recognize every region and return the results in region order.
///
/// Failures and timeouts count as "no text".  Returns `None` when `cancel`
/// fires before the batch completes.
pub async fn recognize_all(
    recognizer: Arc<dyn Recognizer>,
    regions: Vec<Region>,
    per_region: Duration,
    max_concurrent: usize,
    cancel: CancellationToken,
) -> Option<Vec<Option<String>>> {
    if regions.is_empty() {
        return Some(Vec::new());
    }

    let batch = Arc::new(RecognitionBatch::new(regions.len()));
    let permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let (done_tx, done_rx) = oneshot::channel();
    let done_tx = Arc::new(Mutex::new(Some(done_tx)));

    for (slot, region) in regions.into_iter().enumerate() {
        let recognizer = Arc::clone(&recognizer);
        let batch = Arc::clone(&batch);
        let permits = Arc::clone(&permits);
        let done_tx = Arc::clone(&done_tx);
        let cancel = cancel.clone();

        tokio::spawn(async move {
            let text = tokio::select! {
                _ = cancel.cancelled() => return,
                text = recognize_one(recognizer.as_ref(), &region, per_region, &permits) => text,
            };

            if let Some(results) = batch.complete(slot, text) {
                let sender = done_tx.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(sender) = sender {
                    let _ = sender.send(results);
                }
            }
        });
    }

    // Every task holds a clone of the sender slot; if all of them bail out
    // on cancellation the receiver sees the sender dropped.
    drop(done_tx);

    tokio::select! {
        _ = cancel.cancelled() => None,
        results = done_rx => results.ok(),
    }
}

async fn recognize_one(
    recognizer: &dyn Recognizer,
    region: &Region,
    limit: Duration,
    permits: &Semaphore,
) -> Option<String> {
    let Ok(_permit) = permits.acquire().await else {
        return None;
    };

    match tokio::time::timeout(limit, recognizer.recognize(region)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            log::warn!("batch: region {} skipped: {e}", region.index);
            None
        }
        Err(_) => {
            log::warn!("batch: region {} timed out after {limit:?}", region.index);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
