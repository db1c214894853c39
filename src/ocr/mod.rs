//! Text recognition for a single region.
//!
//! # Overview
//!
//! [`Recognizer`] is the public interface used by the recognition batch.  It
//! is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn Recognizer>` and called from many tasks at once.
//!
//! [`TesseractRecognizer`] is the production implementation; it runs the
//! `tesseract` command-line engine through [`TesseractCli`].
//!
//! `Ok(None)` means "the region holds no readable text".  It is not an error.

pub mod tesseract;

pub use tesseract::{TesseractCli, TesseractRecognizer};

use async_trait::async_trait;
use thiserror::Error;

use crate::detect::Region;

// ---------------------------------------------------------------------------
// RecognizeError
// ---------------------------------------------------------------------------

/// Errors raised by a [`Recognizer`] or the Tesseract process wrapper.
#[derive(Debug, Clone, Error)]
pub enum RecognizeError {
    /// The OCR engine executable could not be started.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine ran but reported a failure.
    #[error("OCR engine failed: {0}")]
    Engine(String),

    /// The region image could not be handed to the engine.
    #[error("cannot prepare region image: {0}")]
    Image(String),
}

// ---------------------------------------------------------------------------
// Recognizer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize the text of `region`.  Resolves exactly once per call.
    async fn recognize(&self, region: &Region) -> Result<Option<String>, RecognizeError>;
}

/// Collapse engine output into a single speakable line.
///
/// Returns `None` when nothing but whitespace remains.
pub fn normalize_text(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// Recognizer double keyed by region index.
///
/// Regions without an entry yield `Ok(None)`.  Each call is counted; an
/// optional per-index delay lets tests scramble completion order.
#[cfg(test)]
pub struct MockRecognizer {
    answers: std::collections::HashMap<usize, Result<Option<String>, RecognizeError>>,
    delays: std::collections::HashMap<usize, std::time::Duration>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            answers: Default::default(),
            delays: Default::default(),
            calls: Default::default(),
        }
    }

    pub fn text(mut self, index: usize, text: &str) -> Self {
        self.answers.insert(index, Ok(Some(text.to_string())));
        self
    }

    pub fn fail(mut self, index: usize) -> Self {
        self.answers
            .insert(index, Err(RecognizeError::Engine("mock failure".into())));
        self
    }

    pub fn delay(mut self, index: usize, delay: std::time::Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Recognizer for MockRecognizer {
    async fn recognize(&self, region: &Region) -> Result<Option<String>, RecognizeError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&region.index) {
            tokio::time::sleep(*delay).await;
        }
        self.answers.get(&region.index).cloned().unwrap_or(Ok(None))
    }
}
