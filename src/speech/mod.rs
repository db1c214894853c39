//! Speech output.
//!
//! * [`SpeechEngine`]: speaks one utterance; the future resolves when the
//!   utterance has finished.  Dropping the future must stop the audio.
//! * [`CommandSpeech`]: engine backed by a speech program (`say`,
//!   `espeak-ng`, …).
//! * [`Announcer`]: the ordered speech queue used by the state controller.

pub mod announcer;
pub mod command;

pub use announcer::{Announcer, Playback, PlaybackOutcome};
pub use command::CommandSpeech;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    /// The speech program could not be started.
    #[error("speech engine unavailable: {0}")]
    Unavailable(String),

    /// The speech program exited with an error.
    #[error("speech engine failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speak `text` and resolve once it has been said.
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

// ---------------------------------------------------------------------------
// MockSpeech  (test-only)
// ---------------------------------------------------------------------------

/// Speech double that "speaks" by sleeping.
///
/// `started` records every utterance that began; `finished` only those that
/// ran to completion (an interrupted utterance is dropped mid-sleep).
#[cfg(test)]
pub struct MockSpeech {
    delay: std::time::Duration,
    pub started: std::sync::Mutex<Vec<String>>,
    pub finished: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSpeech {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            delay,
            started: Default::default(),
            finished: Default::default(),
        }
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechEngine for MockSpeech {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.started.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.delay).await;
        self.finished.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
