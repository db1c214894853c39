//! Camera capture.
//!
//! [`CaptureService`] is the interface used by the state controller: a
//! start/stop signal for the live view and a single-shot request for a still
//! photo.  It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn CaptureService>`.
//!
//! [`SpoolCamera`] is the shipped implementation: it treats a directory that a
//! camera writes into as the sensor, and the newest image in it as the photo.

pub mod spool;

pub use spool::SpoolCamera;

use async_trait::async_trait;
use image::DynamicImage;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors raised by a [`CaptureService`].
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The camera cannot be used at all (missing device, missing directory).
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// A photo was requested while the live view was stopped.
    #[error("live view is not running")]
    NotLive,

    /// The camera produced no photo.
    #[error("no photo available")]
    NoPhoto,

    /// The photo could not be decoded.
    #[error("cannot decode photo: {0}")]
    Decode(String),

    /// I/O or task failure while capturing.
    #[error("capture failed: {0}")]
    Io(String),
}

// ---------------------------------------------------------------------------
// CaptureService trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CaptureService: Send + Sync {
    /// Start presenting the live view.
    fn start_live_view(&self);

    /// Stop the live view (the "cut video feed" signal).
    fn stop_live_view(&self);

    /// Capture one still photo.  Resolves exactly once per call.
    async fn capture_photo(&self) -> Result<DynamicImage, CaptureError>;
}

// ---------------------------------------------------------------------------
// MockCamera  (test-only)
// ---------------------------------------------------------------------------

/// Camera double that returns a fixed photo after an optional delay.
#[cfg(test)]
pub struct MockCamera {
    photo: Option<DynamicImage>,
    delay: Option<std::time::Duration>,
    pub starts: std::sync::atomic::AtomicUsize,
    pub stops: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockCamera {
    /// A camera that always delivers a small blank photo.
    pub fn ok() -> Self {
        Self::with_photo(Some(DynamicImage::new_rgb8(64, 32)))
    }

    /// A camera that never has a photo.
    pub fn empty() -> Self {
        Self::with_photo(None)
    }

    fn with_photo(photo: Option<DynamicImage>) -> Self {
        Self {
            photo,
            delay: None,
            starts: Default::default(),
            stops: Default::default(),
        }
    }

    pub fn delayed(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[cfg(test)]
#[async_trait]
impl CaptureService for MockCamera {
    fn start_live_view(&self) {
        self.starts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn stop_live_view(&self) {
        self.stops.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    async fn capture_photo(&self) -> Result<DynamicImage, CaptureError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.photo.clone().ok_or(CaptureError::NoPhoto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_service_is_object_safe() {
        let _: Box<dyn CaptureService> = Box::new(MockCamera::ok());
    }

    #[test]
    fn error_display_mentions_cause() {
        let e = CaptureError::DeviceUnavailable("/dev/video0".into());
        assert!(e.to_string().contains("/dev/video0"));
    }
}
