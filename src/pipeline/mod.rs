//! Read-aloud pipeline.
//!
//! This module sequences capture → text detection → OCR → speech and exposes
//! the shared status that observers read.
//!
//! # Architecture
//!
//! ```text
//! TapEvent (mpsc)
//!        │
//!        ▼
//! StateController::run()  ← async tokio task
//!        │
//!        ├─ Tap in LiveView           → Capturing
//!        ├─ Tap in TextDetection/
//!        │  ApplyOcr/Reading          → Cancelling → Cleanup → LiveView
//!        │
//!        └─ StepEvent (mpsc, from spawned steps)
//!              ├─ PhotoCaptured   → TextDetection
//!              ├─ RegionsLocated  → ApplyOcr   (recognize_all)
//!              ├─ BatchFinished   → Reading    (Announcer::speak_all)
//!              └─ ReadingDrained  → LiveView
//!
//! SharedStatus (Arc<Mutex<AppStatus>>) ←─── read by observers
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use out_loud::config::AppConfig;
//! use out_loud::pipeline::{new_shared_status, ControllerBuilder};
//!
//! # use out_loud::capture::CaptureService;
//! # use out_loud::detect::TextLocator;
//! # use out_loud::ocr::Recognizer;
//! # use out_loud::speech::SpeechEngine;
//! # fn make_camera() -> Arc<dyn CaptureService> { unimplemented!() }
//! # fn make_locator() -> Arc<dyn TextLocator> { unimplemented!() }
//! # fn make_recognizer() -> Arc<dyn Recognizer> { unimplemented!() }
//! # fn make_speech() -> Arc<dyn SpeechEngine> { unimplemented!() }
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let status = new_shared_status();
//!
//!     let controller = ControllerBuilder::new(&config)
//!         .capture(make_camera())
//!         .locator(make_locator())
//!         .recognizer(make_recognizer())
//!         .speech(make_speech())
//!         .status(status.clone())
//!         .build()
//!         .expect("all collaborators supplied");
//!
//!     let (tap_tx, tap_rx) = mpsc::channel(16);
//!     tokio::spawn(controller.run(tap_rx));
//!
//!     // tap_tx is passed to KeyListener::start(...) or forward_stdin_taps(...)
//!     # drop(tap_tx);
//! }
//! ```

pub mod batch;
pub mod controller;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use batch::{recognize_all, RecognitionBatch};
pub use controller::{ControllerBuilder, ControllerError, StateController};
pub use state::{new_shared_status, AppState, AppStatus, SharedStatus};
