//! Application state machine and the shared status mirror.
//!
//! [`AppState`] is owned by the [`StateController`](super::StateController)
//! and changes only through its `enter` method.  Observers (logging, tests,
//! a future UI) read [`AppStatus`] through [`SharedStatus`].

use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// States of the camera-to-speech cycle.
///
/// ```text
/// Loading ──start──▶ LiveView ──tap──▶ Capturing ──photo──▶ TextDetection
///                       ▲                  │ no photo / timeout     │
///                       ├──────────────────┘                         │
///                       │                    0 regions ◀─────────────┤
///                       │                        │                   ▼
///                       │            NoText ◀────┘ no text ◀──── ApplyOcr
///                       │              │                            │ text
///                       ├── Cleanup ◀──┘                            ▼
///                       │      ▲                                 Reading
///                       │      └── Cancelling ◀──tap── TextDetection / ApplyOcr / Reading
///                       └──────────────────── drained ──────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AppState {
    /// Collaborators are being wired; nothing has been shown yet.
    #[default]
    Loading,
    /// Live view running; waiting for a tap.
    LiveView,
    /// A still photo has been requested.
    Capturing,
    /// The photo is being split into text regions.
    TextDetection,
    /// Regions are being recognized ("processing").
    ApplyOcr,
    /// Recognized text is being spoken.
    Reading,
    /// Nothing readable was found.
    NoText,
    /// The user cancelled the current read.
    Cancelling,
    /// Per-cycle data is being discarded.
    Cleanup,
}

impl AppState {
    /// The state a tap leads to, or `None` if taps are ignored here.
    ///
    /// ```
    /// use out_loud::pipeline::AppState;
    ///
    /// assert_eq!(AppState::LiveView.on_tap(), Some(AppState::Capturing));
    /// assert_eq!(AppState::Reading.on_tap(), Some(AppState::Cancelling));
    /// assert_eq!(AppState::Capturing.on_tap(), None);
    /// ```
    pub fn on_tap(&self) -> Option<AppState> {
        match self {
            AppState::LiveView => Some(AppState::Capturing),
            AppState::TextDetection | AppState::ApplyOcr | AppState::Reading => {
                Some(AppState::Cancelling)
            }
            _ => None,
        }
    }

    /// `true` between a capture request and the end of reading.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AppState::Capturing | AppState::TextDetection | AppState::ApplyOcr | AppState::Reading
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppState::Loading => "Loading",
            AppState::LiveView => "LiveView",
            AppState::Capturing => "Capturing",
            AppState::TextDetection => "TextDetection",
            AppState::ApplyOcr => "ApplyOcr",
            AppState::Reading => "Reading",
            AppState::NoText => "NoText",
            AppState::Cancelling => "Cancelling",
            AppState::Cleanup => "Cleanup",
        }
    }
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// AppStatus / SharedStatus
// ---------------------------------------------------------------------------

/// Read-only mirror of the controller for observers.
#[derive(Debug, Clone, Default)]
pub struct AppStatus {
    /// Current state.
    pub state: AppState,
    /// Number of live-view cycles started so far.
    pub cycles: u64,
    /// Text of the most recent successful read, in region order.
    pub last_read: Vec<String>,
    /// Regions found in the current cycle's photo.
    pub regions_found: usize,
}

/// Thread-safe handle to [`AppStatus`].  Do not hold the lock across
/// `.await` points.
pub type SharedStatus = Arc<Mutex<AppStatus>>;

pub fn new_shared_status() -> SharedStatus {
    Arc::new(Mutex::new(AppStatus::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
