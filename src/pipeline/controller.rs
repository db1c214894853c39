//! State controller: drives capture → detection → OCR → reading.
//!
//! [`StateController`] owns the [`AppState`] and responds to
//! [`TapEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Cycle
//!
//! ```text
//! LiveView ──tap──▶ Capturing      spawn capture_photo       (timeout)
//!   PhotoCaptured ─▶ TextDetection spawn locate              (timeout)
//!   RegionsLocated ─▶ ApplyOcr     spawn recognize_all       (timeout per region)
//!                    └ 0 regions ─▶ NoText ─▶ Cleanup ─▶ LiveView
//!   BatchFinished ─▶ Reading       speak_all, await Playback (timeout)
//!                    └ no text ──▶ NoText ─▶ Cleanup ─▶ LiveView
//!   ReadingDrained ─▶ LiveView
//! tap in TextDetection / ApplyOcr / Reading ─▶ Cancelling ─▶ Cleanup ─▶ LiveView
//! ```
//!
//! Every spawned step reports back with exactly one [`StepEvent`] tagged
//! with the generation of the cycle that started it.  Entering `LiveView`
//! starts a new generation; `Cleanup` cancels the cycle's token, which stops
//! any step still in flight.  Reports from an older generation, or arriving
//! in a state that does not expect them, are dropped.

use std::future::Future;
use std::sync::{Arc, PoisonError};

use image::DynamicImage;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureService;
use crate::config::{AppConfig, PhraseConfig, TimeoutConfig};
use crate::detect::{Region, TextLocator};
use crate::input::TapEvent;
use crate::ocr::Recognizer;
use crate::speech::{Announcer, PlaybackOutcome, SpeechEngine};

use super::batch::recognize_all;
use super::state::{new_shared_status, AppState, AppStatus, SharedStatus};

// ---------------------------------------------------------------------------
// ControllerError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ControllerError {
    /// A required collaborator was not supplied to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// A setting makes the controller unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// StepEvent
// ---------------------------------------------------------------------------

/// Completion report of a spawned step.
#[derive(Debug)]
pub(crate) enum StepEvent {
    PhotoCaptured {
        generation: u64,
        photo: Option<DynamicImage>,
    },
    RegionsLocated {
        generation: u64,
        regions: Vec<Region>,
    },
    BatchFinished {
        generation: u64,
        texts: Vec<Option<String>>,
    },
    /// `None` when the reading timeout expired first.
    ReadingDrained {
        generation: u64,
        outcome: Option<PlaybackOutcome>,
    },
}

impl StepEvent {
    fn generation(&self) -> u64 {
        match self {
            StepEvent::PhotoCaptured { generation, .. }
            | StepEvent::RegionsLocated { generation, .. }
            | StepEvent::BatchFinished { generation, .. }
            | StepEvent::ReadingDrained { generation, .. } => *generation,
        }
    }

    /// The only state in which this report is meaningful.
    fn expected_state(&self) -> AppState {
        match self {
            StepEvent::PhotoCaptured { .. } => AppState::Capturing,
            StepEvent::RegionsLocated { .. } => AppState::TextDetection,
            StepEvent::BatchFinished { .. } => AppState::ApplyOcr,
            StepEvent::ReadingDrained { .. } => AppState::Reading,
        }
    }
}

// ---------------------------------------------------------------------------
// ControllerBuilder
// ---------------------------------------------------------------------------

/// Collects the collaborators of a [`StateController`] and validates them.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use out_loud::capture::SpoolCamera;
/// use out_loud::config::AppConfig;
/// use out_loud::detect::FullFrameLocator;
/// use out_loud::ocr::TesseractRecognizer;
/// use out_loud::pipeline::ControllerBuilder;
/// use out_loud::speech::CommandSpeech;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let controller = ControllerBuilder::new(&config)
///     .capture(Arc::new(SpoolCamera::open(&config.capture)?))
///     .locator(Arc::new(FullFrameLocator))
///     .recognizer(Arc::new(TesseractRecognizer::from_config(&config.ocr)))
///     .speech(Arc::new(CommandSpeech::from_config(&config.speech)))
///     .build()?;
///
/// let (_tap_tx, tap_rx) = tokio::sync::mpsc::channel(16);
/// controller.run(tap_rx).await;
/// # Ok(())
/// # }
/// ```
pub struct ControllerBuilder {
    phrases: PhraseConfig,
    timeouts: TimeoutConfig,
    max_concurrent: usize,
    capture: Option<Arc<dyn CaptureService>>,
    locator: Option<Arc<dyn TextLocator>>,
    recognizer: Option<Arc<dyn Recognizer>>,
    speech: Option<Arc<dyn SpeechEngine>>,
    status: Option<SharedStatus>,
    observer: Option<mpsc::UnboundedSender<AppState>>,
}

impl ControllerBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            phrases: config.phrases.clone(),
            timeouts: config.timeouts.clone(),
            max_concurrent: config.ocr.max_concurrent,
            capture: None,
            locator: None,
            recognizer: None,
            speech: None,
            status: None,
            observer: None,
        }
    }

    pub fn capture(mut self, capture: Arc<dyn CaptureService>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn locator(mut self, locator: Arc<dyn TextLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn speech(mut self, speech: Arc<dyn SpeechEngine>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Mirror the controller's progress into `status`.
    pub fn status(mut self, status: SharedStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Receive every state the controller enters, in order.
    pub fn observer(mut self, observer: mpsc::UnboundedSender<AppState>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate and build.  Spawns the announcer's speech worker, so it must
    /// be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::MissingCollaborator`]: a collaborator was not set.
    /// - [`ControllerError::InvalidConfig`]: `ocr.max_concurrent` or one of
    ///   the `timeouts` is zero.
    pub fn build(self) -> Result<StateController, ControllerError> {
        let capture = self
            .capture
            .ok_or(ControllerError::MissingCollaborator("capture"))?;
        let locator = self
            .locator
            .ok_or(ControllerError::MissingCollaborator("locator"))?;
        let recognizer = self
            .recognizer
            .ok_or(ControllerError::MissingCollaborator("recognizer"))?;
        let speech = self
            .speech
            .ok_or(ControllerError::MissingCollaborator("speech"))?;

        if self.max_concurrent == 0 {
            return Err(ControllerError::InvalidConfig(
                "ocr.max_concurrent must be at least 1".into(),
            ));
        }
        for (name, secs) in [
            ("capture_secs", self.timeouts.capture_secs),
            ("detection_secs", self.timeouts.detection_secs),
            ("recognition_secs", self.timeouts.recognition_secs),
            ("reading_secs", self.timeouts.reading_secs),
        ] {
            if secs == 0 {
                return Err(ControllerError::InvalidConfig(format!(
                    "timeouts.{name} must be at least 1"
                )));
            }
        }

        let announcer = Announcer::new(speech, self.phrases.cancelled.clone());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(StateController {
            state: AppState::Loading,
            capture,
            locator,
            recognizer,
            announcer,
            phrases: self.phrases,
            timeouts: self.timeouts,
            max_concurrent: self.max_concurrent,
            generation: 0,
            cycle: CancellationToken::new(),
            pending_image: None,
            regions: Vec::new(),
            texts: Vec::new(),
            events_tx,
            events_rx: Some(events_rx),
            status: self.status.unwrap_or_else(new_shared_status),
            observer: self.observer,
        })
    }
}

// ---------------------------------------------------------------------------
// StateController
// ---------------------------------------------------------------------------

pub struct StateController {
    state: AppState,

    capture: Arc<dyn CaptureService>,
    locator: Arc<dyn TextLocator>,
    recognizer: Arc<dyn Recognizer>,
    announcer: Announcer,

    phrases: PhraseConfig,
    timeouts: TimeoutConfig,
    max_concurrent: usize,

    // ── Current cycle ────────────────────────────────────────────────────
    generation: u64,
    cycle: CancellationToken,
    pending_image: Option<DynamicImage>,
    regions: Vec<Region>,
    texts: Vec<String>,

    events_tx: mpsc::UnboundedSender<StepEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<StepEvent>>,

    status: SharedStatus,
    observer: Option<mpsc::UnboundedSender<AppState>>,
}

impl StateController {
    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Enter the live view and process taps until `taps` closes or a
    /// [`TapEvent::Quit`] arrives.
    pub async fn run(mut self, mut taps: mpsc::Receiver<TapEvent>) {
        let Some(mut events) = self.events_rx.take() else {
            log::error!("controller: event channel already taken");
            return;
        };

        self.enter(AppState::LiveView);

        loop {
            tokio::select! {
                tap = taps.recv() => match tap {
                    Some(TapEvent::Tap) => self.handle_tap(),
                    Some(TapEvent::Quit) | None => break,
                },
                Some(event) = events.recv() => self.handle_step(event),
            }
        }

        if self.state.is_busy() {
            log::info!("controller: input closed, abandoning {}", self.state);
        } else {
            log::info!("controller: input closed, shutting down");
        }
        self.cycle.cancel();
        self.announcer.silence();
        self.capture.stop_live_view();
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Apply the tap table to the current state.  Taps in states without an
    /// entry are ignored.
    pub fn handle_tap(&mut self) {
        match self.state.on_tap() {
            Some(next) => self.enter(next),
            None => log::debug!("controller: tap ignored in {}", self.state),
        }
    }

    /// Switch to `state`, run its entry action, and follow any automatic
    /// chain (e.g. `NoText → Cleanup → LiveView`).
    pub fn enter(&mut self, state: AppState) {
        let mut next = Some(state);
        while let Some(state) = next.take() {
            log::debug!("controller: {} → {}", self.state, state);
            self.state = state;
            self.publish();
            next = self.on_enter(state);
        }
    }

    fn on_enter(&mut self, state: AppState) -> Option<AppState> {
        match state {
            AppState::Loading => None,

            AppState::LiveView => {
                self.begin_cycle();
                self.announcer.add(self.phrases.live_view.clone());
                let _ = self.announcer.speak_all();
                self.capture.start_live_view();
                None
            }

            AppState::Capturing => {
                self.spawn_capture();
                None
            }

            AppState::TextDetection => {
                self.capture.stop_live_view();
                self.announcer.add(self.phrases.processing.clone());
                let _ = self.announcer.speak_all();

                match self.pending_image.take() {
                    Some(image) => {
                        self.spawn_detection(image);
                        None
                    }
                    None => {
                        log::warn!("controller: no photo to process");
                        Some(AppState::LiveView)
                    }
                }
            }

            AppState::ApplyOcr => {
                let regions = std::mem::take(&mut self.regions);
                self.spawn_recognition(regions);
                None
            }

            AppState::Reading => {
                for text in self.texts.drain(..) {
                    self.announcer.add(text);
                }
                let playback = self.announcer.speak_all();

                let generation = self.generation;
                let limit = self.timeouts.reading();
                self.spawn_step(async move {
                    let outcome = tokio::time::timeout(limit, playback.wait()).await.ok();
                    StepEvent::ReadingDrained {
                        generation,
                        outcome,
                    }
                });
                None
            }

            AppState::NoText => {
                self.announcer.add(self.phrases.no_text.clone());
                let _ = self.announcer.speak_all();
                Some(AppState::Cleanup)
            }

            AppState::Cancelling => {
                log::info!("controller: read cancelled");
                self.cycle.cancel();
                let _ = self.announcer.reset();
                Some(AppState::Cleanup)
            }

            AppState::Cleanup => {
                self.cycle.cancel();
                self.pending_image = None;
                self.regions.clear();
                self.texts.clear();
                Some(AppState::LiveView)
            }
        }
    }

    /// React to the completion report of a spawned step.
    pub(crate) fn handle_step(&mut self, event: StepEvent) {
        if event.generation() != self.generation || event.expected_state() != self.state {
            log::debug!(
                "controller: dropping stale report for {} (generation {}, now {} in {})",
                event.expected_state(),
                event.generation(),
                self.generation,
                self.state
            );
            return;
        }

        match event {
            StepEvent::PhotoCaptured { photo, .. } => match photo {
                Some(photo) => {
                    self.pending_image = Some(photo);
                    self.enter(AppState::TextDetection);
                }
                None => self.enter(AppState::LiveView),
            },

            StepEvent::RegionsLocated { regions, .. } => {
                log::info!("controller: {} text region(s) found", regions.len());
                self.update_status(|s| s.regions_found = regions.len());
                if regions.is_empty() {
                    self.enter(AppState::NoText);
                } else {
                    self.regions = regions;
                    self.enter(AppState::ApplyOcr);
                }
            }

            StepEvent::BatchFinished { texts, .. } => {
                self.texts = texts.into_iter().flatten().collect();
                if self.texts.is_empty() {
                    self.enter(AppState::NoText);
                } else {
                    let read = self.texts.clone();
                    self.update_status(|s| s.last_read = read);
                    self.enter(AppState::Reading);
                }
            }

            StepEvent::ReadingDrained { outcome, .. } => match outcome {
                Some(PlaybackOutcome::Completed) => self.enter(AppState::LiveView),
                Some(PlaybackOutcome::Interrupted) => {
                    log::debug!("controller: reading interrupted");
                }
                None => {
                    log::warn!(
                        "controller: reading exceeded {:?}, stopping",
                        self.timeouts.reading()
                    );
                    self.announcer.silence();
                    self.enter(AppState::Cleanup);
                }
            },
        }
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn begin_cycle(&mut self) {
        self.cycle.cancel();
        self.cycle = CancellationToken::new();
        self.generation += 1;
        self.pending_image = None;
        self.regions.clear();
        self.texts.clear();

        let generation = self.generation;
        self.update_status(|s| {
            s.cycles = generation;
            s.regions_found = 0;
        });
    }

    /// Run `step` on the runtime and deliver its report, unless the current
    /// cycle is cancelled first.
    fn spawn_step<F>(&self, step: F)
    where
        F: Future<Output = StepEvent> + Send + 'static,
    {
        let cancel = self.cycle.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                event = step => {
                    let _ = tx.send(event);
                }
            }
        });
    }

    fn spawn_capture(&self) {
        let capture = Arc::clone(&self.capture);
        let limit = self.timeouts.capture();
        let generation = self.generation;

        self.spawn_step(async move {
            let photo = match tokio::time::timeout(limit, capture.capture_photo()).await {
                Ok(Ok(photo)) => Some(photo),
                Ok(Err(e)) => {
                    log::warn!("controller: capture failed: {e}");
                    None
                }
                Err(_) => {
                    log::warn!("controller: capture timed out after {limit:?}");
                    None
                }
            };
            StepEvent::PhotoCaptured { generation, photo }
        });
    }

    fn spawn_detection(&self, image: DynamicImage) {
        let locator = Arc::clone(&self.locator);
        let limit = self.timeouts.detection();
        let generation = self.generation;

        self.spawn_step(async move {
            let regions = match tokio::time::timeout(limit, locator.locate(&image)).await {
                Ok(Ok(regions)) => regions,
                Ok(Err(e)) => {
                    log::warn!("controller: text detection failed: {e}");
                    Vec::new()
                }
                Err(_) => {
                    log::warn!("controller: text detection timed out after {limit:?}");
                    Vec::new()
                }
            };
            StepEvent::RegionsLocated {
                generation,
                regions,
            }
        });
    }

    fn spawn_recognition(&self, regions: Vec<Region>) {
        let recognizer = Arc::clone(&self.recognizer);
        let limit = self.timeouts.recognition();
        let max_concurrent = self.max_concurrent;
        let cancel = self.cycle.clone();
        let generation = self.generation;

        self.spawn_step(async move {
            let texts = recognize_all(recognizer, regions, limit, max_concurrent, cancel)
                .await
                .unwrap_or_default();
            StepEvent::BatchFinished { generation, texts }
        });
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn publish(&self) {
        let state = self.state;
        self.update_status(|s| s.state = state);
        if let Some(observer) = &self.observer {
            let _ = observer.send(state);
        }
    }

    fn update_status(&self, f: impl FnOnce(&mut AppStatus)) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut status);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockCamera;
    use crate::detect::MockLocator;
    use crate::ocr::MockRecognizer;
    use crate::speech::MockSpeech;
    use std::time::Duration;

    use AppState::*;

    /// Generous bound; tests run on a paused clock so this never slows them.
    const WAIT: Duration = Duration::from_secs(3600);

    struct Harness {
        taps: mpsc::Sender<TapEvent>,
        states: mpsc::UnboundedReceiver<AppState>,
        status: SharedStatus,
        speech: Arc<MockSpeech>,
        camera: Arc<MockCamera>,
        run: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        fn start(
            config: AppConfig,
            camera: MockCamera,
            locator: MockLocator,
            recognizer: Arc<MockRecognizer>,
        ) -> Self {
            let speech = Arc::new(MockSpeech::new(Duration::from_secs(1)));
            let status = new_shared_status();
            let (observer, states) = mpsc::unbounded_channel();
            let camera = Arc::new(camera);

            let controller = ControllerBuilder::new(&config)
                .capture(camera.clone())
                .locator(Arc::new(locator))
                .recognizer(recognizer)
                .speech(speech.clone())
                .status(Arc::clone(&status))
                .observer(observer)
                .build()
                .expect("build");

            let (taps, tap_rx) = mpsc::channel(8);
            let run = tokio::spawn(controller.run(tap_rx));

            Self {
                taps,
                states,
                status,
                speech,
                camera,
                run,
            }
        }

        /// `(start_live_view, stop_live_view)` calls so far.
        fn live_view_signals(&self) -> (usize, usize) {
            (
                self.camera.starts.load(std::sync::atomic::Ordering::SeqCst),
                self.camera.stops.load(std::sync::atomic::Ordering::SeqCst),
            )
        }

        async fn tap(&self) {
            self.taps.send(TapEvent::Tap).await.expect("controller alive");
        }

        async fn expect(&mut self, expected: &[AppState]) {
            for want in expected {
                let got = tokio::time::timeout(WAIT, self.states.recv())
                    .await
                    .expect("state change in time")
                    .expect("observer open");
                assert_eq!(got, *want);
            }
        }

        async fn wait_until_spoken(&self, text: &str) {
            while !self.speech.finished().iter().any(|t| t == text) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        async fn shutdown(self) {
            drop(self.taps);
            self.run.await.expect("run task");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_regions_reads_no_text_and_returns_to_live_view() {
        let recognizer = Arc::new(MockRecognizer::new());
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok(),
            MockLocator::regions(0),
            recognizer.clone(),
        );

        h.expect(&[LiveView]).await;
        assert_eq!(h.live_view_signals(), (1, 0));
        h.tap().await;
        h.expect(&[Capturing, TextDetection, NoText, Cleanup, LiveView])
            .await;
        // Detection cut the feed once; the new cycle restarted it.
        assert_eq!(h.live_view_signals(), (2, 1));

        h.wait_until_spoken("No text found.").await;
        assert_eq!(recognizer.call_count(), 0);
        assert_eq!(h.status.lock().unwrap().cycles, 2);
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn two_regions_are_read_in_region_order() {
        let recognizer = Arc::new(
            MockRecognizer::new()
                .text(0, "first")
                .text(1, "second")
                .delay(0, Duration::from_millis(500)),
        );
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok(),
            MockLocator::regions(2),
            recognizer.clone(),
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.expect(&[Capturing, TextDetection, ApplyOcr, Reading]).await;
        assert_eq!(h.status.lock().unwrap().regions_found, 2);

        h.expect(&[LiveView]).await;
        // The new cycle has not captured anything yet.
        assert_eq!(h.status.lock().unwrap().regions_found, 0);

        assert_eq!(recognizer.call_count(), 2);
        assert_eq!(
            h.speech.finished(),
            vec![
                "Camera view. Tap to begin.",
                "Processing.",
                "first",
                "second"
            ]
        );
        assert_eq!(h.status.lock().unwrap().last_read, vec!["first", "second"]);
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn tap_while_reading_cancels() {
        let recognizer = Arc::new(MockRecognizer::new().text(0, "first").text(1, "second"));
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok(),
            MockLocator::regions(2),
            recognizer,
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.expect(&[Capturing, TextDetection, ApplyOcr, Reading]).await;

        // Wait until the first recognized string is actually being spoken.
        while !h.speech.started().iter().any(|t| t == "first") {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        h.tap().await;
        h.expect(&[Cancelling, Cleanup, LiveView]).await;
        assert_eq!(h.live_view_signals(), (2, 1));
        h.wait_until_spoken("Cancelled.").await;

        let finished = h.speech.finished();
        assert!(!finished.iter().any(|t| t == "first"));
        assert!(!h.speech.started().iter().any(|t| t == "second"));
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn tap_during_detection_cancels_and_late_result_is_ignored() {
        let recognizer = Arc::new(MockRecognizer::new().text(0, "late"));
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok(),
            MockLocator::regions(1).delayed(Duration::from_secs(5)),
            recognizer.clone(),
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.expect(&[Capturing, TextDetection]).await;
        h.tap().await;
        h.expect(&[Cancelling, Cleanup, LiveView]).await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(h.states.try_recv().is_err());
        assert_eq!(recognizer.call_count(), 0);
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn taps_while_capturing_are_ignored() {
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok().delayed(Duration::from_secs(2)),
            MockLocator::regions(0),
            Arc::new(MockRecognizer::new()),
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.tap().await;
        h.tap().await;
        h.expect(&[Capturing, TextDetection, NoText, Cleanup, LiveView])
            .await;
        assert!(h.states.try_recv().is_err());
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn capture_timeout_returns_to_live_view() {
        let mut config = AppConfig::default();
        config.timeouts.capture_secs = 1;
        let mut h = Harness::start(
            config,
            MockCamera::ok().delayed(Duration::from_secs(60)),
            MockLocator::regions(1),
            Arc::new(MockRecognizer::new()),
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.expect(&[Capturing, LiveView]).await;
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn missing_photo_returns_to_live_view() {
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::empty(),
            MockLocator::regions(1),
            Arc::new(MockRecognizer::new()),
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.expect(&[Capturing, LiveView]).await;
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn detection_failure_counts_as_no_text() {
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok(),
            MockLocator::failing(),
            Arc::new(MockRecognizer::new()),
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.expect(&[Capturing, TextDetection, NoText, Cleanup, LiveView])
            .await;
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn regions_without_text_read_no_text() {
        let recognizer = Arc::new(MockRecognizer::new().fail(1));
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok(),
            MockLocator::regions(3),
            recognizer.clone(),
        );

        h.expect(&[LiveView]).await;
        h.tap().await;
        h.expect(&[Capturing, TextDetection, ApplyOcr, NoText, Cleanup, LiveView])
            .await;
        assert_eq!(recognizer.call_count(), 3);
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn quit_stops_the_controller() {
        let mut h = Harness::start(
            AppConfig::default(),
            MockCamera::ok(),
            MockLocator::regions(0),
            Arc::new(MockRecognizer::new()),
        );

        h.expect(&[LiveView]).await;
        h.taps.send(TapEvent::Quit).await.expect("send");
        tokio::time::timeout(WAIT, h.run)
            .await
            .expect("run returns")
            .expect("run task");
    }

    #[tokio::test]
    async fn stale_reports_are_dropped() {
        let config = AppConfig::default();
        let mut controller = ControllerBuilder::new(&config)
            .capture(Arc::new(MockCamera::ok()))
            .locator(Arc::new(MockLocator::regions(1)))
            .recognizer(Arc::new(MockRecognizer::new()))
            .speech(Arc::new(MockSpeech::new(Duration::ZERO)))
            .build()
            .expect("build");

        controller.enter(LiveView);
        controller.handle_tap();
        assert_eq!(controller.state(), Capturing);

        // A photo from a previous cycle.
        controller.handle_step(StepEvent::PhotoCaptured {
            generation: controller.generation - 1,
            photo: Some(DynamicImage::new_rgb8(4, 4)),
        });
        assert_eq!(controller.state(), Capturing);

        // A report for a state the controller is not in.
        controller.handle_step(StepEvent::BatchFinished {
            generation: controller.generation,
            texts: vec![Some("x".into())],
        });
        assert_eq!(controller.state(), Capturing);
    }

    #[tokio::test]
    async fn build_requires_every_collaborator() {
        let config = AppConfig::default();

        let err = ControllerBuilder::new(&config)
            .locator(Arc::new(MockLocator::regions(1)))
            .recognizer(Arc::new(MockRecognizer::new()))
            .speech(Arc::new(MockSpeech::new(Duration::ZERO)))
            .build()
            .err()
            .expect("missing capture");
        assert!(matches!(err, ControllerError::MissingCollaborator("capture")));

        let err = ControllerBuilder::new(&config)
            .capture(Arc::new(MockCamera::ok()))
            .locator(Arc::new(MockLocator::regions(1)))
            .recognizer(Arc::new(MockRecognizer::new()))
            .build()
            .err()
            .expect("missing speech");
        assert!(matches!(err, ControllerError::MissingCollaborator("speech")));
    }

    #[tokio::test]
    async fn build_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.ocr.max_concurrent = 0;

        let err = ControllerBuilder::new(&config)
            .capture(Arc::new(MockCamera::ok()))
            .locator(Arc::new(MockLocator::regions(1)))
            .recognizer(Arc::new(MockRecognizer::new()))
            .speech(Arc::new(MockSpeech::new(Duration::ZERO)))
            .build()
            .err()
            .expect("invalid config");
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn build_rejects_zero_timeouts() {
        let zeroed: [fn(&mut TimeoutConfig); 4] = [
            |t| t.capture_secs = 0,
            |t| t.detection_secs = 0,
            |t| t.recognition_secs = 0,
            |t| t.reading_secs = 0,
        ];

        for zero in zeroed {
            let mut config = AppConfig::default();
            zero(&mut config.timeouts);

            let err = ControllerBuilder::new(&config)
                .capture(Arc::new(MockCamera::ok()))
                .locator(Arc::new(MockLocator::regions(2)))
                .recognizer(Arc::new(MockRecognizer::new()))
                .speech(Arc::new(MockSpeech::new(Duration::ZERO)))
                .build()
                .err()
                .expect("zero timeout rejected");
            assert!(matches!(err, ControllerError::InvalidConfig(_)), "{config:?}");
        }
    }
}
