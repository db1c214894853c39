//! Application entry point: Out Loud.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from the path given as the first argument, or from
//!    the platform settings file (returns default on first run).
//! 3. Create the [`tokio`] runtime.
//! 4. Open the spool camera and probe the `tesseract` binary.
//! 5. Build the locator, recognizer and speech engine from config; probe
//!    the speech program.
//! 6. Build the [`StateController`](out_loud::pipeline::StateController).
//! 7. Start the tap source (global key or standard input).
//! 8. Run the controller until input ends or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::io::BufReader;
use tokio::sync::mpsc;

use out_loud::{
    capture::SpoolCamera,
    config::{AppConfig, DetectionMethod, InputSource},
    detect::{FullFrameLocator, TesseractBlockLocator, TextLocator},
    input::{forward_stdin_taps, parse_key, KeyListener, TapEvent},
    ocr::{TesseractCli, TesseractRecognizer},
    pipeline::{new_shared_status, ControllerBuilder},
    speech::CommandSpeech,
};

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Out Loud starting up");

    // 2. Configuration
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => AppConfig::load_from(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    // 4. Camera and OCR engine
    let camera = SpoolCamera::open(&config.capture).context("camera unavailable")?;
    log::info!("Watching {} for photos", camera.dir().display());

    let version = TesseractCli::from_config(&config.ocr)
        .check()
        .await
        .context("tesseract is required")?;
    log::info!("OCR engine: {version}");

    // 5. Locator, recognizer, speech
    let locator: Arc<dyn TextLocator> = match config.detection.method {
        DetectionMethod::FullFrame => Arc::new(FullFrameLocator),
        DetectionMethod::TesseractBlocks => Arc::new(TesseractBlockLocator::from_config(
            &config.ocr,
            &config.detection,
        )),
    };
    let recognizer = Arc::new(TesseractRecognizer::from_config(&config.ocr));
    let speech = CommandSpeech::from_config(&config.speech);
    speech.check().await.context("speech engine is required")?;
    log::info!("Speech engine: {}", speech.command());
    let speech = Arc::new(speech);

    // 6. Controller
    let status = new_shared_status();
    let controller = ControllerBuilder::new(&config)
        .capture(Arc::new(camera))
        .locator(locator)
        .recognizer(recognizer)
        .speech(speech)
        .status(Arc::clone(&status))
        .build()?;

    // 7. Tap source
    let (tap_tx, tap_rx) = mpsc::channel::<TapEvent>(16);
    let _key_listener = match config.input.source {
        InputSource::Keyboard => {
            let key = parse_key(&config.input.tap_key)
                .ok_or_else(|| anyhow!("unknown tap key {:?}", config.input.tap_key))?;
            log::info!("Tap key: {}", config.input.tap_key);
            Some(KeyListener::start(key, tap_tx).context("failed to start key listener")?)
        }
        InputSource::Stdin => {
            log::info!("Press Enter to tap, type q to quit");
            tokio::spawn(forward_stdin_taps(
                BufReader::new(tokio::io::stdin()),
                tap_tx,
            ));
            None
        }
    };

    // 8. Run
    tokio::select! {
        _ = controller.run(tap_rx) => {}
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
    }

    let status = status.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    log::info!("Out Loud stopped after {} cycle(s)", status.cycles);
    Ok(())
}
