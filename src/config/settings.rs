//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for the spool-directory camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory the camera writes photos into.  The newest matching file is
    /// taken as the captured photo.
    pub spool_dir: PathBuf,
    /// File extensions (lower-case, without the dot) accepted as photos.
    pub extensions: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            spool_dir: AppPaths::new().spool_dir,
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Selects how a photo is split into text regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// The whole photo is a single region.
    FullFrame,
    /// Tesseract page layout analysis; every text block becomes a region.
    #[default]
    TesseractBlocks,
}

/// Settings for the text locator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Which locator to use.
    pub method: DetectionMethod,
    /// Regions narrower or shorter than this (in pixels) are dropped.
    pub min_region_px: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            method: DetectionMethod::default(),
            min_region_px: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// OcrConfig
// ---------------------------------------------------------------------------

/// Settings for the Tesseract command-line engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Path or name of the `tesseract` executable.
    pub tesseract_path: PathBuf,
    /// Tesseract language code(s), e.g. `"eng"` or `"eng+fra"`.
    pub language: String,
    /// Page segmentation mode used when recognizing a single region.
    pub page_seg_mode: u8,
    /// Maximum number of regions recognized at the same time.
    pub max_concurrent: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".into(),
            page_seg_mode: 6,
            max_concurrent: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the command-line speech engine.
///
/// The utterance text is appended as the last argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speech program (`say` on macOS, `espeak-ng` elsewhere).
    pub command: String,
    /// Extra arguments placed before the text (voice, rate …).
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let command = if cfg!(target_os = "macos") {
            "say"
        } else {
            "espeak-ng"
        };
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PhraseConfig
// ---------------------------------------------------------------------------

/// Fixed announcements spoken on state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseConfig {
    /// Spoken when the live view starts.
    pub live_view: String,
    /// Spoken when a captured photo starts processing.
    pub processing: String,
    /// Spoken when no text could be read from the photo.
    pub no_text: String,
    /// Spoken after a read is cancelled.
    pub cancelled: String,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            live_view: "Camera view. Tap to begin.".into(),
            processing: "Processing.".into(),
            no_text: "No text found.".into(),
            cancelled: "Cancelled.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutConfig
// ---------------------------------------------------------------------------

/// Upper bounds for every asynchronous step, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Waiting for the camera to deliver a photo.
    pub capture_secs: u64,
    /// Locating text regions in one photo.
    pub detection_secs: u64,
    /// Recognizing a single region.
    pub recognition_secs: u64,
    /// Speaking all recognized text.
    pub reading_secs: u64,
}

impl TimeoutConfig {
    pub fn capture(&self) -> Duration {
        Duration::from_secs(self.capture_secs)
    }

    pub fn detection(&self) -> Duration {
        Duration::from_secs(self.detection_secs)
    }

    pub fn recognition(&self) -> Duration {
        Duration::from_secs(self.recognition_secs)
    }

    pub fn reading(&self) -> Duration {
        Duration::from_secs(self.reading_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            capture_secs: 10,
            detection_secs: 30,
            recognition_secs: 30,
            reading_secs: 600,
        }
    }
}

// ---------------------------------------------------------------------------
// InputConfig
// ---------------------------------------------------------------------------

/// Where taps come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum InputSource {
    /// A global key (see [`InputConfig::tap_key`]), captured with `rdev`.
    Keyboard,
    /// Enter on standard input; `q` quits.
    #[default]
    Stdin,
}

/// Tap input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub source: InputSource,
    /// Key name for [`InputSource::Keyboard`] (e.g. `"Space"`, `"F9"`).
    pub tap_key: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: InputSource::default(),
            tap_key: "Space".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// Sections missing from the file fall back to their defaults.
///
/// ```rust,no_run
/// use out_loud::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.phrases.no_text, "No text found.");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub detection: DetectionConfig,
    pub ocr: OcrConfig,
    pub speech: SpeechConfig,
    pub phrases: PhraseConfig,
    pub timeouts: TimeoutConfig,
    pub input: InputConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
