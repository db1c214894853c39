//! Configuration module for Out Loud.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per
//! collaborator, `AppPaths` for cross-platform directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, CaptureConfig, DetectionConfig, DetectionMethod, InputConfig, InputSource,
    OcrConfig, PhraseConfig, SpeechConfig, TimeoutConfig,
};
