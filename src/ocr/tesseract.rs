//! Tesseract command-line engine.
//!
//! Each call writes the image to a scratch PNG (on the blocking pool) and
//! runs:
//!
//! ```text
//! tesseract <png> stdout -l <language> --psm <mode> [tsv]
//! ```
//!
//! The child is spawned with `kill_on_drop`, so cancelling the future
//! (timeout, cycle cancellation) also stops the engine.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tempfile::NamedTempFile;
use tokio::process::Command;

use super::{normalize_text, RecognizeError, Recognizer};
use crate::config::OcrConfig;
use crate::detect::Region;

// ---------------------------------------------------------------------------
// TesseractCli
// ---------------------------------------------------------------------------

/// Thin async wrapper around the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.language.clone(),
        }
    }

    /// Run `tesseract --version` to make sure the engine is installed.
    pub async fn check(&self) -> Result<String, RecognizeError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                RecognizeError::EngineUnavailable(format!("{}: {e}", self.binary.display()))
            })?;

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        Ok(String::from_utf8_lossy(banner)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    /// Run the engine over `image` and return its raw stdout.
    ///
    /// `tsv` switches the output to Tesseract's tab-separated layout format.
    pub async fn run(
        &self,
        image: &DynamicImage,
        page_seg_mode: u8,
        tsv: bool,
    ) -> Result<String, RecognizeError> {
        let scratch = write_scratch_png(image.clone()).await?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(scratch.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(page_seg_mode.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if tsv {
            cmd.arg("tsv");
        }

        let output = cmd.output().await.map_err(|e| {
            RecognizeError::EngineUnavailable(format!("{}: {e}", self.binary.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognizeError::Engine(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Encode `image` as PNG into a scratch file that lives as long as the
/// returned handle.
async fn write_scratch_png(image: DynamicImage) -> Result<NamedTempFile, RecognizeError> {
    tokio::task::spawn_blocking(move || {
        let file = tempfile::Builder::new()
            .prefix("out-loud-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| RecognizeError::Image(e.to_string()))?;
        image
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| RecognizeError::Image(e.to_string()))?;
        Ok::<_, RecognizeError>(file)
    })
    .await
    .map_err(|e| RecognizeError::Image(e.to_string()))?
}

// ---------------------------------------------------------------------------
// TesseractRecognizer
// ---------------------------------------------------------------------------

/// [`Recognizer`] backed by [`TesseractCli`].
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    cli: TesseractCli,
    page_seg_mode: u8,
}

impl TesseractRecognizer {
    pub fn new(cli: TesseractCli, page_seg_mode: u8) -> Self {
        Self { cli, page_seg_mode }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(TesseractCli::from_config(config), config.page_seg_mode)
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(&self, region: &Region) -> Result<Option<String>, RecognizeError> {
        let raw = self
            .cli
            .run(&region.image, self.page_seg_mode, false)
            .await?;
        let text = normalize_text(&raw);
        log::debug!("ocr: region {} → {:?}", region.index, text);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::PixelRect;

    fn missing_engine() -> TesseractCli {
        TesseractCli::from_config(&OcrConfig {
            tesseract_path: PathBuf::from("/nonexistent/bin/tesseract"),
            ..OcrConfig::default()
        })
    }

    #[tokio::test]
    async fn scratch_png_is_readable_back() {
        let scratch = write_scratch_png(DynamicImage::new_rgb8(12, 7))
            .await
            .expect("scratch");
        let decoded = image::open(scratch.path()).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
    }

    #[tokio::test]
    async fn missing_binary_is_engine_unavailable() {
        let err = missing_engine()
            .run(&DynamicImage::new_rgb8(4, 4), 6, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RecognizeError::EngineUnavailable(_)));
    }

    #[tokio::test]
    async fn check_reports_missing_binary() {
        assert!(matches!(
            missing_engine().check().await,
            Err(RecognizeError::EngineUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn recognizer_propagates_engine_errors() {
        let recognizer = TesseractRecognizer::new(missing_engine(), 6);
        let region = Region {
            index: 0,
            bounds: PixelRect::new(0, 0, 4, 4),
            image: DynamicImage::new_rgb8(4, 4),
        };
        assert!(recognizer.recognize(&region).await.is_err());
    }
}
