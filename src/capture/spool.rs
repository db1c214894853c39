//! Spool-directory camera.
//!
//! A camera (phone tether, `fswebcam`, a screenshot tool …) writes photos into
//! a directory.  While the live view runs, a capture request takes the most
//! recently modified image in that directory.  Decoding is pushed onto
//! `tokio::task::spawn_blocking`.
//!
//! Phones store portrait shots as landscape pixels plus an EXIF orientation
//! tag.  The tag is applied on decode so text reaches the locator upright.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

use super::{CaptureError, CaptureService};
use crate::config::CaptureConfig;

pub struct SpoolCamera {
    dir: PathBuf,
    extensions: Vec<String>,
    live: AtomicBool,
}

impl SpoolCamera {
    /// Open the spool directory.
    ///
    /// # Errors
    ///
    /// [`CaptureError::DeviceUnavailable`] when the directory does not exist.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        if !config.spool_dir.is_dir() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "spool directory {} does not exist",
                config.spool_dir.display()
            )));
        }

        Ok(Self {
            dir: config.spool_dir.clone(),
            extensions: config
                .extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            live: AtomicBool::new(false),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Newest file in `dir` whose extension is in `extensions`.
fn newest_photo(dir: &Path, extensions: &[String]) -> Result<Option<PathBuf>, CaptureError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CaptureError::Io(e.to_string()))?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if !matches {
            continue;
        }

        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        if newest.as_ref().map_or(true, |(t, _)| modified >= *t) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, p)| p))
}

/// Decode `path` and rotate/flip it according to its EXIF orientation.
fn decode_upright(path: &Path) -> Result<DynamicImage, CaptureError> {
    let decode_err = |e: image::ImageError| CaptureError::Decode(format!("{}: {e}", path.display()));

    let mut decoder = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| CaptureError::Io(format!("{}: {e}", path.display())))?
        .into_decoder()
        .map_err(decode_err)?;

    let orientation = decoder.orientation().unwrap_or_else(|e| {
        log::debug!("camera: unreadable orientation in {}: {e}", path.display());
        Orientation::NoTransforms
    });

    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    if orientation != Orientation::NoTransforms {
        log::debug!("camera: applying {orientation:?}");
        image.apply_orientation(orientation);
    }
    Ok(image)
}

#[async_trait]
impl CaptureService for SpoolCamera {
    fn start_live_view(&self) {
        log::debug!("camera: live view started ({})", self.dir.display());
        self.live.store(true, Ordering::SeqCst);
    }

    fn stop_live_view(&self) {
        log::debug!("camera: live view stopped");
        self.live.store(false, Ordering::SeqCst);
    }

    async fn capture_photo(&self) -> Result<DynamicImage, CaptureError> {
        if !self.is_live() {
            return Err(CaptureError::NotLive);
        }

        let dir = self.dir.clone();
        let extensions = self.extensions.clone();

        tokio::task::spawn_blocking(move || {
            let path = newest_photo(&dir, &extensions)?.ok_or(CaptureError::NoPhoto)?;
            log::info!("camera: captured {}", path.display());
            decode_upright(&path)
        })
        .await
        .map_err(|e| CaptureError::Io(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn config_for(dir: &Path) -> CaptureConfig {
        CaptureConfig {
            spool_dir: dir.to_path_buf(),
            extensions: vec!["png".into()],
        }
    }

    fn write_png(path: &Path, width: u32) {
        RgbImage::from_pixel(width, 10, Rgb([255, 255, 255]))
            .save(path)
            .expect("write png");
    }

    #[test]
    fn open_missing_dir_is_device_unavailable() {
        let dir = tempdir().expect("temp dir");
        let cfg = config_for(&dir.path().join("missing"));
        assert!(matches!(
            SpoolCamera::open(&cfg),
            Err(CaptureError::DeviceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn capture_requires_live_view() {
        let dir = tempdir().expect("temp dir");
        write_png(&dir.path().join("a.png"), 20);
        let camera = SpoolCamera::open(&config_for(dir.path())).expect("open");

        assert!(matches!(
            camera.capture_photo().await,
            Err(CaptureError::NotLive)
        ));

        camera.start_live_view();
        assert!(camera.capture_photo().await.is_ok());

        camera.stop_live_view();
        assert!(!camera.is_live());
    }

    #[tokio::test]
    async fn empty_spool_yields_no_photo() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("notes.txt"), "not a photo").expect("write");
        let camera = SpoolCamera::open(&config_for(dir.path())).expect("open");
        camera.start_live_view();

        assert!(matches!(
            camera.capture_photo().await,
            Err(CaptureError::NoPhoto)
        ));
    }

    #[tokio::test]
    async fn newest_photo_wins() {
        let dir = tempdir().expect("temp dir");
        let old = dir.path().join("old.png");
        write_png(&old, 20);
        write_png(&dir.path().join("new.png"), 40);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .and_then(|f| f.set_modified(SystemTime::now() - std::time::Duration::from_secs(60)))
            .expect("backdate");

        let camera = SpoolCamera::open(&config_for(dir.path())).expect("open");
        camera.start_live_view();

        let photo = camera.capture_photo().await.expect("photo");
        assert_eq!(photo.width(), 40);
    }

    /// JPEG bytes of a `width` x `height` image carrying an EXIF
    /// orientation tag.
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 200, 200])))
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .expect("encode jpeg");

        // Big-endian TIFF header with a single IFD entry: 0x0112 SHORT x1.
        let mut exif = b"Exif\0\0MM\0\x2a\0\0\0\x08\0\x01\x01\x12\0\x03\0\0\0\x01".to_vec();
        exif.extend_from_slice(&orientation.to_be_bytes());
        exif.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

        let mut app1 = vec![0xFF, 0xE1];
        app1.extend_from_slice(&((exif.len() + 2) as u16).to_be_bytes());
        app1.extend_from_slice(&exif);

        // Right after SOI.
        jpeg.splice(2..2, app1);
        jpeg
    }

    #[tokio::test]
    async fn exif_rotation_is_applied() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("portrait.jpg"), jpeg_with_orientation(40, 20, 6))
            .expect("write jpeg");
        let camera = SpoolCamera::open(&CaptureConfig {
            spool_dir: dir.path().to_path_buf(),
            extensions: vec!["jpg".into()],
        })
        .expect("open");
        camera.start_live_view();

        let photo = camera.capture_photo().await.expect("photo");
        assert_eq!((photo.width(), photo.height()), (20, 40));
    }

    #[tokio::test]
    async fn untagged_photo_keeps_its_shape() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("plain.jpg"), jpeg_with_orientation(40, 20, 1))
            .expect("write jpeg");
        let camera = SpoolCamera::open(&CaptureConfig {
            spool_dir: dir.path().to_path_buf(),
            extensions: vec!["jpg".into()],
        })
        .expect("open");
        camera.start_live_view();

        let photo = camera.capture_photo().await.expect("photo");
        assert_eq!((photo.width(), photo.height()), (40, 20));
    }

    #[tokio::test]
    async fn corrupt_photo_is_decode_error() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("broken.png"), b"not png bytes").expect("write");
        let camera = SpoolCamera::open(&config_for(dir.path())).expect("open");
        camera.start_live_view();

        assert!(matches!(
            camera.capture_photo().await,
            Err(CaptureError::Decode(_))
        ));
    }
}
