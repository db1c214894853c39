//! Text-region detection.
//!
//! A [`TextLocator`] splits one captured photo into [`Region`]s, each a
//! cropped sub-image believed to hold a contiguous block of text.  Regions are
//! returned in reading order and carry that order in [`Region::index`].
//!
//! Two locators ship with the crate:
//!
//! | Locator                   | Regions                                  |
//! |---------------------------|------------------------------------------|
//! | [`FullFrameLocator`]      | the whole photo, as one region           |
//! | [`TesseractBlockLocator`] | one per text block found by Tesseract    |

pub mod layout;

pub use layout::TesseractBlockLocator;

use async_trait::async_trait;
use image::DynamicImage;
use thiserror::Error;

// ---------------------------------------------------------------------------
// PixelRect / Region
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle in source-image pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        PixelRect::new(
            left,
            top,
            self.right().max(other.right()) - left,
            self.bottom().max(other.bottom()) - top,
        )
    }

    /// Clip to an image of `width` × `height`.  `None` if nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        let left = self.left.min(width);
        let top = self.top.min(height);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        if right <= left || bottom <= top {
            return None;
        }
        Some(PixelRect::new(left, top, right - left, bottom - top))
    }
}

/// A sub-image believed to contain text.
#[derive(Debug, Clone)]
pub struct Region {
    /// Position in reading order within the batch.
    pub index: usize,
    /// Where the region lies in the source photo.
    pub bounds: PixelRect,
    /// The cropped pixels.
    pub image: DynamicImage,
}

/// Crop `rect` out of `image`, clamping it to the image first.
///
/// Returns `None` for rectangles that fall entirely outside the image or
/// have no area.
pub fn crop_region(image: &DynamicImage, rect: PixelRect) -> Option<(PixelRect, DynamicImage)> {
    let rect = rect.clamp_to(image.width(), image.height())?;
    let cropped = image.crop_imm(rect.left, rect.top, rect.width, rect.height);
    Some((rect, cropped))
}

// ---------------------------------------------------------------------------
// LocateError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LocateError {
    /// The detection engine failed.
    #[error("text detection failed: {0}")]
    Engine(String),

    /// The engine output could not be interpreted.
    #[error("cannot parse detection output: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// TextLocator trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TextLocator: Send + Sync {
    /// Find the text regions of `image`.  An empty vector means no text.
    async fn locate(&self, image: &DynamicImage) -> Result<Vec<Region>, LocateError>;
}

// ---------------------------------------------------------------------------
// FullFrameLocator
// ---------------------------------------------------------------------------

/// Treats the entire photo as a single region and leaves layout analysis to
/// the recognizer.
#[derive(Debug, Clone, Default)]
pub struct FullFrameLocator;

#[async_trait]
impl TextLocator for FullFrameLocator {
    async fn locate(&self, image: &DynamicImage) -> Result<Vec<Region>, LocateError> {
        let full = PixelRect::new(0, 0, image.width(), image.height());
        Ok(crop_region(image, full)
            .map(|(bounds, image)| Region {
                index: 0,
                bounds,
                image,
            })
            .into_iter()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockLocator  (test-only)
// ---------------------------------------------------------------------------

/// Locator double returning `count` equal-width vertical strips of the photo.
#[cfg(test)]
pub struct MockLocator {
    count: usize,
    fail: bool,
    delay: Option<std::time::Duration>,
}

#[cfg(test)]
impl MockLocator {
    pub fn regions(count: usize) -> Self {
        Self {
            count,
            fail: false,
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            count: 0,
            fail: true,
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[cfg(test)]
#[async_trait]
impl TextLocator for MockLocator {
    async fn locate(&self, image: &DynamicImage) -> Result<Vec<Region>, LocateError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(LocateError::Engine("mock failure".into()));
        }
        let strip = (image.width() / self.count.max(1) as u32).max(1);
        Ok((0..self.count)
            .map(|i| {
                let bounds = PixelRect::new(i as u32 * strip, 0, strip, image.height());
                Region {
                    index: i,
                    bounds,
                    image: image.crop_imm(bounds.left, bounds.top, bounds.width, bounds.height),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both() {
        let a = PixelRect::new(10, 10, 5, 5);
        let b = PixelRect::new(2, 12, 4, 10);
        assert_eq!(a.union(&b), PixelRect::new(2, 10, 13, 12));
    }

    #[test]
    fn clamp_trims_overhang() {
        let r = PixelRect::new(90, 40, 20, 20);
        assert_eq!(r.clamp_to(100, 50), Some(PixelRect::new(90, 40, 10, 10)));
    }

    #[test]
    fn clamp_outside_is_none() {
        assert_eq!(PixelRect::new(100, 0, 5, 5).clamp_to(100, 50), None);
        assert_eq!(PixelRect::new(0, 0, 0, 5).clamp_to(100, 50), None);
    }

    #[test]
    fn crop_region_returns_clamped_pixels() {
        let image = DynamicImage::new_rgb8(30, 20);
        let (rect, crop) = crop_region(&image, PixelRect::new(25, 15, 10, 10)).expect("crop");
        assert_eq!(rect, PixelRect::new(25, 15, 5, 5));
        assert_eq!((crop.width(), crop.height()), (5, 5));
    }

    #[tokio::test]
    async fn full_frame_is_one_region() {
        let image = DynamicImage::new_rgb8(30, 20);
        let regions = FullFrameLocator.locate(&image).await.expect("locate");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].index, 0);
        assert_eq!(regions[0].bounds, PixelRect::new(0, 0, 30, 20));
    }

    #[tokio::test]
    async fn full_frame_of_empty_image_has_no_regions() {
        let image = DynamicImage::new_rgb8(0, 0);
        assert!(FullFrameLocator.locate(&image).await.expect("locate").is_empty());
    }
}
