//! Block-level text detection through Tesseract's layout analysis.
//!
//! The photo is run once through `tesseract … --psm 3 tsv`.  Word rows
//! (level 5) that carry text are grouped by their block and the union of
//! their boxes becomes the block's region.  Blocks come back in Tesseract's
//! reading order (page, then block number).

use std::collections::BTreeMap;

use async_trait::async_trait;
use image::DynamicImage;

use super::{crop_region, LocateError, PixelRect, Region, TextLocator};
use crate::config::{DetectionConfig, OcrConfig};
use crate::ocr::TesseractCli;

/// Fully automatic page segmentation.
const LAYOUT_PAGE_SEG_MODE: u8 = 3;

/// TSV `level` of a single word.
const WORD_LEVEL: u32 = 5;

pub struct TesseractBlockLocator {
    cli: TesseractCli,
    min_region_px: u32,
}

impl TesseractBlockLocator {
    pub fn new(cli: TesseractCli, min_region_px: u32) -> Self {
        Self { cli, min_region_px }
    }

    pub fn from_config(ocr: &OcrConfig, detection: &DetectionConfig) -> Self {
        Self::new(TesseractCli::from_config(ocr), detection.min_region_px)
    }
}

/// Group the word rows of a Tesseract TSV report into block rectangles.
pub fn parse_tsv_blocks(tsv: &str) -> Result<Vec<PixelRect>, LocateError> {
    let mut blocks: BTreeMap<(u32, u32), PixelRect> = BTreeMap::new();

    for (line_no, line) in tsv.lines().enumerate() {
        if line.starts_with("level") || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            return Err(LocateError::Parse(format!(
                "line {}: expected at least 11 columns, got {}",
                line_no + 1,
                fields.len()
            )));
        }

        let num = |i: usize| -> Result<u32, LocateError> {
            fields[i].trim().parse::<u32>().map_err(|e| {
                LocateError::Parse(format!("line {}, column {}: {e}", line_no + 1, i + 1))
            })
        };

        if num(0)? != WORD_LEVEL {
            continue;
        }
        let has_text = fields.get(11).is_some_and(|t| !t.trim().is_empty());
        let confident = fields[10].trim().parse::<f32>().is_ok_and(|c| c >= 0.0);
        if !has_text || !confident {
            continue;
        }

        let key = (num(1)?, num(2)?);
        let word = PixelRect::new(num(6)?, num(7)?, num(8)?, num(9)?);
        blocks
            .entry(key)
            .and_modify(|r| *r = r.union(&word))
            .or_insert(word);
    }

    Ok(blocks.into_values().collect())
}

#[async_trait]
impl TextLocator for TesseractBlockLocator {
    async fn locate(&self, image: &DynamicImage) -> Result<Vec<Region>, LocateError> {
        let tsv = self
            .cli
            .run(image, LAYOUT_PAGE_SEG_MODE, true)
            .await
            .map_err(|e| LocateError::Engine(e.to_string()))?;

        let rects = parse_tsv_blocks(&tsv)?;
        log::debug!("detect: {} text block(s) reported", rects.len());

        let regions = rects
            .into_iter()
            .filter(|r| r.width >= self.min_region_px && r.height >= self.min_region_px)
            .filter_map(|r| crop_region(image, r))
            .enumerate()
            .map(|(index, (bounds, image))| Region {
                index,
                bounds,
                image,
            })
            .collect();

        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn words_are_grouped_by_block_in_order() {
        let report = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t",
            "2\t1\t1\t0\t0\t0\t10\t10\t200\t40\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t95.1\tEXIT",
            "5\t1\t1\t1\t1\t2\t100\t12\t110\t38\t91.0\tONLY",
            "5\t1\t2\t1\t1\t1\t30\t300\t60\t20\t88.2\tPush",
        ]);

        let blocks = parse_tsv_blocks(&report).expect("parse");

        assert_eq!(
            blocks,
            vec![
                PixelRect::new(10, 10, 200, 40),
                PixelRect::new(30, 300, 60, 20),
            ]
        );
    }

    #[test]
    fn blank_and_unconfident_words_are_ignored() {
        let report = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t-1\tghost",
            "5\t1\t2\t1\t1\t1\t10\t10\t80\t20\t90\t   ",
            "5\t1\t3\t1\t1\t1\t10\t10\t80\t20\t90",
        ]);
        assert!(parse_tsv_blocks(&report).expect("parse").is_empty());
    }

    #[test]
    fn header_only_has_no_blocks() {
        assert!(parse_tsv_blocks(HEADER).expect("parse").is_empty());
        assert!(parse_tsv_blocks("").expect("parse").is_empty());
    }

    #[test]
    fn short_row_is_parse_error() {
        let report = tsv(&["5\t1\t1"]);
        assert!(matches!(
            parse_tsv_blocks(&report),
            Err(LocateError::Parse(_))
        ));
    }

    #[test]
    fn bad_number_is_parse_error() {
        let report = tsv(&["5\t1\tX\t1\t1\t1\t10\t10\t80\t20\t90\tword"]);
        assert!(matches!(
            parse_tsv_blocks(&report),
            Err(LocateError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_engine_is_engine_error() {
        let ocr = OcrConfig {
            tesseract_path: PathBuf::from("/nonexistent/bin/tesseract"),
            ..OcrConfig::default()
        };
        let locator = TesseractBlockLocator::from_config(&ocr, &DetectionConfig::default());
        let err = locator
            .locate(&DynamicImage::new_rgb8(8, 8))
            .await
            .unwrap_err();
        assert!(matches!(err, LocateError::Engine(_)));
    }
}
