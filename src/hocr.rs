//! Reading the recognition result.
//!
//! hOCR is HTML whose elements carry their position in the `title`
//! attribute (`bbox x0 y0 x1 y1; x_wconf 93`), in pixels of the recognized
//! raster with the origin at the top left.

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static BBOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"bbox\s+(-?\d+)\s+(-?\d+)\s+(-?\d+)\s+(-?\d+)").expect("valid regex")
});
static WORD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ocrx_word").expect("valid selector"));
static LINE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ocr_line").expect("valid selector"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub text: String,
    pub bbox: BBox,
}

pub fn parse_file(path: &Path) -> Result<Vec<TextElement>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading hOCR: {}", path.display()))?;
    Ok(parse(&raw))
}

/// Words with a position and non-blank text. Falls back to whole lines when
/// the engine emitted no word elements.
pub fn parse(raw: &str) -> Vec<TextElement> {
    let doc = Html::parse_document(raw);
    let words: Vec<TextElement> = doc.select(&WORD_SEL).filter_map(element).collect();
    if !words.is_empty() {
        return words;
    }
    doc.select(&LINE_SEL).filter_map(element).collect()
}

fn element(el: ElementRef<'_>) -> Option<TextElement> {
    let bbox = parse_bbox(el.value().attr("title")?)?;
    let text = el
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }
    Some(TextElement { text, bbox })
}

pub fn parse_bbox(title: &str) -> Option<BBox> {
    let c = BBOX_RE.captures(title)?;
    Some(BBox {
        x0: c[1].parse().ok()?,
        y0: c[2].parse().ok()?,
        x1: c[3].parse().ok()?,
        y1: c[4].parse().ok()?,
    })
}
