use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    DocumentPage,
    StandaloneImage,
}

/// One unit of work. `number` is 1-based and is the only ordering key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub kind: SourceKind,
    /// The PDF for document pages, the image file for standalone images.
    pub source: PathBuf,
    pub width_pt: f64,
    pub height_pt: f64,
    /// hOCR produced outside this run; recognition is skipped when present.
    pub hocr: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorModel {
    Color,
    Gray,
    Monochrome,
}

impl ColorModel {
    pub fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Monochrome => PixelFormat::Mono1,
            Self::Gray => PixelFormat::Gray8,
            Self::Color => PixelFormat::Rgb24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Mono1,
    Gray8,
    Rgb24,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionStatus {
    NoExistingText,
    HasExistingText,
    /// More or fewer than one embedded image was found on the page.
    AmbiguousExtraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCharacteristics {
    pub dpi: u32,
    pub color: ColorModel,
    pub bit_depth: u8,
    pub status: RecognitionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionUnit {
    PixelsPerInch,
    PixelsPerCentimeter,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub value: f64,
    pub unit: ResolutionUnit,
}

/// What a metadata reader reports about a raster file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    pub width_px: u32,
    pub height_px: u32,
    pub color: ColorModel,
    pub bit_depth: u8,
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub page: u32,
    pub pdf: PathBuf,
    pub debug_pdf: Option<PathBuf>,
    pub dpi: u32,
    pub color: ColorModel,
    pub ocr_performed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Valid,
    Invalid,
    NotAttempted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub pages: Vec<PageResult>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextPolicy {
    /// Pages with a text layer fail the run.
    Refuse,
    /// OCR pages with a text layer anyway, using default resolution and color.
    Force,
    /// Copy pages with a text layer through unchanged.
    Skip,
}

/// Immutable per-run settings handed to every page job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub languages: Vec<String>,
    pub extra_configs: Vec<String>,
    pub text_policy: TextPolicy,
    /// Pages measured below this DPI are rendered at it. `None` disables oversampling.
    pub oversample_dpi: Option<u32>,
    pub default_dpi: u32,
    pub low_dpi_warning: u32,
    pub deskew: bool,
    pub clean: bool,
    pub embed_cleaned: bool,
    pub debug: bool,
    pub keep_temporaries: bool,
    pub jobs: usize,
}

impl PipelineConfig {
    pub fn language_arg(&self) -> String {
        self.languages.join("+")
    }
}
