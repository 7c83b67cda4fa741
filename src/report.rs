use crate::model::{ColorModel, Page, PageResult, SourceKind, Verdict};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub started: String,
    pub finished: String,
    pub elapsed_seconds: f64,
    pub languages: Vec<String>,
    pub verdict: Verdict,
    pub debug_pdf: Option<PathBuf>,
    pub pages: Vec<PageReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub page: u32,
    pub kind: SourceKind,
    pub width_pt: f64,
    pub height_pt: f64,
    pub dpi: u32,
    pub color: ColorModel,
    pub ocr_performed: bool,
    pub external_hocr: bool,
}

impl PageReport {
    pub fn new(page: &Page, result: &PageResult) -> Self {
        Self {
            page: result.page,
            kind: page.kind,
            width_pt: page.width_pt,
            height_pt: page.height_pt,
            dpi: result.dpi,
            color: result.color,
            ocr_performed: result.ocr_performed,
            external_hocr: page.hocr.is_some(),
        }
    }
}
