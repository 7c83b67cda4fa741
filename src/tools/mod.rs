//! Capability interfaces for everything the pipeline delegates to other programs.
//!
//! The page pipeline only talks to these traits. [`Toolbox::from_config`] wires up
//! the command-line implementations; tests substitute fakes.

pub mod ghostscript;
pub mod imagemagick;
pub mod jhove;
pub mod poppler;
pub mod process;
pub mod tesseract;
pub mod unpaper;

use crate::compose::HocrComposer;
use crate::config::Config;
use crate::model::{Page, PixelFormat, RasterInfo};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run-wide cancellation flag shared by the scheduler and every tool invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width_pt: f64,
    pub height_pt: f64,
}

pub trait DocumentSource: Send + Sync {
    /// Declared size of every page, in document order.
    fn page_sizes(&self, document: &Path) -> Result<Vec<PageSize>>;
    /// Number of real (non bitmap) fonts used on the page.
    fn font_count(&self, page: &Page) -> Result<usize>;
    /// Extract the page's embedded images into `dest_dir`.
    fn extract_images(&self, page: &Page, dest_dir: &Path) -> Result<Vec<PathBuf>>;
    /// Copy the page unchanged into a single-page PDF.
    fn extract_page(&self, page: &Page, dest: &Path) -> Result<()>;
}

pub trait Rasterizer: Send + Sync {
    fn render_page(&self, page: &Page, dpi: u32, format: PixelFormat, dest: &Path) -> Result<()>;
    /// Convert a standalone image, resampling from `source_dpi` to `target_dpi` when they differ.
    fn convert_image(
        &self,
        image: &Path,
        source_dpi: u32,
        target_dpi: u32,
        format: PixelFormat,
        dest: &Path,
    ) -> Result<()>;
}

pub trait MetadataReader: Send + Sync {
    fn read(&self, raster: &Path) -> Result<RasterInfo>;
}

pub trait Deskewer: Send + Sync {
    fn deskew(&self, input: &Path, output: &Path) -> Result<()>;
}

pub trait Cleaner: Send + Sync {
    fn clean(&self, input: &Path, output: &Path, dpi: u32) -> Result<()>;
}

pub trait OcrEngine: Send + Sync {
    /// Recognize `raster` and return the path of the hOCR file written next to `dest_base`.
    fn recognize(
        &self,
        raster: &Path,
        languages: &str,
        profiles: &[String],
        dest_base: &Path,
    ) -> Result<PathBuf>;
}

pub trait PageComposer: Send + Sync {
    /// Write a one-page PDF from a raster and its hOCR. With `visible`, the
    /// text is drawn and the image left out.
    fn compose(&self, raster: &Path, hocr: &Path, dpi: u32, dest: &Path, visible: bool)
    -> Result<()>;
}

pub trait PdfaWriter: Send + Sync {
    fn write_pdfa(&self, pages: &[PathBuf], dest: &Path) -> Result<()>;
    fn merge(&self, pages: &[PathBuf], dest: &Path) -> Result<()>;
}

pub trait Validator: Send + Sync {
    /// Raw validator report for `pdf`.
    fn validate(&self, pdf: &Path) -> Result<String>;
}

/// All collaborators of one run.
pub struct Toolbox {
    pub source: Box<dyn DocumentSource>,
    pub rasterizer: Box<dyn Rasterizer>,
    pub metadata: Box<dyn MetadataReader>,
    pub deskewer: Box<dyn Deskewer>,
    pub cleaner: Box<dyn Cleaner>,
    pub ocr: Box<dyn OcrEngine>,
    pub composer: Box<dyn PageComposer>,
    pub writer: Box<dyn PdfaWriter>,
    pub validator: Box<dyn Validator>,
}

impl Toolbox {
    pub fn from_config(cfg: &Config, cancel: &CancelToken) -> Self {
        let runner = process::Runner::new(cfg.tools.timeout_seconds, cancel.clone());
        let t = &cfg.tools;
        Self {
            source: Box::new(poppler::Poppler::new(
                runner.clone(),
                poppler::Programs {
                    pdfinfo: t.pdfinfo.clone(),
                    pdffonts: t.pdffonts.clone(),
                    pdfimages: t.pdfimages.clone(),
                    pdfseparate: t.pdfseparate.clone(),
                },
            )),
            rasterizer: Box::new(ghostscript::Ghostscript::new(
                runner.clone(),
                &t.ghostscript,
                &t.convert,
                &cfg.pdfa.icc_profile,
            )),
            metadata: Box::new(imagemagick::Identify::new(runner.clone(), &t.identify)),
            deskewer: Box::new(imagemagick::Deskew::new(
                runner.clone(),
                &t.convert,
                &t.identify,
                &t.deskew_threshold,
            )),
            cleaner: Box::new(unpaper::Unpaper::new(runner.clone(), &t.unpaper)),
            ocr: Box::new(tesseract::Tesseract::new(runner.clone(), &t.tesseract)),
            composer: Box::new(HocrComposer),
            writer: Box::new(ghostscript::Ghostscript::new(
                runner.clone(),
                &t.ghostscript,
                &t.convert,
                &cfg.pdfa.icc_profile,
            )),
            validator: Box::new(jhove::Jhove::new(runner, &t.jhove)),
        }
    }
}

/// Every external program the toolbox can call, by role.
pub fn all_programs(cfg: &Config) -> Vec<(&'static str, String)> {
    let t = &cfg.tools;
    vec![
        ("ghostscript", t.ghostscript.clone()),
        ("pdfinfo", t.pdfinfo.clone()),
        ("pdffonts", t.pdffonts.clone()),
        ("pdfimages", t.pdfimages.clone()),
        ("pdfseparate", t.pdfseparate.clone()),
        ("identify", t.identify.clone()),
        ("convert", t.convert.clone()),
        ("tesseract", t.tesseract.clone()),
        ("unpaper", t.unpaper.clone()),
        ("jhove", t.jhove.clone()),
    ]
}

/// External programs a full run needs, by role.
pub fn required_programs(cfg: &Config) -> Vec<(&'static str, String)> {
    let clean = cfg.preprocess.clean || cfg.preprocess.embed_cleaned;
    all_programs(cfg)
        .into_iter()
        .filter(|(role, _)| match *role {
            "unpaper" => clean,
            "jhove" => cfg.output.validate,
            _ => true,
        })
        .collect()
}
