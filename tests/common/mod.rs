#![allow(dead_code)]

use anyhow::{Result, bail};
use scanpdfa::model::{
    ColorModel, Page, PipelineConfig, PixelFormat, RasterInfo, SourceKind, TextPolicy,
};
use scanpdfa::tools::{
    Cleaner, DocumentSource, Deskewer, MetadataReader, OcrEngine, PageComposer, PageSize,
    PdfaWriter, Rasterizer, Toolbox, Validator,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything the fakes did, shared with the test after the toolbox takes ownership.
#[derive(Debug, Default)]
pub struct Calls {
    pub renders: Vec<(u32, u32, PixelFormat)>,
    pub conversions: Vec<(PathBuf, u32, u32)>,
    pub extracted_pages: Vec<u32>,
    pub deskews: usize,
    pub cleans: usize,
    pub recognized: Vec<PathBuf>,
    pub composed: Vec<(PathBuf, u32, bool)>,
    pub pdfa_writes: Vec<Vec<PathBuf>>,
    pub merges: Vec<Vec<PathBuf>>,
    pub validations: usize,
}

pub type Log = Arc<Mutex<Calls>>;

/// A tool step made to misbehave: `Fail*` returns an error, `Empty*` succeeds
/// but leaves a zero-byte file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broken {
    FailRender,
    EmptyRender,
    FailMetadata,
    FailDeskew,
    EmptyDeskew,
    FailClean,
    EmptyClean,
    FailCompose,
}

fn write_or_empty(dest: &Path, empty: bool, content: &[u8]) -> Result<()> {
    std::fs::write(dest, if empty { &b""[..] } else { content })?;
    Ok(())
}

pub fn page_number_of(path: &Path) -> Option<u32> {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .find_map(|s| s.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
}

pub struct FakeSource {
    pub log: Log,
    pub sizes: Vec<PageSize>,
    /// Font count per page; pages not listed have none.
    pub fonts: HashMap<u32, usize>,
    /// Embedded image count per page; pages not listed have one.
    pub images: HashMap<u32, usize>,
}

impl DocumentSource for FakeSource {
    fn page_sizes(&self, _document: &Path) -> Result<Vec<PageSize>> {
        Ok(self.sizes.clone())
    }

    fn font_count(&self, page: &Page) -> Result<usize> {
        Ok(self.fonts.get(&page.number).copied().unwrap_or(0))
    }

    fn extract_images(&self, page: &Page, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        let count = self.images.get(&page.number).copied().unwrap_or(1);
        (0..count)
            .map(|i| -> Result<PathBuf> {
                let path = dest_dir.join(format!("embedded-{i:03}.pbm"));
                std::fs::write(&path, b"img")?;
                Ok(path)
            })
            .collect()
    }

    fn extract_page(&self, page: &Page, dest: &Path) -> Result<()> {
        self.log.lock().unwrap().extracted_pages.push(page.number);
        std::fs::write(dest, format!("verbatim {}", page.number))?;
        Ok(())
    }
}

pub struct FakeRasterizer {
    pub log: Log,
    pub broken: Option<Broken>,
}

impl Rasterizer for FakeRasterizer {
    fn render_page(&self, page: &Page, dpi: u32, format: PixelFormat, dest: &Path) -> Result<()> {
        self.log.lock().unwrap().renders.push((page.number, dpi, format));
        if self.broken == Some(Broken::FailRender) {
            bail!("gs: unrecoverable error");
        }
        write_or_empty(dest, self.broken == Some(Broken::EmptyRender), b"P4")
    }

    fn convert_image(
        &self,
        image: &Path,
        source_dpi: u32,
        target_dpi: u32,
        _format: PixelFormat,
        dest: &Path,
    ) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .conversions
            .push((image.to_path_buf(), source_dpi, target_dpi));
        if self.broken == Some(Broken::FailRender) {
            bail!("convert: no decode delegate");
        }
        write_or_empty(dest, self.broken == Some(Broken::EmptyRender), b"P4")
    }
}

pub struct FakeMetadata {
    pub info: RasterInfo,
    pub broken: Option<Broken>,
}

impl MetadataReader for FakeMetadata {
    fn read(&self, _raster: &Path) -> Result<RasterInfo> {
        if self.broken == Some(Broken::FailMetadata) {
            bail!("identify: improper image header");
        }
        Ok(self.info)
    }
}

pub struct CopyDeskewer {
    pub log: Log,
    pub broken: Option<Broken>,
}

impl Deskewer for CopyDeskewer {
    fn deskew(&self, input: &Path, output: &Path) -> Result<()> {
        self.log.lock().unwrap().deskews += 1;
        match self.broken {
            Some(Broken::FailDeskew) => bail!("convert: deskew failed"),
            Some(Broken::EmptyDeskew) => write_or_empty(output, true, b""),
            _ => {
                std::fs::copy(input, output)?;
                Ok(())
            }
        }
    }
}

pub struct CopyCleaner {
    pub log: Log,
    pub broken: Option<Broken>,
}

impl Cleaner for CopyCleaner {
    fn clean(&self, input: &Path, output: &Path, _dpi: u32) -> Result<()> {
        self.log.lock().unwrap().cleans += 1;
        match self.broken {
            Some(Broken::FailClean) => bail!("unpaper: cannot read input"),
            Some(Broken::EmptyClean) => write_or_empty(output, true, b""),
            _ => {
                std::fs::copy(input, output)?;
                Ok(())
            }
        }
    }
}

pub struct FakeOcr {
    pub log: Log,
    pub fail_page: Option<u32>,
    /// Later pages finish first when set.
    pub stagger: bool,
}

impl OcrEngine for FakeOcr {
    fn recognize(
        &self,
        raster: &Path,
        _languages: &str,
        _profiles: &[String],
        dest_base: &Path,
    ) -> Result<PathBuf> {
        let page = page_number_of(raster).unwrap_or(0);
        if self.stagger {
            std::thread::sleep(Duration::from_millis(u64::from(20u32.saturating_sub(page) * 5)));
        }
        if self.fail_page == Some(page) {
            bail!("engine crashed on page {page}");
        }
        self.log.lock().unwrap().recognized.push(raster.to_path_buf());
        let mut hocr = dest_base.as_os_str().to_os_string();
        hocr.push(".hocr");
        let hocr = PathBuf::from(hocr);
        std::fs::write(&hocr, "<html></html>")?;
        Ok(hocr)
    }
}

pub struct FakeComposer {
    pub log: Log,
    pub broken: Option<Broken>,
}

impl PageComposer for FakeComposer {
    fn compose(&self, raster: &Path, _hocr: &Path, dpi: u32, dest: &Path, visible: bool) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .composed
            .push((raster.to_path_buf(), dpi, visible));
        if self.broken == Some(Broken::FailCompose) {
            bail!("raster could not be decoded");
        }
        std::fs::write(dest, format!("composed {}", page_number_of(dest).unwrap_or(0)))?;
        Ok(())
    }
}

pub struct FakeWriter {
    pub log: Log,
}

impl PdfaWriter for FakeWriter {
    fn write_pdfa(&self, pages: &[PathBuf], dest: &Path) -> Result<()> {
        self.log.lock().unwrap().pdfa_writes.push(pages.to_vec());
        std::fs::write(dest, b"%PDF-1.4")?;
        Ok(())
    }

    fn merge(&self, pages: &[PathBuf], dest: &Path) -> Result<()> {
        self.log.lock().unwrap().merges.push(pages.to_vec());
        std::fs::write(dest, b"%PDF-1.4")?;
        Ok(())
    }
}

pub struct FakeValidator {
    pub log: Log,
    pub report: String,
}

impl Validator for FakeValidator {
    fn validate(&self, _pdf: &Path) -> Result<String> {
        self.log.lock().unwrap().validations += 1;
        Ok(self.report.clone())
    }
}

pub const VALID_REPORT: &str = "Jhove (Rel. 1.28)\n  Format: PDF\n  Status: Well-Formed and valid\n  Profile: Linearized PDF, ISO PDF/A-1, Level B\n";

pub fn scan_info() -> RasterInfo {
    RasterInfo {
        width_px: 2480,
        height_px: 3508,
        color: ColorModel::Monochrome,
        bit_depth: 1,
        resolution: None,
    }
}

pub fn a4() -> PageSize {
    PageSize {
        width_pt: 595.0,
        height_pt: 842.0,
    }
}

pub struct Fixture {
    pub log: Log,
    pub sizes: Vec<PageSize>,
    pub fonts: HashMap<u32, usize>,
    pub images: HashMap<u32, usize>,
    pub info: RasterInfo,
    pub fail_page: Option<u32>,
    pub stagger: bool,
    pub broken: Option<Broken>,
}

impl Fixture {
    pub fn new(pages: usize) -> Self {
        Self {
            log: Log::default(),
            sizes: vec![a4(); pages],
            fonts: HashMap::new(),
            images: HashMap::new(),
            info: scan_info(),
            fail_page: None,
            stagger: false,
            broken: None,
        }
    }

    pub fn toolbox(&self) -> Toolbox {
        Toolbox {
            source: Box::new(FakeSource {
                log: self.log.clone(),
                sizes: self.sizes.clone(),
                fonts: self.fonts.clone(),
                images: self.images.clone(),
            }),
            rasterizer: Box::new(FakeRasterizer {
                log: self.log.clone(),
                broken: self.broken,
            }),
            metadata: Box::new(FakeMetadata {
                info: self.info,
                broken: self.broken,
            }),
            deskewer: Box::new(CopyDeskewer {
                log: self.log.clone(),
                broken: self.broken,
            }),
            cleaner: Box::new(CopyCleaner {
                log: self.log.clone(),
                broken: self.broken,
            }),
            ocr: Box::new(FakeOcr {
                log: self.log.clone(),
                fail_page: self.fail_page,
                stagger: self.stagger,
            }),
            composer: Box::new(FakeComposer {
                log: self.log.clone(),
                broken: self.broken,
            }),
            writer: Box::new(FakeWriter {
                log: self.log.clone(),
            }),
            validator: Box::new(FakeValidator {
                log: self.log.clone(),
                report: VALID_REPORT.to_string(),
            }),
        }
    }

    pub fn pages(&self) -> Vec<Page> {
        self.sizes
            .iter()
            .zip(1u32..)
            .map(|(size, number)| Page {
                number,
                kind: SourceKind::DocumentPage,
                source: PathBuf::from("scan.pdf"),
                width_pt: size.width_pt,
                height_pt: size.height_pt,
                hocr: None,
            })
            .collect()
    }
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        languages: vec!["eng".into()],
        extra_configs: Vec::new(),
        text_policy: TextPolicy::Refuse,
        oversample_dpi: None,
        default_dpi: 300,
        low_dpi_warning: 200,
        deskew: false,
        clean: false,
        embed_cleaned: false,
        debug: false,
        keep_temporaries: false,
        jobs: 1,
    }
}
